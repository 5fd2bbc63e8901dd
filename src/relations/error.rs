use std::fmt;

/// 연동(relation) 데이터 검증 에러
#[derive(Debug, Clone, PartialEq)]
pub enum RelationError {
    /// JSON 파싱 실패
    ParseError {
        relation: String,
        reason: String,
    },
    /// 스키마 검증 실패
    SchemaError {
        relation: String,
        errors: Vec<String>,
    },
    /// 필드 값이 잘못됨
    InvalidField {
        relation: String,
        field: String,
        reason: String,
    },
}

impl RelationError {
    pub fn invalid_field(relation: &str, field: &str, reason: impl Into<String>) -> Self {
        RelationError::InvalidField {
            relation: relation.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError { relation, reason } =>
                write!(f, "{} 데이터 파싱 오류: {}", relation, reason),
            Self::SchemaError { relation, errors } =>
                write!(f, "{} 데이터 스키마 오류: {}", relation, errors.join("; ")),
            Self::InvalidField { relation, field, reason } =>
                write!(f, "{} 데이터의 {} 필드 오류: {}", relation, field, reason),
        }
    }
}

impl std::error::Error for RelationError {}
