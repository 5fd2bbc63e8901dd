use jsonschema::{Draft, JSONSchema};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::RelationError;

const RELATION: &str = "s3";

/// s3 연동 데이터 스키마 (JSON Schema Draft 7)
pub const S3_SCHEMA: &str = r#"{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "type": "object",
    "required": ["endpoint", "bucket", "access-key", "secret-key"],
    "properties": {
        "endpoint": {"type": "string", "minLength": 1},
        "bucket": {"type": "string", "minLength": 1},
        "access-key": {"type": "string", "minLength": 1},
        "secret-key": {"type": "string", "minLength": 1},
        "region": {"type": ["string", "null"]},
        "tls-ca-chain": {
            "type": ["array", "null"],
            "items": {"type": "string"}
        }
    }
}"#;

/// s3 연동으로 받은 오브젝트 스토리지 접속 정보
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct S3ConnectionInfo {
    pub endpoint: String,
    pub bucket: String,
    #[serde(rename = "access-key")]
    pub access_key: String,
    #[serde(rename = "secret-key")]
    pub secret_key: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "tls-ca-chain")]
    pub tls_ca_chain: Option<Vec<String>>,
}

impl S3ConnectionInfo {
    /// 스키마 검증 후 파싱합니다. 잘못된 데이터는 바로 거부됩니다.
    pub fn from_value(value: &Value) -> Result<Self, RelationError> {
        let schema_value: Value = serde_json::from_str(S3_SCHEMA).map_err(|e| RelationError::ParseError {
            relation: RELATION.to_string(),
            reason: format!("스키마 파싱 오류: {}", e),
        })?;
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| RelationError::ParseError {
                relation: RELATION.to_string(),
                reason: format!("스키마 컴파일 오류: {}", e),
            })?;

        if let Err(errors) = schema.validate(value) {
            return Err(RelationError::SchemaError {
                relation: RELATION.to_string(),
                errors: errors
                    .map(|error| format!("{} (경로: {})", error, error.instance_path))
                    .collect(),
            });
        }

        let info: Self = serde_json::from_value(value.clone()).map_err(|e| RelationError::ParseError {
            relation: RELATION.to_string(),
            reason: e.to_string(),
        })?;
        info.parsed_endpoint()?;
        Ok(info)
    }

    pub fn from_json(json: &str) -> Result<Self, RelationError> {
        let value: Value = serde_json::from_str(json).map_err(|e| RelationError::ParseError {
            relation: RELATION.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// CA 체인을 하나의 번들로 합칩니다.
    pub fn ca_cert(&self) -> Option<String> {
        self.tls_ca_chain
            .as_ref()
            .filter(|chain| !chain.is_empty())
            .map(|chain| chain.join("\n\n"))
    }

    /// 스킴이 없는 endpoint는 https로 간주합니다.
    fn parsed_endpoint(&self) -> Result<Url, RelationError> {
        let endpoint = if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("https://{}", self.endpoint)
        };
        let url = Url::parse(&endpoint)
            .map_err(|e| RelationError::invalid_field(RELATION, "endpoint", e.to_string()))?;
        if url.host_str().is_none() {
            return Err(RelationError::invalid_field(RELATION, "endpoint", "호스트가 없음"));
        }
        Ok(url)
    }

    /// 스킴을 제외한 `host[:port]`
    pub fn host(&self) -> String {
        match self.parsed_endpoint() {
            Ok(url) => match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                _ => self.endpoint.clone(),
            },
            Err(_) => self.endpoint.clone(),
        }
    }

    /// 평문 http endpoint인지 여부
    pub fn insecure(&self) -> bool {
        self.parsed_endpoint()
            .map(|url| url.scheme() == "http")
            .unwrap_or(false)
    }
}
