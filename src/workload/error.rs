use std::fmt;

use crate::nginx::NginxConfigError;

#[derive(Debug)]
pub enum WorkloadError {
    /// 컨테이너에 연결할 수 없음
    CannotConnect {
        container: String,
    },
    /// 컨테이너 내부 파일 작업 실패
    FileError {
        path: String,
        error: std::io::Error,
    },
    /// 명령 실행 실패
    ExecError {
        command: String,
        reason: String,
    },
    /// 레이어 또는 설정 직렬화 실패
    SerializeError {
        what: String,
        reason: String,
    },
    /// 잘못된 path prefix
    InvalidPathPrefix(String),
    /// nginx 설정 생성 실패
    NginxConfig(NginxConfigError),
    /// htpasswd 생성 실패
    BasicAuth(String),
    /// 실행 계획에 없는 서비스
    UnknownService {
        container: String,
        service: String,
    },
}

impl fmt::Display for WorkloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CannotConnect { container } =>
                write!(f, "컨테이너 {}에 연결할 수 없음", container),
            Self::FileError { path, error } =>
                write!(f, "파일 {} 작업 실패: {}", path, error),
            Self::ExecError { command, reason } =>
                write!(f, "명령 실행 실패 ({}): {}", command, reason),
            Self::SerializeError { what, reason } =>
                write!(f, "{} 직렬화 실패: {}", what, reason),
            Self::InvalidPathPrefix(prefix) =>
                write!(f, "path prefix는 '/'로 시작해야 함: {}", prefix),
            Self::NginxConfig(e) =>
                write!(f, "nginx 설정 생성 실패: {}", e),
            Self::BasicAuth(reason) =>
                write!(f, "basic auth 설정 실패: {}", reason),
            Self::UnknownService { container, service } =>
                write!(f, "컨테이너 {}의 실행 계획에 서비스 {}가 없음", container, service),
        }
    }
}

impl std::error::Error for WorkloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileError { error, .. } => Some(error),
            Self::NginxConfig(e) => Some(e),
            _ => None,
        }
    }
}

impl From<NginxConfigError> for WorkloadError {
    fn from(err: NginxConfigError) -> Self {
        WorkloadError::NginxConfig(err)
    }
}
