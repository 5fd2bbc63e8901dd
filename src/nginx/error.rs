use std::fmt;

/// Nginx 설정 생성 중 발생하는 에러입니다.
#[derive(Debug)]
pub enum NginxConfigError {
    /// resolver 파일을 읽을 수 없거나 nameserver 라인이 없음
    Resolver {
        path: String,
        reason: String,
    },
    /// 같은 이름의 upstream이 두 번 정의됨
    DuplicateUpstream(String),
    /// 설정 언어의 토큰으로 쓸 수 없는 upstream 이름
    InvalidUpstreamName(String),
    /// 주소가 하나도 없는 upstream
    EmptyUpstream(String),
    /// location이 정의되지 않은 upstream을 참조함
    UnknownUpstream {
        port: u16,
        path: String,
        upstream: String,
    },
    /// 포트에 location이 하나도 없음
    NoLocations(u16),
    /// server_name이 비어 있음
    EmptyHostname,
}

impl fmt::Display for NginxConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolver { path, reason } =>
                write!(f, "{}에서 DNS resolver를 찾을 수 없음: {}", path, reason),
            Self::DuplicateUpstream(name) =>
                write!(f, "중복된 upstream 이름: {}", name),
            Self::InvalidUpstreamName(name) =>
                write!(f, "유효하지 않은 upstream 이름: {:?}", name),
            Self::EmptyUpstream(name) =>
                write!(f, "upstream {}에 백엔드 주소가 없음", name),
            Self::UnknownUpstream { port, path, upstream } =>
                write!(f, "포트 {}의 location {}이(가) 정의되지 않은 upstream {}을(를) 참조함", port, path, upstream),
            Self::NoLocations(port) =>
                write!(f, "포트 {}에 location이 없음", port),
            Self::EmptyHostname =>
                write!(f, "server_name이 비어 있음"),
        }
    }
}

impl std::error::Error for NginxConfigError {}
