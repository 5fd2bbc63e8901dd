use std::fmt;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use regex_lite::Regex;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

// parca가 서빙하는 HTML 페이지에 박혀 있는 버전 문자열. 구조화된 버전 API가 없어 임시로 사용함
const VERSION_PATTERN: &str = r#"APP_VERSION="v?([0-9]+\.[0-9]+\.[0-9]+[^"]*)""#;

/// 워크로드 버전. 확인할 수 없으면 `Unknown`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadVersion {
    Known(String),
    Unknown,
}

impl fmt::Display for WorkloadVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadVersion::Known(version) => write!(f, "{}", version),
            WorkloadVersion::Unknown => write!(f, "unknown"),
        }
    }
}

/// 재시도 정책
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 최대 시도 횟수
    pub max_attempts: u32,
    /// 재시도 간격
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(3),
        }
    }
}

/// HTML 본문에서 버전을 추출합니다.
pub fn parse_version(body: &str) -> Option<String> {
    let re = Regex::new(VERSION_PATTERN).ok()?;
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 실행 중인 parca의 웹 페이지에서 버전을 읽습니다.
pub struct VersionProbe {
    url: String,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl VersionProbe {
    pub fn new(port: u16) -> Self {
        Self {
            url: format!("http://localhost:{}/", port),
            policy: RetryPolicy::default(),
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 모든 시도가 실패하면 `Unknown`을 반환합니다.
    pub async fn version(&self) -> WorkloadVersion {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.fetch().await {
                Ok(Some(version)) => return WorkloadVersion::Known(version),
                Ok(None) => {
                    debug!(url = %self.url, "응답에서 버전을 찾을 수 없음");
                    return WorkloadVersion::Unknown;
                }
                Err(error) => {
                    if attempts >= self.policy.max_attempts {
                        warn!(error = %error, attempts = attempts, "parca 버전 확인 실패");
                        return WorkloadVersion::Unknown;
                    }
                    debug!(
                        error = %error,
                        attempt = attempts,
                        max_attempts = self.policy.max_attempts,
                        "버전 요청 실패, 재시도 예정"
                    );
                    sleep(self.policy.interval).await;
                }
            }
        }
    }

    async fn fetch(&self) -> Result<Option<String>, String> {
        let client = Client::builder(TokioExecutor::new()).build::<_, Empty<Bytes>>(HttpConnector::new());
        let request = hyper::Request::builder()
            .uri(&self.url)
            .body(Empty::<Bytes>::new())
            .map_err(|e| format!("요청 생성 실패: {}", e))?;

        let response = timeout(self.request_timeout, client.request(request))
            .await
            .map_err(|_| format!("타임아웃 ({:?})", self.request_timeout))?
            .map_err(|e| format!("요청 실패: {}", e))?;

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("응답 본문 읽기 실패: {}", e))?
            .to_bytes();
        Ok(parse_version(&String::from_utf8_lossy(&body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_WEB_RESPONSE_V1: &str = r#"<script>window.PATH_PREFIX="",window.APP_VERSION="v0.18.0-2b08f0bd"</s"#;
    const MOCK_WEB_RESPONSE_V2: &str = r#"<script>window.PATH_PREFIX="",window.APP_VERSION="v0.18.0"</s>"#;

    #[test]
    fn test_version_with_commit_hash_suffix() {
        assert_eq!(parse_version(MOCK_WEB_RESPONSE_V1), Some("0.18.0-2b08f0bd".to_string()));
    }

    #[test]
    fn test_version_without_commit_hash_suffix() {
        assert_eq!(parse_version(MOCK_WEB_RESPONSE_V2), Some("0.18.0".to_string()));
    }

    #[test]
    fn test_no_version() {
        assert_eq!(parse_version("<html></html>"), None);
    }

    #[tokio::test]
    async fn test_unreachable_is_unknown() {
        let probe = VersionProbe::new(1)
            .with_url("http://127.0.0.1:1/")
            .with_policy(RetryPolicy {
                max_attempts: 2,
                interval: Duration::from_millis(10),
            });
        assert_eq!(probe.version().await, WorkloadVersion::Unknown);
    }

    #[tokio::test]
    async fn test_fetch_from_local_server() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                MOCK_WEB_RESPONSE_V2.len(),
                MOCK_WEB_RESPONSE_V2
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        });

        let probe = VersionProbe::new(addr.port()).with_url(format!("http://{}/", addr));
        assert_eq!(probe.version().await, WorkloadVersion::Known("0.18.0".to_string()));
    }
}
