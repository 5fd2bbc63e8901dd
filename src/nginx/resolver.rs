use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::error::NginxConfigError;
use super::RESOLV_CONF_PATH;

/// nginx `resolver` 디렉티브에 들어갈 DNS 주소를 어디서 가져올지 결정합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverSource {
    /// resolv.conf 형식 파일의 첫 번째 nameserver
    File(PathBuf),
    /// 고정 주소 (예: kube-dns.kube-system.svc.cluster.local)
    Custom(String),
}

impl Default for ResolverSource {
    fn default() -> Self {
        ResolverSource::File(PathBuf::from(RESOLV_CONF_PATH))
    }
}

impl ResolverSource {
    pub fn resolve(&self) -> Result<String, NginxConfigError> {
        match self {
            ResolverSource::Custom(address) => Ok(address.clone()),
            ResolverSource::File(path) => {
                let content = fs::read_to_string(path).map_err(|e| NginxConfigError::Resolver {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;

                let address = nameserver(&content).ok_or_else(|| NginxConfigError::Resolver {
                    path: path.display().to_string(),
                    reason: "nameserver 라인이 없음".to_string(),
                })?;

                debug!(resolver = %address, path = %path.display(), "DNS resolver 확인");
                Ok(address)
            }
        }
    }
}

/// `nameserver`로 시작하는 첫 라인의 두 번째 토큰을 반환합니다.
pub fn nameserver(resolv_conf: &str) -> Option<String> {
    resolv_conf
        .lines()
        .find(|line| line.starts_with("nameserver"))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|address| address.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_first_nameserver_wins() {
        let content = "search svc.cluster.local\nnameserver 10.152.183.10\nnameserver 8.8.8.8\n";
        assert_eq!(nameserver(content), Some("10.152.183.10".to_string()));
    }

    #[test]
    fn test_no_nameserver() {
        assert_eq!(nameserver("search local\noptions ndots:5\n"), None);
        assert_eq!(nameserver(""), None);
    }

    #[test]
    fn test_nameserver_without_address() {
        assert_eq!(nameserver("nameserver\n"), None);
    }

    #[test]
    fn test_resolve_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "nameserver 198.18.0.0").unwrap();

        let source = ResolverSource::File(file.path().to_path_buf());
        assert_eq!(source.resolve().unwrap(), "198.18.0.0");
    }

    #[test]
    fn test_resolve_missing_file() {
        let source = ResolverSource::File(PathBuf::from("/nonexistent/resolv.conf"));
        assert!(matches!(source.resolve(), Err(NginxConfigError::Resolver { .. })));
    }

    #[test]
    fn test_custom_resolver_skips_file() {
        let source = ResolverSource::Custom("kube-dns.kube-system.svc.cluster.local".to_string());
        assert_eq!(source.resolve().unwrap(), "kube-dns.kube-system.svc.cluster.local");
    }
}
