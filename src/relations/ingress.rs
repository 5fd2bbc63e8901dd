use serde::Deserialize;
use url::Url;

use super::RelationError;

const RELATION: &str = "ingress";

/// 인그레스 제공자가 알려준 외부 접근 정보
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngressState {
    pub scheme: String,
    pub external_host: String,
    /// 인그레스 뒤에서 UI/API가 노출되는 경로. `/`로 시작해야 하며 빈 값은 없음으로 취급합니다.
    #[serde(default)]
    pub path_prefix: Option<String>,
}

impl IngressState {
    pub fn validate(&self) -> Result<(), RelationError> {
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(RelationError::invalid_field(
                RELATION,
                "scheme",
                format!("지원하지 않는 스킴: {}", self.scheme),
            ));
        }
        if self.external_host.is_empty() {
            return Err(RelationError::invalid_field(RELATION, "external_host", "빈 값"));
        }
        if let Some(prefix) = self.path_prefix.as_deref().filter(|p| !p.is_empty()) {
            if !prefix.starts_with('/') {
                return Err(RelationError::invalid_field(
                    RELATION,
                    "path_prefix",
                    format!("'/'로 시작해야 함: {}", prefix),
                ));
            }
        }
        self.http_url().map(|_| ())
    }

    /// http 서버의 외부 URL (스킴 포함)
    pub fn http_url(&self) -> Result<Url, RelationError> {
        let base = format!("{}://{}", self.scheme, self.external_host);
        let mut url = Url::parse(&base)
            .map_err(|e| RelationError::invalid_field(RELATION, "external_host", e.to_string()))?;
        if let Some(prefix) = self.path_prefix.as_deref().filter(|p| !p.is_empty()) {
            url.set_path(prefix);
        }
        Ok(url)
    }
}
