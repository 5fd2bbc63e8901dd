use serde::{Deserialize, Serialize};

use super::RelationError;

const RELATION: &str = "profiling-endpoint";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticConfig {
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub labels: std::collections::BTreeMap<String, String>,
}

/// 프로파일 수집 대상 잡. parca 설정 파일의 `scrape_configs` 항목으로 그대로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub job_name: String,
    #[serde(default)]
    pub static_configs: Vec<StaticConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_interval: Option<String>,
}

impl ScrapeJob {
    pub fn validate(&self) -> Result<(), RelationError> {
        if self.job_name.is_empty() {
            return Err(RelationError::invalid_field(RELATION, "job_name", "빈 값"));
        }
        if let Some(scheme) = &self.scheme {
            if !matches!(scheme.as_str(), "http" | "https") {
                return Err(RelationError::invalid_field(
                    RELATION,
                    "scheme",
                    format!("지원하지 않는 스킴: {}", scheme),
                ));
            }
        }
        let empty_target = self
            .static_configs
            .iter()
            .flat_map(|c| c.targets.iter())
            .any(|t| t.is_empty());
        if empty_target {
            return Err(RelationError::invalid_field(RELATION, "targets", "빈 대상"));
        }
        Ok(())
    }
}
