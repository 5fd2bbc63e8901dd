use serde::Deserialize;

use super::RelationError;

const RELATION: &str = "parca-store";

/// 원격 프로파일 저장소 (예: Polar Signals Cloud) 접속 정보
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteStoreConfig {
    #[serde(rename = "remote-store-address")]
    pub address: String,
    #[serde(rename = "remote-store-bearer-token", default)]
    pub bearer_token: Option<String>,
    #[serde(rename = "remote-store-insecure", default = "default_insecure")]
    pub insecure: String,
}

fn default_insecure() -> String {
    "false".to_string()
}

impl RemoteStoreConfig {
    pub fn validate(&self) -> Result<(), RelationError> {
        if self.address.is_empty() {
            return Err(RelationError::invalid_field(RELATION, "remote-store-address", "빈 값"));
        }
        if self.insecure.parse::<bool>().is_err() {
            return Err(RelationError::invalid_field(
                RELATION,
                "remote-store-insecure",
                format!("true 또는 false여야 함: {}", self.insecure),
            ));
        }
        Ok(())
    }

    /// parca 명령행 인자 목록
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![format!("--store-address={}", self.address)];
        if let Some(token) = &self.bearer_token {
            args.push(format!("--bearer-token={}", token));
        }
        args.push(format!("--insecure={}", self.insecure));
        args.push("--mode=scraper-only".to_string());
        args
    }
}
