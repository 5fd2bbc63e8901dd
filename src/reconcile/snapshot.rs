use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::relations::{
    IngressState, RawTlsMaterial, RelationError, RemoteStoreConfig, S3ConnectionInfo, ScrapeJob, TlsMaterial,
};

use super::error::ReconcileError;

/// 파일로 전달되는 외부 입력. 검증 전 형태입니다.
#[derive(Debug, Default, Deserialize)]
struct RawSnapshot {
    hostname: String,
    #[serde(default)]
    is_leader: bool,
    #[serde(default)]
    ingress: Option<IngressState>,
    #[serde(default)]
    tls: Option<RawTlsMaterial>,
    #[serde(default)]
    s3: Option<Value>,
    #[serde(default)]
    remote_store: Option<RemoteStoreConfig>,
    #[serde(default)]
    scrape_jobs: Vec<ScrapeJob>,
}

/// 한 번의 reconcile 패스에 필요한 외부 상태
///
/// 생성 시점에 모든 값이 검증되며 패스 도중에는 바뀌지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub hostname: String,
    pub is_leader: bool,
    pub ingress: Option<IngressState>,
    /// 세 값이 모두 있을 때만 `Some`
    pub tls: Option<TlsMaterial>,
    pub s3: Option<S3ConnectionInfo>,
    pub remote_store: Option<RemoteStoreConfig>,
    pub scrape_jobs: Vec<ScrapeJob>,
}

impl Snapshot {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            is_leader: false,
            ingress: None,
            tls: None,
            s3: None,
            remote_store: None,
            scrape_jobs: Vec::new(),
        }
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReconcileError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ReconcileError::SnapshotRead {
                path: path.display().to_string(),
                error: e,
            })?;
        debug!(path = %path.display(), "스냅샷 로드");
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ReconcileError> {
        let raw: RawSnapshot =
            serde_json::from_str(json).map_err(|e| ReconcileError::SnapshotParse(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSnapshot) -> Result<Self, ReconcileError> {
        if raw.hostname.is_empty() {
            return Err(RelationError::invalid_field("snapshot", "hostname", "빈 값").into());
        }

        if let Some(ingress) = &raw.ingress {
            ingress.validate()?;
        }

        let tls = raw.tls.and_then(RawTlsMaterial::complete);
        if let Some(tls) = &tls {
            tls.validate()?;
        }

        let s3 = raw.s3.as_ref().map(S3ConnectionInfo::from_value).transpose()?;

        if let Some(store) = &raw.remote_store {
            store.validate()?;
        }
        for job in &raw.scrape_jobs {
            job.validate()?;
        }

        Ok(Self {
            hostname: raw.hostname,
            is_leader: raw.is_leader,
            ingress: raw.ingress,
            tls,
            s3,
            remote_store: raw.remote_store,
            scrape_jobs: raw.scrape_jobs,
        })
    }

    /// 인그레스가 알려준 path prefix. 빈 값은 없음으로 취급합니다.
    pub fn path_prefix(&self) -> Option<String> {
        self.ingress
            .as_ref()
            .and_then(|i| i.path_prefix.clone())
            .filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_snapshot() {
        let snapshot = Snapshot::from_json(r#"{"hostname": "parca-0.svc"}"#).unwrap();
        assert_eq!(snapshot, Snapshot::new("parca-0.svc"));
    }

    #[test]
    fn test_empty_hostname_rejected() {
        assert!(matches!(
            Snapshot::from_json(r#"{"hostname": ""}"#),
            Err(ReconcileError::Relation(RelationError::InvalidField { .. }))
        ));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            Snapshot::from_json("{not json"),
            Err(ReconcileError::SnapshotParse(_))
        ));
    }

    #[test]
    fn test_partial_tls_is_disabled() {
        let snapshot = Snapshot::from_json(
            r#"{"hostname": "parca-0.svc", "tls": {"certificate": "CERT", "ca": "CA"}}"#,
        )
        .unwrap();
        assert!(snapshot.tls.is_none());
    }

    #[test]
    fn test_invalid_s3_rejected() {
        let result = Snapshot::from_json(r#"{"hostname": "parca-0.svc", "s3": {"bucket": "parca"}}"#);
        assert!(matches!(result, Err(ReconcileError::Relation(_))));
    }

    #[test]
    fn test_full_snapshot() {
        let snapshot = Snapshot::from_json(
            r#"{
                "hostname": "parca-0.svc",
                "is_leader": true,
                "ingress": {"scheme": "https", "external_host": "parca.example.com", "path_prefix": "/cos-parca"},
                "s3": {"endpoint": "https://s3.example.com", "bucket": "parca", "access-key": "a", "secret-key": "s"},
                "remote_store": {"remote-store-address": "grpc.polarsignals.com:443"},
                "scrape_jobs": [{"job_name": "app", "static_configs": [{"targets": ["10.0.0.1:7070"]}]}]
            }"#,
        )
        .unwrap();

        assert!(snapshot.is_leader);
        assert_eq!(snapshot.path_prefix().as_deref(), Some("/cos-parca"));
        assert_eq!(snapshot.s3.as_ref().unwrap().bucket, "parca");
        assert_eq!(snapshot.remote_store.as_ref().unwrap().insecure, "false");
        assert_eq!(snapshot.scrape_jobs.len(), 1);
    }

    #[test]
    fn test_empty_path_prefix_is_none() {
        let snapshot = Snapshot::from_json(
            r#"{"hostname": "parca-0.svc", "ingress": {"scheme": "http", "external_host": "parca.example.com", "path_prefix": ""}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.path_prefix(), None);
    }
}
