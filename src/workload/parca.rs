use serde::Serialize;
use tracing::{debug, info};

use crate::relations::{RemoteStoreConfig, S3ConnectionInfo, ScrapeJob};

use super::container::Container;
use super::error::WorkloadError;
use super::layer::{Layer, Service};

pub const PARCA_PORT: u16 = 7070;
pub const PARCA_SERVICE: &str = "parca";
pub const PARCA_LAYER: &str = "parca";
pub const DEFAULT_BIN_PATH: &str = "/parca";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/parca/parca.yaml";
pub const DEFAULT_PROFILE_PATH: &str = "/var/lib/parca";

const MIB: u64 = 1024 * 1024;

/// parca 실행 옵션
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcaOptions {
    pub http_address: String,
    /// 메모리 저장소 크기 (MiB)
    pub memory_storage_limit: u64,
    pub enable_persistence: bool,
    pub path_prefix: Option<String>,
    pub store: Option<RemoteStoreConfig>,
}

impl Default for ParcaOptions {
    fn default() -> Self {
        Self {
            http_address: format!(":{}", PARCA_PORT),
            memory_storage_limit: 1024,
            enable_persistence: false,
            path_prefix: None,
            store: None,
        }
    }
}

/// parca 실행 명령을 만듭니다. path prefix가 `/`로 시작하지 않으면 거부합니다.
pub fn parca_command_line(options: &ParcaOptions) -> Result<String, WorkloadError> {
    let mut cmd = vec![
        DEFAULT_BIN_PATH.to_string(),
        format!("--config-path={}", DEFAULT_CONFIG_PATH),
        format!("--http-address={}", options.http_address),
    ];

    if let Some(prefix) = options.path_prefix.as_deref().filter(|p| !p.is_empty()) {
        if !prefix.starts_with('/') {
            return Err(WorkloadError::InvalidPathPrefix(prefix.to_string()));
        }
        cmd.push(format!("--path-prefix={}", prefix));
    }

    if options.enable_persistence {
        cmd.push("--enable-persistence".to_string());
        cmd.push(format!("--storage-path={}", DEFAULT_PROFILE_PATH));
    } else {
        cmd.push(format!("--storage-active-memory={}", options.memory_storage_limit * MIB));
    }

    if let Some(store) = &options.store {
        cmd.extend(store.args());
    }

    Ok(cmd.join(" "))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "config", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    Filesystem {
        directory: String,
    },
    S3 {
        bucket: String,
        endpoint: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        access_key: String,
        secret_key: String,
        insecure: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectStorage {
    pub bucket: Bucket,
}

/// parca 설정 파일 (`parca.yaml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcaConfig {
    pub object_storage: ObjectStorage,
    pub scrape_configs: Vec<ScrapeJob>,
}

impl ParcaConfig {
    pub fn new(scrape_configs: Vec<ScrapeJob>, s3: Option<&S3ConnectionInfo>) -> Self {
        let bucket = match s3 {
            Some(s3) => Bucket::S3 {
                bucket: s3.bucket.clone(),
                endpoint: s3.host(),
                region: s3.region.clone(),
                access_key: s3.access_key.clone(),
                secret_key: s3.secret_key.clone(),
                insecure: s3.insecure(),
            },
            None => Bucket::Filesystem {
                directory: DEFAULT_PROFILE_PATH.to_string(),
            },
        };
        Self {
            object_storage: ObjectStorage { bucket },
            scrape_configs,
        }
    }

    pub fn to_yaml(&self) -> Result<String, WorkloadError> {
        serde_yaml::to_string(self).map_err(|e| WorkloadError::SerializeError {
            what: "parca config".to_string(),
            reason: e.to_string(),
        })
    }
}

/// parca 워크로드
pub struct Parca<'a, C: Container + ?Sized> {
    container: &'a C,
    options: ParcaOptions,
    config: ParcaConfig,
}

impl<'a, C: Container + ?Sized> Parca<'a, C> {
    pub fn new(container: &'a C, options: ParcaOptions, config: ParcaConfig) -> Self {
        Self { container, options, config }
    }

    pub fn layer(&self) -> Result<Layer, WorkloadError> {
        Ok(Layer::new("parca layer", "parca server").with_service(
            PARCA_SERVICE,
            Service::enabled("parca", parca_command_line(&self.options)?),
        ))
    }

    /// 설정 파일과 레이어를 반영합니다. 설정 파일이나 서비스 명령이 바뀌면 재시작합니다.
    pub async fn reconcile(&self) -> Result<bool, WorkloadError> {
        if !self.container.can_connect().await {
            debug!(container = %self.container.name(), "parca 컨테이너에 연결할 수 없음");
            return Ok(false);
        }

        // 명령행이 잘못되면 아무것도 쓰지 않음
        let layer = self.layer()?;
        let config = self.config.to_yaml()?;
        let config_changed = match self.container.pull(DEFAULT_CONFIG_PATH).await {
            Ok(current) => current != config,
            Err(_) => true,
        };

        let plan = self.container.plan().await?;
        let current_command = plan.service(PARCA_SERVICE).map(|s| s.command.as_str());
        let command_changed = current_command != layer.service(PARCA_SERVICE).map(|s| s.command.as_str());

        if config_changed {
            self.container.push(DEFAULT_CONFIG_PATH, &config).await?;
        }

        self.container.add_layer(PARCA_LAYER, &layer).await?;
        self.container.autostart().await?;

        let changed = config_changed || command_changed;
        if changed {
            info!(
                config_changed = config_changed,
                command_changed = command_changed,
                scrape_jobs = self.config.scrape_configs.len(),
                "parca 변경: 재시작"
            );
            self.container.restart(PARCA_SERVICE).await?;
        }
        Ok(changed)
    }
}
