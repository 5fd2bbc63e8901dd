use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use super::{ports::parse_env_var, SettingsError};

/// 오퍼레이터 실행 환경
///
/// 각 컨테이너는 로컬 디렉토리 루트로 표현됩니다.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default = "default_parca_root")]
    pub parca_root: PathBuf,

    #[serde(default = "default_nginx_root")]
    pub nginx_root: PathBuf,

    #[serde(default = "default_exporter_root")]
    pub exporter_root: PathBuf,

    /// 외부 입력 스냅샷(JSON) 경로
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Traefik 라우트 문서를 쓸 경로
    #[serde(default = "default_route_path")]
    pub route_output_path: PathBuf,

    /// 스냅샷 파일을 감시하며 계속 실행
    #[serde(default)]
    pub watch: bool,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_app")]
    pub app: String,
}

fn default_parca_root() -> PathBuf { PathBuf::from("/var/lib/parca-operator/parca") }
fn default_nginx_root() -> PathBuf { PathBuf::from("/var/lib/parca-operator/nginx") }
fn default_exporter_root() -> PathBuf { PathBuf::from("/var/lib/parca-operator/nginx-prometheus-exporter") }
fn default_snapshot_path() -> PathBuf { PathBuf::from("/etc/parca-operator/snapshot.json") }
fn default_route_path() -> PathBuf { PathBuf::from("/var/lib/parca-operator/traefik-route.json") }
fn default_model() -> String { "default".to_string() }
fn default_app() -> String { "parca".to_string() }

fn path_from_env(name: &str, default: fn() -> PathBuf) -> PathBuf {
    env::var(name).map(PathBuf::from).unwrap_or_else(|_| default())
}

impl RuntimeSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            parca_root: path_from_env("PARCA_CONTAINER_ROOT", default_parca_root),
            nginx_root: path_from_env("PARCA_NGINX_CONTAINER_ROOT", default_nginx_root),
            exporter_root: path_from_env("PARCA_EXPORTER_CONTAINER_ROOT", default_exporter_root),
            snapshot_path: path_from_env("PARCA_SNAPSHOT_PATH", default_snapshot_path),
            route_output_path: path_from_env("PARCA_ROUTE_OUTPUT_PATH", default_route_path),
            watch: parse_env_var("PARCA_WATCH", || false)?,
            model: env::var("PARCA_MODEL_NAME").unwrap_or_else(|_| default_model()),
            app: env::var("PARCA_APP_NAME").unwrap_or_else(|_| default_app()),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.model.is_empty() {
            return Err(SettingsError::EnvVarMissing { var_name: "PARCA_MODEL_NAME".to_string() });
        }
        if self.app.is_empty() {
            return Err(SettingsError::EnvVarMissing { var_name: "PARCA_APP_NAME".to_string() });
        }
        Ok(())
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            parca_root: default_parca_root(),
            nginx_root: default_nginx_root(),
            exporter_root: default_exporter_root(),
            snapshot_path: default_snapshot_path(),
            route_output_path: default_route_path(),
            watch: false,
            model: default_model(),
            app: default_app(),
        }
    }
}
