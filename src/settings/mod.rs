use std::{env, fs, path::Path};

use serde::Deserialize;
use tracing::{debug, info};

mod error;
pub mod logging;
mod ports;
mod runtime;
mod workload;

pub use error::SettingsError;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use ports::{parse_env_var, PortSettings};
pub use runtime::RuntimeSettings;
pub use workload::{NginxSettings, ParcaSettings};

pub type Result<T> = std::result::Result<T, SettingsError>;

/// 설정 파일 경로를 지정하는 환경 변수
pub const CONFIG_FILE_ENV: &str = "PARCA_OPERATOR_CONFIG_FILE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    // 포트 설정
    #[serde(default)]
    pub ports: PortSettings,

    #[serde(default)]
    pub parca: ParcaSettings,

    #[serde(default)]
    pub nginx: NginxSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    #[serde(default)]
    pub runtime: RuntimeSettings,
}

impl Settings {
    pub async fn load() -> Result<Self> {
        if let Ok(config_path) = env::var(CONFIG_FILE_ENV) {
            info!(path = %config_path, "설정 파일에서 설정 로드");
            Self::from_toml_file(&config_path).await
        } else {
            debug!("환경 변수에서 설정 로드");
            Self::from_env().await
        }
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| SettingsError::ParseError { source: e })?;

        settings.validate().await?;
        Ok(settings)
    }

    pub async fn from_env() -> Result<Self> {
        let settings = Self {
            ports: PortSettings::from_env()?,
            parca: ParcaSettings::from_env()?,
            nginx: NginxSettings::from_env()?,
            logging: LogSettings::from_env()?,
            runtime: RuntimeSettings::from_env()?,
        };

        // 설정 생성 시점에 바로 검증
        settings.validate().await?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    pub async fn validate(&self) -> Result<()> {
        self.ports.validate()?;
        self.parca.validate()?;
        self.nginx.validate()?;
        self.runtime.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settings_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operator.toml");
        fs::write(
            &path,
            r#"
            [ports]
            nginx_http = 8080

            [parca]
            memory_storage_limit = 2048

            [nginx]
            ipv6 = false
            basic_auth_users = ["admin:secret"]

            [logging]
            format = "json"
            level = "debug"

            [runtime]
            model = "cos"
            "#,
        )
        .unwrap();

        let settings = Settings::from_toml_file(&path).await.unwrap();
        assert_eq!(settings.ports.nginx_http, 8080);
        assert_eq!(settings.ports.nginx_grpc, 7993);
        assert_eq!(settings.parca.memory_storage_limit, 2048);
        assert!(!settings.nginx.ipv6);
        assert_eq!(settings.nginx.basic_auth_users, vec!["admin:secret".to_string()]);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, tracing::Level::DEBUG);
        assert_eq!(settings.runtime.model, "cos");
        assert_eq!(settings.runtime.app, "parca");
    }

    #[tokio::test]
    async fn test_settings_from_toml_rejects_port_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operator.toml");
        fs::write(&path, "[ports]\nnginx_http = 7070\n").unwrap();
        assert!(Settings::from_toml_file(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_settings_missing_file() {
        assert!(matches!(
            Settings::from_toml_file("/nonexistent/operator.toml").await,
            Err(SettingsError::FileError { .. })
        ));
    }
}
