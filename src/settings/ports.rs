use std::env;

use serde::Deserialize;

use super::SettingsError;

/// nginx와 parca가 사용하는 포트
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PortSettings {
    /// parca 서버 포트 (기본값: 7070)
    #[serde(default = "default_parca_port")]
    pub parca: u16,

    /// nginx HTTP 포트 (기본값: 7994)
    #[serde(default = "default_http_port")]
    pub nginx_http: u16,

    /// nginx gRPC 포트 (기본값: 7993)
    #[serde(default = "default_grpc_port")]
    pub nginx_grpc: u16,
}

fn default_parca_port() -> u16 { 7070 }
fn default_http_port() -> u16 { 7994 }
fn default_grpc_port() -> u16 { 7993 }

pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl PortSettings {
    fn parse_port(name: &str, default: u16) -> Result<u16, SettingsError> {
        let port = parse_env_var::<u16, _>(name, || default)?;
        if port == 0 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: name.to_string(),
                value: port.to_string(),
                reason: "포트는 0이 될 수 없습니다".to_string(),
            });
        }
        Ok(port)
    }

    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            parca: Self::parse_port("PARCA_PORT", default_parca_port())?,
            nginx_http: Self::parse_port("PARCA_NGINX_HTTP_PORT", default_http_port())?,
            nginx_grpc: Self::parse_port("PARCA_NGINX_GRPC_PORT", default_grpc_port())?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// 세 포트는 모두 달라야 합니다.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let ports = [self.parca, self.nginx_http, self.nginx_grpc];
        if ports.contains(&0) {
            return Err(SettingsError::InvalidConfig("포트는 0이 될 수 없습니다".to_string()));
        }
        if self.parca == self.nginx_http || self.parca == self.nginx_grpc || self.nginx_http == self.nginx_grpc {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "PARCA_PORT/PARCA_NGINX_HTTP_PORT/PARCA_NGINX_GRPC_PORT".to_string(),
                value: format!("{}/{}/{}", self.parca, self.nginx_http, self.nginx_grpc),
                reason: "포트가 서로 달라야 합니다".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            parca: default_parca_port(),
            nginx_http: default_http_port(),
            nginx_grpc: default_grpc_port(),
        }
    }
}
