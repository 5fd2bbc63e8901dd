use std::env;

use serde::Deserialize;

use super::{ports::parse_env_var, SettingsError};

/// parca 서버 옵션
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ParcaSettings {
    /// 메모리 저장소 크기 (MiB, 기본값: 1024)
    #[serde(default = "default_memory_storage_limit")]
    pub memory_storage_limit: u64,

    /// 디스크 영속화 여부
    #[serde(default)]
    pub enable_persistence: bool,
}

fn default_memory_storage_limit() -> u64 { 1024 }

impl ParcaSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            memory_storage_limit: parse_env_var("PARCA_MEMORY_STORAGE_LIMIT", default_memory_storage_limit)?,
            enable_persistence: parse_env_var("PARCA_ENABLE_PERSISTENCE", || false)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.enable_persistence && self.memory_storage_limit == 0 {
            return Err(SettingsError::InvalidConfig(
                "memory_storage_limit는 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ParcaSettings {
    fn default() -> Self {
        Self {
            memory_storage_limit: default_memory_storage_limit(),
            enable_persistence: false,
        }
    }
}

/// nginx 프록시 옵션
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NginxSettings {
    /// IPv6 주소에서도 listen
    #[serde(default = "default_ipv6")]
    pub ipv6: bool,

    /// 모든 요청을 기록 (기본값은 4xx/5xx만)
    #[serde(default)]
    pub verbose_access_log: bool,

    /// resolver 주소를 직접 지정. 없으면 /etc/resolv.conf를 읽음
    pub resolver: Option<String>,

    /// `user:password` 목록. 비어 있으면 basic auth를 끔
    #[serde(default)]
    pub basic_auth_users: Vec<String>,
}

fn default_ipv6() -> bool { true }

impl NginxSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let basic_auth_users = env::var("PARCA_BASIC_AUTH_USERS")
            .map(|users| {
                users
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let settings = Self {
            ipv6: parse_env_var("PARCA_NGINX_IPV6", default_ipv6)?,
            verbose_access_log: parse_env_var("PARCA_NGINX_VERBOSE_ACCESS_LOG", || false)?,
            resolver: env::var("PARCA_NGINX_RESOLVER").ok().filter(|s| !s.is_empty()),
            basic_auth_users,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for entry in &self.basic_auth_users {
            let valid = entry
                .split_once(':')
                .map_or(false, |(user, password)| !user.is_empty() && !password.is_empty());
            if !valid {
                return Err(SettingsError::InvalidConfig(format!(
                    "basic auth 사용자는 'user:password' 형식이어야 합니다: {}",
                    entry.split(':').next().unwrap_or("")
                )));
            }
        }
        if let Some(resolver) = &self.resolver {
            if resolver.chars().any(char::is_whitespace) {
                return Err(SettingsError::InvalidConfig(format!("잘못된 resolver 주소: {}", resolver)));
            }
        }
        Ok(())
    }
}

impl Default for NginxSettings {
    fn default() -> Self {
        Self {
            ipv6: default_ipv6(),
            verbose_access_log: false,
            resolver: None,
            basic_auth_users: Vec::new(),
        }
    }
}
