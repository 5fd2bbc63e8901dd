use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    Replace,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    Enabled,
    Disabled,
}

/// 프로세스 감독자가 실행할 서비스 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "override")]
    pub override_: Override,
    pub summary: String,
    pub command: String,
    pub startup: Startup,
}

impl Service {
    pub fn enabled(summary: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            override_: Override::Replace,
            summary: summary.into(),
            command: command.into(),
            startup: Startup::Enabled,
        }
    }
}

/// 서비스 레이어. 같은 이름의 레이어를 다시 추가하면 서비스 단위로 합쳐집니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

impl Layer {
    pub fn new(summary: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            description: description.into(),
            services: BTreeMap::new(),
        }
    }

    pub fn with_service(mut self, name: impl Into<String>, service: Service) -> Self {
        self.services.insert(name.into(), service);
        self
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// `override: replace` 서비스는 교체하고, `merge`는 비어 있지 않은 필드만 덮어씁니다.
    pub fn combine(&mut self, other: &Layer) {
        if !other.summary.is_empty() {
            self.summary = other.summary.clone();
        }
        if !other.description.is_empty() {
            self.description = other.description.clone();
        }
        for (name, service) in &other.services {
            match (self.services.get_mut(name), service.override_) {
                (Some(existing), Override::Merge) => {
                    if !service.summary.is_empty() {
                        existing.summary = service.summary.clone();
                    }
                    if !service.command.is_empty() {
                        existing.command = service.command.clone();
                    }
                    existing.startup = service.startup;
                }
                _ => {
                    self.services.insert(name.clone(), service.clone());
                }
            }
        }
    }
}
