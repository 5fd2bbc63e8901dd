use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::error::WorkloadError;
use super::layer::{Layer, Startup};

const LAYERS_DIR: &str = ".layers";
const SUPERVISOR_DIR: &str = ".supervisor";
const SERVICES_FILE: &str = "services.json";

/// 워크로드 컨테이너와 그 프로세스 감독자에 대한 추상화
///
/// 모든 경로는 컨테이너 내부의 절대 경로입니다.
#[async_trait]
pub trait Container: Send + Sync {
    fn name(&self) -> &str;

    async fn can_connect(&self) -> bool;

    async fn exists(&self, path: &str) -> Result<bool, WorkloadError>;

    async fn pull(&self, path: &str) -> Result<String, WorkloadError>;

    /// 필요한 상위 디렉토리를 만든 뒤 파일을 씁니다.
    async fn push(&self, path: &str, content: &str) -> Result<(), WorkloadError>;

    async fn remove_path(&self, path: &str) -> Result<(), WorkloadError>;

    async fn exec(&self, command: &[&str]) -> Result<String, WorkloadError>;

    /// 지금까지 추가된 레이어를 모두 합친 실행 계획
    async fn plan(&self) -> Result<Layer, WorkloadError>;

    /// 같은 이름의 레이어가 있으면 합칩니다.
    async fn add_layer(&self, name: &str, layer: &Layer) -> Result<(), WorkloadError>;

    /// `startup: enabled` 서비스 중 실행 중이 아닌 것을 시작합니다.
    async fn autostart(&self) -> Result<(), WorkloadError>;

    async fn restart(&self, service: &str) -> Result<(), WorkloadError>;
}

/// 감독자에게 전달되는 서비스 상태
///
/// 감독자는 `generation`이 바뀔 때마다 `command`로 프로세스를 (재)시작합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub command: String,
    pub generation: u64,
}

/// 로컬 디렉토리를 컨테이너 파일시스템으로 사용하는 구현
///
/// 레이어는 `<root>/.layers/<name>.json`에 저장되고, 명령은 root를 작업
/// 디렉토리로 하여 실행됩니다. 서비스 시작과 재시작 요청은
/// `<root>/.supervisor/services.json`에 기록되어 외부 감독자가 읽습니다.
pub struct FsContainer {
    name: String,
    root: PathBuf,
    services_lock: Mutex<()>,
}

impl FsContainer {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            services_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn layer_path(&self, name: &str) -> PathBuf {
        self.root.join(LAYERS_DIR).join(format!("{}.json", name))
    }

    pub fn services_path(&self) -> PathBuf {
        self.root.join(SUPERVISOR_DIR).join(SERVICES_FILE)
    }

    fn file_error(path: &Path, error: std::io::Error) -> WorkloadError {
        WorkloadError::FileError {
            path: path.display().to_string(),
            error,
        }
    }

    /// 감독자 상태 파일을 읽습니다. 파일이 없으면 빈 상태입니다.
    pub async fn services(&self) -> Result<BTreeMap<String, ServiceState>, WorkloadError> {
        let path = self.services_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Self::file_error(&path, e)),
        };
        serde_json::from_str(&content).map_err(|e| WorkloadError::SerializeError {
            what: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    // 감독자가 쓰다 만 파일을 읽지 않도록 임시 파일에 쓴 뒤 rename
    async fn write_services(&self, services: &BTreeMap<String, ServiceState>) -> Result<(), WorkloadError> {
        let path = self.services_path();
        let content = serde_json::to_string_pretty(services).map_err(|e| WorkloadError::SerializeError {
            what: "supervisor services".to_string(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::file_error(parent, e))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await.map_err(|e| Self::file_error(&tmp, e))?;
        fs::rename(&tmp, &path).await.map_err(|e| Self::file_error(&path, e))
    }

    async fn read_layer(&self, path: &Path) -> Result<Layer, WorkloadError> {
        let content = fs::read_to_string(path).await.map_err(|e| Self::file_error(path, e))?;
        serde_json::from_str(&content).map_err(|e| WorkloadError::SerializeError {
            what: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Container for FsContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn can_connect(&self) -> bool {
        self.root.is_dir()
    }

    async fn exists(&self, path: &str) -> Result<bool, WorkloadError> {
        Ok(self.host_path(path).exists())
    }

    async fn pull(&self, path: &str) -> Result<String, WorkloadError> {
        let host_path = self.host_path(path);
        fs::read_to_string(&host_path).await.map_err(|e| Self::file_error(&host_path, e))
    }

    async fn push(&self, path: &str, content: &str) -> Result<(), WorkloadError> {
        let host_path = self.host_path(path);
        if let Some(parent) = host_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::file_error(parent, e))?;
        }
        fs::write(&host_path, content).await.map_err(|e| Self::file_error(&host_path, e))?;
        debug!(container = %self.name, path = %path, "파일 기록");
        Ok(())
    }

    async fn remove_path(&self, path: &str) -> Result<(), WorkloadError> {
        let host_path = self.host_path(path);
        let result = if host_path.is_dir() {
            fs::remove_dir_all(&host_path).await
        } else {
            fs::remove_file(&host_path).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::file_error(&host_path, e)),
        }
    }

    async fn exec(&self, command: &[&str]) -> Result<String, WorkloadError> {
        let (program, args) = command.split_first().ok_or_else(|| WorkloadError::ExecError {
            command: String::new(),
            reason: "빈 명령".to_string(),
        })?;

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|e| WorkloadError::ExecError {
                command: command.join(" "),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(WorkloadError::ExecError {
                command: command.join(" "),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// 저장된 모든 레이어를 이름 순으로 합칩니다.
    async fn plan(&self) -> Result<Layer, WorkloadError> {
        let dir = self.root.join(LAYERS_DIR);
        let mut plan = Layer::default();
        if !dir.exists() {
            return Ok(plan);
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await.map_err(|e| Self::file_error(&dir, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::file_error(&dir, e))? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                names.push(path);
            }
        }
        names.sort();

        for path in names {
            plan.combine(&self.read_layer(&path).await?);
        }
        Ok(plan)
    }

    async fn add_layer(&self, name: &str, layer: &Layer) -> Result<(), WorkloadError> {
        let path = self.layer_path(name);
        let mut combined = if path.exists() {
            self.read_layer(&path).await?
        } else {
            Layer::default()
        };
        combined.combine(layer);

        let content = serde_json::to_string_pretty(&combined).map_err(|e| WorkloadError::SerializeError {
            what: format!("layer {}", name),
            reason: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::file_error(parent, e))?;
        }
        fs::write(&path, content).await.map_err(|e| Self::file_error(&path, e))?;
        debug!(container = %self.name, layer = %name, "레이어 추가");
        Ok(())
    }

    async fn autostart(&self) -> Result<(), WorkloadError> {
        let _lock = self.services_lock.lock().await;
        let plan = self.plan().await?;
        let mut services = self.services().await?;
        let mut requested = false;

        for (name, service) in &plan.services {
            if service.startup != Startup::Enabled || services.contains_key(name) {
                continue;
            }
            services.insert(
                name.clone(),
                ServiceState {
                    command: service.command.clone(),
                    generation: 1,
                },
            );
            requested = true;
            info!(container = %self.name, service = %name, command = %service.command, "서비스 시작 요청 기록");
        }

        if requested {
            self.write_services(&services).await?;
        }
        Ok(())
    }

    async fn restart(&self, service: &str) -> Result<(), WorkloadError> {
        let _lock = self.services_lock.lock().await;
        let plan = self.plan().await?;
        let command = plan
            .service(service)
            .map(|s| s.command.clone())
            .ok_or_else(|| WorkloadError::UnknownService {
                container: self.name.clone(),
                service: service.to_string(),
            })?;

        let mut services = self.services().await?;
        let state = services.entry(service.to_string()).or_insert(ServiceState {
            command: command.clone(),
            generation: 0,
        });
        state.command = command;
        state.generation += 1;
        let generation = state.generation;

        self.write_services(&services).await?;
        info!(
            container = %self.name,
            service = %service,
            generation = generation,
            "서비스 재시작 요청 기록"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::layer::Service;

    #[tokio::test]
    async fn test_push_pull_remove() {
        let dir = tempfile::tempdir().unwrap();
        let container = FsContainer::new("nginx", dir.path());

        assert!(container.can_connect().await);
        assert!(!container.exists("/etc/nginx/nginx.conf").await.unwrap());

        container.push("/etc/nginx/nginx.conf", "worker_processes 5;\n").await.unwrap();
        assert!(container.exists("/etc/nginx/nginx.conf").await.unwrap());
        assert_eq!(container.pull("/etc/nginx/nginx.conf").await.unwrap(), "worker_processes 5;\n");

        container.remove_path("/etc/nginx/nginx.conf").await.unwrap();
        assert!(!container.exists("/etc/nginx/nginx.conf").await.unwrap());
        // 없는 파일 삭제는 성공
        container.remove_path("/etc/nginx/nginx.conf").await.unwrap();
    }

    #[tokio::test]
    async fn test_pull_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let container = FsContainer::new("nginx", dir.path());
        assert!(matches!(
            container.pull("/missing").await,
            Err(WorkloadError::FileError { .. })
        ));
    }

    #[tokio::test]
    async fn test_cannot_connect_without_root() {
        let container = FsContainer::new("nginx", "/nonexistent/container/root");
        assert!(!container.can_connect().await);
    }

    #[tokio::test]
    async fn test_layers_and_autostart() {
        let dir = tempfile::tempdir().unwrap();
        let container = FsContainer::new("parca", dir.path());

        let layer = Layer::default().with_service("parca", Service::enabled("parca", "/parca --old"));
        container.add_layer("parca", &layer).await.unwrap();
        let layer = Layer::default().with_service("parca", Service::enabled("parca", "/parca --new"));
        container.add_layer("parca", &layer).await.unwrap();

        let plan = container.plan().await.unwrap();
        assert_eq!(plan.service("parca").unwrap().command, "/parca --new");

        container.autostart().await.unwrap();
        let services = container.services().await.unwrap();
        assert_eq!(services["parca"].command, "/parca --new");
        assert_eq!(services["parca"].generation, 1);

        // 이미 요청된 서비스는 다시 시작하지 않음
        container.autostart().await.unwrap();
        assert_eq!(container.services().await.unwrap()["parca"].generation, 1);
    }

    #[tokio::test]
    async fn test_restart_is_visible_to_supervisor() {
        let dir = tempfile::tempdir().unwrap();
        let container = FsContainer::new("parca", dir.path());
        let layer = Layer::default().with_service("parca", Service::enabled("parca", "/parca --old"));
        container.add_layer("parca", &layer).await.unwrap();
        container.autostart().await.unwrap();

        let layer = Layer::default().with_service("parca", Service::enabled("parca", "/parca --new"));
        container.add_layer("parca", &layer).await.unwrap();
        container.restart("parca").await.unwrap();

        // 다른 프로세스처럼 상태 파일을 직접 읽음
        let content = std::fs::read_to_string(dir.path().join(".supervisor/services.json")).unwrap();
        let services: BTreeMap<String, ServiceState> = serde_json::from_str(&content).unwrap();
        assert_eq!(
            services["parca"],
            ServiceState {
                command: "/parca --new".to_string(),
                generation: 2,
            }
        );
        assert!(!dir.path().join(".supervisor/services.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_restart_unknown_service() {
        let dir = tempfile::tempdir().unwrap();
        let container = FsContainer::new("parca", dir.path());
        assert!(matches!(
            container.restart("parca").await,
            Err(WorkloadError::UnknownService { .. })
        ));
        assert!(!container.services_path().exists());
    }
}
