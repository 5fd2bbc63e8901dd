//! 워크로드 컨테이너(parca, nginx, exporter)를 원하는 상태로 맞추는 모듈입니다.

mod container;
mod error;
mod exporter;
pub mod htpasswd;
mod layer;
mod nginx;
mod parca;
mod version;

pub use container::{Container, FsContainer, ServiceState};
pub use error::WorkloadError;
pub use exporter::{exporter_command, NginxPrometheusExporter, EXPORTER_SERVICE, NGINX_PROMETHEUS_EXPORTER_PORT};
pub use layer::{Layer, Override, Service, Startup};
pub use nginx::{certificates_on_disk, Nginx, NginxReconcileOutcome, NGINX_SERVICE};
pub use parca::{
    parca_command_line, Bucket, ObjectStorage, Parca, ParcaConfig, ParcaOptions, DEFAULT_CONFIG_PATH,
    DEFAULT_PROFILE_PATH, PARCA_PORT, PARCA_SERVICE,
};
pub use version::{parse_version, RetryPolicy, VersionProbe, WorkloadVersion};
