use tracing::debug;

use super::container::Container;
use super::error::WorkloadError;
use super::layer::{Layer, Service};
use super::nginx::certificates_on_disk;

pub const NGINX_PROMETHEUS_EXPORTER_PORT: u16 = 9113;
pub const EXPORTER_SERVICE: &str = "nginx-prometheus-exporter";
pub const EXPORTER_LAYER: &str = "nginx-prometheus-exporter";

/// nginx 상태 페이지를 prometheus 메트릭으로 노출하는 사이드카
pub struct NginxPrometheusExporter<'a, C: Container + ?Sized> {
    container: &'a C,
    nginx_port: u16,
}

impl<'a, C: Container + ?Sized> NginxPrometheusExporter<'a, C> {
    pub fn new(container: &'a C, nginx_port: u16) -> Self {
        Self { container, nginx_port }
    }

    pub async fn reconcile(&self) -> Result<(), WorkloadError> {
        if !self.container.can_connect().await {
            debug!(container = %self.container.name(), "exporter 컨테이너에 연결할 수 없음");
            return Ok(());
        }
        let layer = self.layer().await?;
        self.container.add_layer(EXPORTER_LAYER, &layer).await?;
        self.container.autostart().await
    }

    /// 인증서가 디스크에 있으면 https로 nginx를 수집합니다.
    pub async fn layer(&self) -> Result<Layer, WorkloadError> {
        let scheme = if certificates_on_disk(self.container).await? { "https" } else { "http" };
        Ok(Layer::new(
            "nginx prometheus exporter layer",
            "pebble config layer for Nginx Prometheus exporter",
        )
        .with_service(
            EXPORTER_SERVICE,
            Service::enabled("nginx prometheus exporter", exporter_command(scheme, self.nginx_port)),
        ))
    }
}

pub fn exporter_command(scheme: &str, nginx_port: u16) -> String {
    format!(
        "nginx-prometheus-exporter --no-nginx.ssl-verify --web.listen-address=:{} --nginx.scrape-uri={}://127.0.0.1:{}/status",
        NGINX_PROMETHEUS_EXPORTER_PORT, scheme, nginx_port
    )
}
