use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::logging::{log_pass, PassLog};
use crate::nginx::{Location, NginxConfig, Protocol, ResolverSource, Upstream, UpstreamServer};
use crate::relations::{EntryPoint, TraefikRoute};
use crate::settings::Settings;
use crate::workload::{
    Container, Nginx, NginxPrometheusExporter, NginxReconcileOutcome, Parca, ParcaConfig, ParcaOptions,
    WorkloadError,
};

use super::error::ReconcileError;
use super::snapshot::Snapshot;

/// nginx 설정에서 parca를 가리키는 upstream 이름
pub const PARCA_UPSTREAM: &str = "parca";

/// 한 번의 패스 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub pass_id: String,
    pub parca_restarted: bool,
    pub nginx: NginxReconcileOutcome,
    pub route_written: bool,
}

/// 스냅샷으로부터 세 워크로드와 라우트 문서를 원하는 상태로 맞춥니다.
///
/// 패스 순서는 parca, nginx(TLS 파일 후 설정), exporter, 라우트 문서입니다.
pub struct Reconciler {
    settings: Settings,
    parca: Arc<dyn Container>,
    nginx: Arc<dyn Container>,
    exporter: Arc<dyn Container>,
    resolver: ResolverSource,
}

impl Reconciler {
    pub fn new(
        settings: Settings,
        parca: Arc<dyn Container>,
        nginx: Arc<dyn Container>,
        exporter: Arc<dyn Container>,
    ) -> Self {
        let resolver = match &settings.nginx.resolver {
            Some(address) => ResolverSource::Custom(address.clone()),
            None => ResolverSource::default(),
        };
        Self {
            settings,
            parca,
            nginx,
            exporter,
            resolver,
        }
    }

    pub fn with_resolver(mut self, resolver: ResolverSource) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn parca_options(&self, snapshot: &Snapshot) -> ParcaOptions {
        ParcaOptions {
            http_address: format!(":{}", self.settings.ports.parca),
            memory_storage_limit: self.settings.parca.memory_storage_limit,
            enable_persistence: self.settings.parca.enable_persistence,
            path_prefix: snapshot.path_prefix(),
            store: snapshot.remote_store.clone(),
        }
    }

    /// gRPC 포트와 HTTP 포트 모두 parca 하나로 전달하는 nginx 설정
    pub fn nginx_config(&self, snapshot: &Snapshot) -> Result<NginxConfig, ReconcileError> {
        let ports = &self.settings.ports;
        let upstreams = vec![Upstream::new(PARCA_UPSTREAM, vec![UpstreamServer::local(ports.parca)])];

        let mut server_ports_to_locations = BTreeMap::new();
        server_ports_to_locations.insert(ports.nginx_grpc, vec![Location::grpc("/", PARCA_UPSTREAM)]);
        server_ports_to_locations.insert(ports.nginx_http, vec![Location::http("/", PARCA_UPSTREAM)]);

        let config = NginxConfig::new(snapshot.hostname.clone(), upstreams, server_ports_to_locations)
            .map_err(WorkloadError::from)?
            .with_path_prefix(snapshot.path_prefix())
            .with_resolver(self.resolver.clone())
            .with_ipv6(self.settings.nginx.ipv6)
            .with_verbose_access_log(self.settings.nginx.verbose_access_log);
        Ok(config)
    }

    pub fn traefik_route(&self, snapshot: &Snapshot, tls: bool) -> TraefikRoute {
        let ports = &self.settings.ports;
        TraefikRoute::new(
            self.settings.runtime.model.clone(),
            self.settings.runtime.app.clone(),
            snapshot.hostname.clone(),
            tls,
            vec![
                EntryPoint::new(format!("{}-grpc", self.settings.runtime.app), Protocol::Grpc, ports.nginx_grpc),
                EntryPoint::new(format!("{}-http", self.settings.runtime.app), Protocol::Http, ports.nginx_http),
            ],
        )
    }

    /// 한 번의 패스를 실행합니다. 각 패스는 고유한 id로 추적됩니다.
    pub async fn reconcile(&self, snapshot: &Snapshot, trigger: &str) -> Result<PassOutcome, ReconcileError> {
        let pass_id = Uuid::new_v4().to_string();
        let span = info_span!("reconcile", pass_id = %pass_id, trigger = %trigger);
        let mut log = PassLog::new(pass_id.clone(), trigger);

        let result = self.run_pass(snapshot, pass_id).instrument(span).await;
        match &result {
            Ok(outcome) => log.with_outcome(outcome.parca_restarted, outcome.nginx.reloaded),
            Err(e) => log.with_error(e),
        }
        log.finish();
        log_pass(&log);
        result
    }

    async fn run_pass(&self, snapshot: &Snapshot, pass_id: String) -> Result<PassOutcome, ReconcileError> {
        let parca_config = ParcaConfig::new(snapshot.scrape_jobs.clone(), snapshot.s3.as_ref());
        let parca_restarted = Parca::new(self.parca.as_ref(), self.parca_options(snapshot), parca_config)
            .reconcile()
            .await?;

        let nginx = Nginx::new(self.nginx.as_ref(), self.nginx_config(snapshot)?, snapshot.tls.clone())
            .with_basic_auth(self.settings.nginx.basic_auth_users.clone())
            .reconcile()
            .await?;

        NginxPrometheusExporter::new(self.exporter.as_ref(), self.settings.ports.nginx_http)
            .reconcile()
            .await?;

        let route_written = if snapshot.is_leader && snapshot.ingress.is_some() {
            let route = self.traefik_route(snapshot, nginx.tls);
            write_route(&self.settings.runtime.route_output_path, &route).await?
        } else {
            debug!(is_leader = snapshot.is_leader, "라우트 문서 생략");
            false
        };

        Ok(PassOutcome {
            pass_id,
            parca_restarted,
            nginx,
            route_written,
        })
    }
}

/// 내용이 바뀐 경우에만 라우트 문서를 씁니다.
async fn write_route(path: &Path, route: &TraefikRoute) -> Result<bool, ReconcileError> {
    let route_error = |reason: String| ReconcileError::RouteWrite {
        path: path.display().to_string(),
        reason,
    };

    let content = serde_json::to_string_pretty(&route.document()).map_err(|e| route_error(e.to_string()))?;
    if let Ok(current) = tokio::fs::read_to_string(path).await {
        if current == content {
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| route_error(e.to_string()))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| route_error(e.to_string()))?;
    info!(path = %path.display(), "traefik 라우트 문서 갱신");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::FsContainer;

    fn reconciler(dir: &Path) -> Reconciler {
        let mut settings = Settings::default();
        settings.runtime.route_output_path = dir.join("route.json");
        Reconciler::new(
            settings,
            Arc::new(FsContainer::new("parca", dir.join("parca"))),
            Arc::new(FsContainer::new("nginx", dir.join("nginx"))),
            Arc::new(FsContainer::new("nginx-prometheus-exporter", dir.join("exporter"))),
        )
        .with_resolver(ResolverSource::Custom("10.0.0.10".to_string()))
    }

    #[test]
    fn test_parca_options_follow_ingress() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = reconciler(dir.path());
        let snapshot = Snapshot::from_json(
            r#"{"hostname": "parca-0.svc", "ingress": {"scheme": "http", "external_host": "h", "path_prefix": "/cos-parca"}}"#,
        )
        .unwrap();

        let options = reconciler.parca_options(&snapshot);
        assert_eq!(options.http_address, ":7070");
        assert_eq!(options.path_prefix.as_deref(), Some("/cos-parca"));
    }

    #[test]
    fn test_nginx_config_ports() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = reconciler(dir.path());
        let config = reconciler.nginx_config(&Snapshot::new("parca-0.svc")).unwrap();
        let rendered = config.build(false).unwrap();
        assert!(rendered.contains("listen 7993 http2;"));
        assert!(rendered.contains("listen 7994;"));
        assert!(rendered.contains("resolver 10.0.0.10;"));
    }

    #[tokio::test]
    async fn test_unreachable_containers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let reconciler = reconciler(dir.path());
        let outcome = reconciler.reconcile(&Snapshot::new("parca-0.svc"), "test").await.unwrap();
        assert!(!outcome.parca_restarted);
        assert!(!outcome.nginx.reloaded);
        assert!(!outcome.route_written);
        assert!(Uuid::parse_str(&outcome.pass_id).is_ok());
    }
}
