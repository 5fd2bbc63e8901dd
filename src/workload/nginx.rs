use tracing::{debug, info, warn};

use crate::nginx::{NginxConfig, CA_CERT_PATH, CERT_PATH, HTPASSWD_PATH, KEY_PATH, NGINX_CONFIG};
use crate::relations::TlsMaterial;

use super::container::Container;
use super::error::WorkloadError;
use super::htpasswd;
use super::layer::{Layer, Service};

pub const NGINX_SERVICE: &str = "nginx";
pub const NGINX_LAYER: &str = "nginx";

/// nginx reconcile 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NginxReconcileOutcome {
    /// TLS를 켠 설정이 적용되었는지
    pub tls: bool,
    /// 설정이 바뀌어 reload를 요청했는지
    pub reloaded: bool,
}

/// nginx 워크로드
pub struct Nginx<'a, C: Container + ?Sized> {
    container: &'a C,
    config: NginxConfig,
    tls: Option<TlsMaterial>,
    basic_auth_users: Vec<String>,
}

impl<'a, C: Container + ?Sized> Nginx<'a, C> {
    pub fn new(container: &'a C, config: NginxConfig, tls: Option<TlsMaterial>) -> Self {
        Self {
            container,
            config,
            tls,
            basic_auth_users: Vec::new(),
        }
    }

    /// `user:password` 형식의 basic auth 사용자
    pub fn with_basic_auth(mut self, users: Vec<String>) -> Self {
        self.basic_auth_users = users;
        self
    }

    pub fn layer() -> Layer {
        Layer::new("Nginx layer", "Pebble config layer for Nginx")
            .with_service(NGINX_SERVICE, Service::enabled("nginx", "nginx -g 'daemon off;'"))
    }

    /// 컨테이너에 연결할 수 있으면 TLS 파일과 nginx 설정을 맞춥니다.
    ///
    /// TLS 파일 반영이 항상 설정 생성보다 먼저입니다. 설정은 디스크에 있는
    /// 인증서 기준으로 TLS 여부를 결정하기 때문입니다.
    pub async fn reconcile(&self) -> Result<NginxReconcileOutcome, WorkloadError> {
        if !self.container.can_connect().await {
            debug!(container = %self.container.name(), "nginx 컨테이너에 연결할 수 없음");
            return Ok(NginxReconcileOutcome::default());
        }

        self.reconcile_tls_config().await?;
        self.reconcile_basic_auth().await?;
        self.reconcile_nginx_config().await
    }

    pub async fn are_certificates_on_disk(&self) -> Result<bool, WorkloadError> {
        certificates_on_disk(self.container).await
    }

    async fn reconcile_tls_config(&self) -> Result<(), WorkloadError> {
        match &self.tls {
            Some(tls) => self.update_certificates(tls).await,
            None => self.delete_certificates().await,
        }
    }

    async fn read_or_empty(&self, path: &str) -> Result<String, WorkloadError> {
        if self.container.exists(path).await? {
            self.container.pull(path).await
        } else {
            Ok(String::new())
        }
    }

    async fn update_certificates(&self, tls: &TlsMaterial) -> Result<(), WorkloadError> {
        let unchanged = self.read_or_empty(CERT_PATH).await? == tls.certificate
            && self.read_or_empty(KEY_PATH).await? == tls.private_key
            && self.read_or_empty(CA_CERT_PATH).await? == tls.ca;
        if unchanged {
            return Ok(());
        }

        self.container.push(KEY_PATH, &tls.private_key).await?;
        self.container.push(CERT_PATH, &tls.certificate).await?;
        self.container.push(CA_CERT_PATH, &tls.ca).await?;
        info!(container = %self.container.name(), "TLS 인증서 갱신");
        Ok(())
    }

    async fn delete_certificates(&self) -> Result<(), WorkloadError> {
        for path in [CERT_PATH, KEY_PATH, CA_CERT_PATH] {
            if self.container.exists(path).await? {
                self.container.remove_path(path).await?;
                info!(container = %self.container.name(), path = %path, "TLS 파일 삭제");
            }
        }
        Ok(())
    }

    async fn reconcile_basic_auth(&self) -> Result<(), WorkloadError> {
        if self.basic_auth_users.is_empty() {
            if self.container.exists(HTPASSWD_PATH).await? {
                self.container.remove_path(HTPASSWD_PATH).await?;
            }
            return Ok(());
        }

        let current = self.read_or_empty(HTPASSWD_PATH).await?;
        if htpasswd::matches(&current, &self.basic_auth_users)? {
            return Ok(());
        }
        let content = htpasswd::generate(&self.basic_auth_users)?;
        self.container.push(HTPASSWD_PATH, &content).await?;
        info!(users = self.basic_auth_users.len(), "htpasswd 갱신");
        Ok(())
    }

    async fn reconcile_nginx_config(&self) -> Result<NginxReconcileOutcome, WorkloadError> {
        let tls = self.are_certificates_on_disk().await?;
        let htpasswd = (!self.basic_auth_users.is_empty()).then(|| HTPASSWD_PATH.to_string());
        let new_config = self.config.clone().with_basic_auth(htpasswd).build(tls)?;

        // 새 설정을 쓰기 전에 비교해야 변경을 놓치지 않음
        let should_reload = self.has_config_changed(&new_config).await;
        self.container.push(NGINX_CONFIG, &new_config).await?;
        self.container.add_layer(NGINX_LAYER, &Self::layer()).await?;
        self.container.autostart().await?;

        if should_reload {
            info!(tls = tls, "nginx 설정 변경: reload");
            self.reload().await?;
        }

        Ok(NginxReconcileOutcome {
            tls,
            reloaded: should_reload,
        })
    }

    /// 디스크의 설정과 다르면 true. 현재 설정을 읽을 수 없으면 false입니다.
    pub async fn has_config_changed(&self, new_config: &str) -> bool {
        match self.container.pull(NGINX_CONFIG).await {
            Ok(current) => current != new_config,
            Err(e) => {
                warn!(error = %e, "현재 nginx 설정을 읽을 수 없어 변경 여부를 확인하지 못함");
                false
            }
        }
    }

    /// 서비스를 재시작하지 않고 설정만 다시 읽게 합니다.
    pub async fn reload(&self) -> Result<(), WorkloadError> {
        self.container.exec(&["nginx", "-s", "reload"]).await.map(|_| ())
    }
}

/// 인증서, 키, CA 번들이 모두 디스크에 있는지 확인합니다.
pub async fn certificates_on_disk<C: Container + ?Sized>(container: &C) -> Result<bool, WorkloadError> {
    if !container.can_connect().await {
        return Ok(false);
    }
    for path in [CERT_PATH, KEY_PATH, CA_CERT_PATH] {
        if !container.exists(path).await? {
            return Ok(false);
        }
    }
    Ok(true)
}
