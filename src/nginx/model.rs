use std::fmt;

use super::directive::{render, Directive};
use super::error::NginxConfigError;
use super::{CA_CERT_PATH, CERT_PATH, KEY_PATH};

/// upstream 서버 주소 (host:port)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamServer {
    pub host: String,
    pub port: u16,
}

impl UpstreamServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// 같은 파드 안의 워크로드를 가리키는 주소
    pub fn local(port: u16) -> Self {
        Self::new("127.0.0.1", port)
    }
}

impl fmt::Display for UpstreamServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 이름이 붙은 백엔드 그룹입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub name: String,
    pub servers: Vec<UpstreamServer>,
}

impl Upstream {
    pub fn new(name: impl Into<String>, servers: Vec<UpstreamServer>) -> Self {
        Self { name: name.into(), servers }
    }

    pub fn validate(&self) -> Result<(), NginxConfigError> {
        let valid_token = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid_token {
            return Err(NginxConfigError::InvalidUpstreamName(self.name.clone()));
        }
        if self.servers.is_empty() {
            return Err(NginxConfigError::EmptyUpstream(self.name.clone()));
        }
        Ok(())
    }

    pub(crate) fn to_directive(&self) -> Directive {
        let servers = self
            .servers
            .iter()
            .map(|server| Directive::new("server", [server.to_string()]))
            .collect();
        Directive::block("upstream", [self.name.as_str()], servers)
    }
}

/// location이 upstream으로 요청을 넘기는 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Grpc,
}

impl Protocol {
    pub fn scheme(&self, tls: bool) -> &'static str {
        match (self, tls) {
            (Protocol::Http, false) => "http",
            (Protocol::Http, true) => "https",
            (Protocol::Grpc, false) => "grpc",
            (Protocol::Grpc, true) => "grpcs",
        }
    }

    fn pass_directive(&self) -> &'static str {
        match self {
            Protocol::Http => "proxy_pass",
            Protocol::Grpc => "grpc_pass",
        }
    }
}

/// 경로 기반 라우팅 규칙
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub upstream: String,
    pub protocol: Protocol,
    /// upstream과의 연결에 TLS를 사용할지 여부. TLS는 nginx에서 종료되므로 보통 false
    pub backend_tls: bool,
}

impl Location {
    pub fn new(path: impl Into<String>, upstream: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            path: path.into(),
            upstream: upstream.into(),
            protocol,
            backend_tls: false,
        }
    }

    pub fn http(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self::new(path, upstream, Protocol::Http)
    }

    pub fn grpc(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self::new(path, upstream, Protocol::Grpc)
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// upstream으로 요청을 넘기는 디렉티브 목록
    fn proxy_block(&self) -> Vec<Directive> {
        let backend = format!("{}://{}", self.protocol.scheme(self.backend_tls), self.upstream);
        vec![
            Directive::new("set", ["$backend".to_string(), backend]),
            Directive::new(self.protocol.pass_directive(), ["$backend"]),
            // 죽은 백엔드에서 오래 기다리지 않고 다음 서버로 넘어가도록 짧게 설정
            Directive::new("proxy_connect_timeout", ["5s"]),
        ]
    }

    /// path prefix가 있으면 루트 location은 prefix로 리다이렉트하고,
    /// prefix 위치에 실제 프록시 location을 추가합니다.
    pub(crate) fn to_directives(&self, path_prefix: Option<&str>) -> Vec<Directive> {
        match path_prefix {
            Some(prefix) if self.is_root() => vec![
                Directive::block("location", ["/"], vec![Directive::new("return", ["302", prefix])]),
                Directive::block("location", [prefix], self.proxy_block()),
            ],
            _ => vec![Directive::block("location", [self.path.as_str()], self.proxy_block())],
        }
    }
}

/// TLS 인증서, 키, CA 번들의 파일 경로. 항상 셋이 함께 존재합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub certificate: String,
    pub private_key: String,
    pub ca_bundle: String,
}

impl Default for TlsPaths {
    fn default() -> Self {
        Self {
            certificate: CERT_PATH.to_string(),
            private_key: KEY_PATH.to_string(),
            ca_bundle: CA_CERT_PATH.to_string(),
        }
    }
}

/// 리스닝 포트 하나에 대한 server 블록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerBlock {
    pub port: u16,
    pub tls: Option<TlsPaths>,
    pub locations: Vec<Location>,
}

impl ServerBlock {
    pub fn is_grpc(&self) -> bool {
        self.locations.iter().any(|l| l.protocol == Protocol::Grpc)
    }

    fn listen_args(&self, ipv6: bool) -> Vec<String> {
        let mut args = vec![if ipv6 {
            format!("[::]:{}", self.port)
        } else {
            self.port.to_string()
        }];
        if self.tls.is_some() {
            args.push("ssl".to_string());
        }
        if self.is_grpc() {
            args.push("http2".to_string());
        }
        args
    }

    pub(crate) fn to_directive(&self, options: &ServerOptions<'_>) -> Directive {
        let mut block = vec![Directive::new("listen", self.listen_args(false))];
        if options.ipv6 {
            block.push(Directive::new("listen", self.listen_args(true)));
        }

        if let Some(htpasswd) = options.htpasswd {
            block.push(Directive::new("auth_basic", ["Parca"]));
            block.push(Directive::new("auth_basic_user_file", [htpasswd]));
        }

        block.push(Directive::new("proxy_set_header", ["X-Scope-OrgID", "$ensured_x_scope_orgid"]));
        block.push(Directive::new("server_name", [options.server_name]));

        if let Some(tls) = &self.tls {
            block.push(Directive::new("ssl_certificate", [tls.certificate.as_str()]));
            block.push(Directive::new("ssl_certificate_key", [tls.private_key.as_str()]));
            block.push(Directive::new("ssl_protocols", ["TLSv1", "TLSv1.1", "TLSv1.2"]));
            block.push(Directive::new("ssl_ciphers", ["HIGH:!aNULL:!MD5"]));
        }

        for location in &self.locations {
            block.extend(location.to_directives(options.path_prefix));
        }

        Directive::section("server", block)
    }
}

/// server 블록 공통 옵션
pub(crate) struct ServerOptions<'a> {
    pub server_name: &'a str,
    pub path_prefix: Option<&'a str>,
    pub ipv6: bool,
    pub htpasswd: Option<&'a str>,
}

/// 완성된 nginx 설정 문서. 매 reconcile마다 새로 만들어지고 직렬화 후 버려집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    pub directives: Vec<Directive>,
}

impl ConfigDocument {
    pub fn render(&self) -> String {
        render(&self.directives)
    }

    /// `http` 블록 안에서 주어진 포트로 listen하는 server 블록을 찾습니다.
    pub fn server(&self, port: u16) -> Option<&Directive> {
        let port = port.to_string();
        self.directives
            .iter()
            .find(|d| d.name == "http")?
            .block
            .as_ref()?
            .iter()
            .filter(|d| d.name == "server")
            .find(|server| {
                server
                    .find("listen")
                    .map_or(false, |listen| listen.args.first() == Some(&port))
            })
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
