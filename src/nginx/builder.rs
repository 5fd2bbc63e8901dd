use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::directive::Directive;
use super::error::NginxConfigError;
use super::model::{ConfigDocument, Location, ServerBlock, ServerOptions, TlsPaths, Upstream};
use super::resolver::ResolverSource;

const LOG_FORMAT: &str = r#"$remote_addr - $remote_user [$time_local]  $status "$request" $body_bytes_sent "$http_referer" "$http_user_agent" "$http_x_forwarded_for""#;

/// nginx 설정 빌더
///
/// 입력(호스트 이름, upstream, 포트별 location, path prefix)이 같으면 항상 같은
/// 텍스트를 생성합니다. 호출자는 결과를 디스크의 설정과 비교해 reload 여부를 결정합니다.
#[derive(Debug, Clone)]
pub struct NginxConfig {
    server_name: String,
    upstreams: Vec<Upstream>,
    server_ports_to_locations: BTreeMap<u16, Vec<Location>>,
    path_prefix: Option<String>,
    resolver: ResolverSource,
    ipv6: bool,
    htpasswd: Option<String>,
    verbose_access_log: bool,
}

impl NginxConfig {
    /// 입력을 검증하고 빌더를 생성합니다.
    ///
    /// upstream 이름 중복, 빈 upstream, 정의되지 않은 upstream을 참조하는
    /// location, location이 없는 포트는 모두 거부됩니다.
    pub fn new(
        server_name: impl Into<String>,
        upstreams: Vec<Upstream>,
        server_ports_to_locations: BTreeMap<u16, Vec<Location>>,
    ) -> Result<Self, NginxConfigError> {
        let server_name = server_name.into();
        if server_name.is_empty() {
            return Err(NginxConfigError::EmptyHostname);
        }

        let mut names = HashSet::new();
        for upstream in &upstreams {
            upstream.validate()?;
            if !names.insert(upstream.name.as_str()) {
                return Err(NginxConfigError::DuplicateUpstream(upstream.name.clone()));
            }
        }

        for (port, locations) in &server_ports_to_locations {
            if locations.is_empty() {
                return Err(NginxConfigError::NoLocations(*port));
            }
            if let Some(location) = locations.iter().find(|l| !names.contains(l.upstream.as_str())) {
                return Err(NginxConfigError::UnknownUpstream {
                    port: *port,
                    path: location.path.clone(),
                    upstream: location.upstream.clone(),
                });
            }
        }

        Ok(Self {
            server_name,
            upstreams,
            server_ports_to_locations,
            path_prefix: None,
            resolver: ResolverSource::default(),
            ipv6: false,
            htpasswd: None,
            verbose_access_log: false,
        })
    }

    /// 빈 문자열은 prefix 없음으로 취급합니다. 값은 `/`로 시작한다고 가정합니다.
    pub fn with_path_prefix(mut self, path_prefix: Option<String>) -> Self {
        self.path_prefix = path_prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverSource) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_ipv6(mut self, ipv6: bool) -> Self {
        self.ipv6 = ipv6;
        self
    }

    /// basic auth용 htpasswd 파일 경로를 지정합니다.
    pub fn with_basic_auth(mut self, htpasswd_path: Option<String>) -> Self {
        self.htpasswd = htpasswd_path;
        self
    }

    pub fn with_verbose_access_log(mut self, verbose: bool) -> Self {
        self.verbose_access_log = verbose;
        self
    }

    /// 설정을 텍스트로 생성합니다.
    pub fn build(&self, tls: bool) -> Result<String, NginxConfigError> {
        Ok(self.document(tls)?.render())
    }

    /// 설정 문서를 디렉티브 트리로 생성합니다. resolver 확인에 실패하면 문서를 만들지 않습니다.
    pub fn document(&self, tls: bool) -> Result<ConfigDocument, NginxConfigError> {
        let resolver = self.resolver.resolve()?;

        let mut http = Vec::new();
        http.extend(self.upstreams.iter().map(Upstream::to_directive));
        http.extend([
            Directive::new("client_body_temp_path", ["/tmp/client_temp"]),
            Directive::new("proxy_temp_path", ["/tmp/proxy_temp_path"]),
            Directive::new("fastcgi_temp_path", ["/tmp/fastcgi_temp"]),
            Directive::new("uwsgi_temp_path", ["/tmp/uwsgi_temp"]),
            Directive::new("scgi_temp_path", ["/tmp/scgi_temp"]),
            Directive::new("default_type", ["application/octet-stream"]),
            Directive::new("log_format", ["main", LOG_FORMAT]),
        ]);
        http.extend(self.access_log());
        http.extend([
            Directive::new("sendfile", ["on"]),
            Directive::new("tcp_nopush", ["on"]),
            Directive::new("resolver", [resolver]),
            // 멀티 테넌시 헤더가 없으면 anonymous로 채움
            Directive::block(
                "map",
                ["$http_x_scope_orgid", "$ensured_x_scope_orgid"],
                vec![
                    Directive::new("default", ["$http_x_scope_orgid"]),
                    Directive::new("", ["anonymous"]),
                ],
            ),
            Directive::new("proxy_read_timeout", ["300"]),
        ]);

        let options = ServerOptions {
            server_name: &self.server_name,
            path_prefix: self.path_prefix.as_deref(),
            ipv6: self.ipv6,
            htpasswd: self.htpasswd.as_deref(),
        };
        for server in self.servers(tls) {
            http.push(server.to_directive(&options));
        }

        debug!(
            server_name = %self.server_name,
            tls = tls,
            ports = ?self.server_ports_to_locations.keys().collect::<Vec<_>>(),
            "nginx 설정 생성"
        );

        Ok(ConfigDocument {
            directives: vec![
                Directive::new("worker_processes", ["5"]),
                Directive::new("error_log", ["/dev/stderr", "error"]),
                Directive::new("pid", ["/tmp/nginx.pid"]),
                Directive::new("worker_rlimit_nofile", ["8192"]),
                Directive::section("events", vec![Directive::new("worker_connections", ["4096"])]),
                Directive::section("http", http),
            ],
        })
    }

    /// 포트 순서대로 server 블록을 만듭니다.
    pub fn servers(&self, tls: bool) -> Vec<ServerBlock> {
        self.server_ports_to_locations
            .iter()
            .map(|(port, locations)| ServerBlock {
                port: *port,
                tls: tls.then(TlsPaths::default),
                locations: locations.clone(),
            })
            .collect()
    }

    fn access_log(&self) -> Vec<Directive> {
        if self.verbose_access_log {
            return vec![Directive::new("access_log", ["/dev/stderr", "main"])];
        }
        vec![
            Directive::block(
                "map",
                ["$status", "$loggable"],
                vec![
                    Directive::new("~^[23]", ["0"]),
                    Directive::new("default", ["1"]),
                ],
            ),
            Directive::new("access_log", ["/dev/stderr"]),
        ]
    }
}
