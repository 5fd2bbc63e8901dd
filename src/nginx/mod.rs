//! Parca 앞단 nginx 리버스 프록시의 설정을 생성하는 모듈입니다.

mod builder;
mod directive;
mod error;
mod model;
mod resolver;

pub use builder::NginxConfig;
pub use directive::{render, Directive};
pub use error::NginxConfigError;
pub use model::{ConfigDocument, Location, Protocol, ServerBlock, TlsPaths, Upstream, UpstreamServer};
pub use resolver::{nameserver, ResolverSource};

pub const NGINX_DIR: &str = "/etc/nginx";
pub const NGINX_CONFIG: &str = "/etc/nginx/nginx.conf";
pub const KEY_PATH: &str = "/etc/nginx/certs/server.key";
pub const CERT_PATH: &str = "/etc/nginx/certs/server.cert";
pub const CA_CERT_PATH: &str = "/usr/local/share/ca-certificates/ca.cert";
pub const HTPASSWD_PATH: &str = "/etc/nginx/secrets/.htpasswd";
pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";
