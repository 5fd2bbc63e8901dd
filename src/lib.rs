//! parca_operator는 Parca 프로파일링 서버와 그 앞단 nginx 리버스 프록시를 관리하는 오퍼레이터입니다.
//!
//! # 주요 기능
//!
//! - nginx 설정 생성 (upstream, 포트별 location, TLS, path prefix)
//! - parca, nginx, exporter 워크로드 reconcile
//! - 연동 데이터(인그레스, 인증서, S3, 원격 저장소) 검증
//!
//! # 예제
//!
//! ```
//! use std::collections::BTreeMap;
//! use parca_operator::nginx::{Location, NginxConfig, ResolverSource, Upstream, UpstreamServer};
//!
//! let upstreams = vec![Upstream::new("parca", vec![UpstreamServer::local(7070)])];
//!
//! let mut ports = BTreeMap::new();
//! ports.insert(7993, vec![Location::grpc("/", "parca")]);
//! ports.insert(7994, vec![Location::http("/", "parca")]);
//!
//! let config = NginxConfig::new("parca-0.svc", upstreams, ports)
//!     .unwrap()
//!     .with_resolver(ResolverSource::Custom("10.0.0.10".to_string()));
//!
//! let rendered = config.build(false).unwrap();
//! assert!(rendered.contains("listen 7993 http2;"));
//! assert!(rendered.contains("resolver 10.0.0.10;"));
//! ```
//!
//! # Path prefix
//!
//! 인그레스 뒤에서 prefix가 있으면 루트 요청은 prefix로 리다이렉트됩니다.
//!
//! ```
//! use std::collections::BTreeMap;
//! use parca_operator::nginx::{Location, NginxConfig, ResolverSource, Upstream, UpstreamServer};
//!
//! let mut ports = BTreeMap::new();
//! ports.insert(7994, vec![Location::http("/", "parca")]);
//!
//! let config = NginxConfig::new("parca-0.svc", vec![Upstream::new("parca", vec![UpstreamServer::local(7070)])], ports)
//!     .unwrap()
//!     .with_path_prefix(Some("/cos-parca".to_string()))
//!     .with_resolver(ResolverSource::Custom("10.0.0.10".to_string()));
//!
//! assert!(config.build(false).unwrap().contains("return 302 /cos-parca;"));
//! ```

pub mod logging;
pub mod nginx;
pub mod reconcile;
pub mod relations;
pub mod settings;
pub mod workload;
