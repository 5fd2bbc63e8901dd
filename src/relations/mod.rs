//! 외부 연동(relation) 데이터의 스키마 타입입니다.
//!
//! 모든 데이터는 경계에서 파싱하고 검증하며, 잘못된 값은 즉시 거부됩니다.

mod error;
mod ingress;
mod s3;
mod scrape;
mod store;
mod tls;
mod traefik;

pub use error::RelationError;
pub use ingress::IngressState;
pub use s3::{S3ConnectionInfo, S3_SCHEMA};
pub use scrape::{ScrapeJob, StaticConfig};
pub use store::RemoteStoreConfig;
pub use tls::{RawTlsMaterial, TlsMaterial};
pub use traefik::{EntryPoint, TraefikRoute};
