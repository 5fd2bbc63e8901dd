use std::io::BufReader;

use serde::Deserialize;
use tokio_rustls::rustls::{self, Certificate, PrivateKey};
use tracing::warn;

use super::RelationError;

const RELATION: &str = "certificates";

/// 인증서 제공자로부터 받은 데이터. 세 값이 모두 있어야 TLS가 활성화됩니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTlsMaterial {
    pub certificate: Option<String>,
    pub ca: Option<String>,
    #[serde(rename = "private-key", alias = "private_key")]
    pub private_key: Option<String>,
}

impl RawTlsMaterial {
    /// 하나라도 빠지면 TLS 비활성으로 취급하여 `None`을 반환합니다.
    pub fn complete(self) -> Option<TlsMaterial> {
        match (self.certificate, self.ca, self.private_key) {
            (Some(certificate), Some(ca), Some(private_key)) => Some(TlsMaterial {
                certificate,
                ca,
                private_key,
            }),
            (None, None, None) => None,
            _ => {
                warn!("인증서 데이터가 불완전하여 TLS를 비활성화합니다");
                None
            }
        }
    }
}

/// PEM 형식의 서버 인증서, CA 번들, 개인키
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub certificate: String,
    pub ca: String,
    pub private_key: String,
}

impl TlsMaterial {
    /// PEM을 파싱하고 인증서와 개인키로 서버 설정을 만들 수 있는지 확인합니다.
    pub fn validate(&self) -> Result<(), RelationError> {
        let certs = parse_certs(&self.certificate, "certificate")?;
        parse_certs(&self.ca, "ca")?;
        let key = parse_private_key(&self.private_key)?;

        rustls::ServerConfig::builder()
            .with_safe_defaults()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| RelationError::invalid_field(RELATION, "private-key", e.to_string()))?;
        Ok(())
    }
}

fn parse_certs(pem: &str, field: &str) -> Result<Vec<Certificate>, RelationError> {
    let mut reader = BufReader::new(pem.as_bytes());
    let certs = rustls_pemfile::certs(&mut reader)
        .map_err(|e| RelationError::invalid_field(RELATION, field, e.to_string()))?;
    if certs.is_empty() {
        return Err(RelationError::invalid_field(RELATION, field, "PEM 인증서가 없음"));
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

fn parse_private_key(pem: &str) -> Result<PrivateKey, RelationError> {
    let mut reader = BufReader::new(pem.as_bytes());
    let key = rustls_pemfile::pkcs8_private_keys(&mut reader)
        .map_err(|e| RelationError::invalid_field(RELATION, "private-key", e.to_string()))?
        .into_iter()
        .next();
    if let Some(key) = key {
        return Ok(PrivateKey(key));
    }

    // PKCS#8이 아니면 PKCS#1 RSA 키로 재시도
    let mut reader = BufReader::new(pem.as_bytes());
    rustls_pemfile::rsa_private_keys(&mut reader)
        .map_err(|e| RelationError::invalid_field(RELATION, "private-key", e.to_string()))?
        .into_iter()
        .next()
        .map(PrivateKey)
        .ok_or_else(|| RelationError::invalid_field(RELATION, "private-key", "개인키를 찾을 수 없음"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_material() {
        let raw = RawTlsMaterial {
            certificate: Some("cert".to_string()),
            ca: Some("ca".to_string()),
            private_key: Some("key".to_string()),
        };
        let material = raw.complete().unwrap();
        assert_eq!(material.certificate, "cert");
        assert_eq!(material.private_key, "key");
    }

    #[test]
    fn test_partial_material_disables_tls() {
        let raw = RawTlsMaterial {
            certificate: Some("cert".to_string()),
            ca: None,
            private_key: Some("key".to_string()),
        };
        assert!(raw.complete().is_none());
        assert!(RawTlsMaterial::default().complete().is_none());
    }

    #[test]
    fn test_validate_rejects_non_pem() {
        let material = TlsMaterial {
            certificate: "not a certificate".to_string(),
            ca: "not a ca".to_string(),
            private_key: "not a key".to_string(),
        };
        assert!(matches!(
            material.validate(),
            Err(RelationError::InvalidField { field, .. }) if field == "certificate"
        ));
    }

    #[test]
    fn test_raw_material_from_json() {
        let raw: RawTlsMaterial = serde_json::from_str(
            r#"{"certificate": "c", "ca": "a", "private-key": "k"}"#,
        )
        .unwrap();
        assert!(raw.complete().is_some());
    }
}
