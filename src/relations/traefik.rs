use serde_json::{json, Map, Value};

use crate::nginx::Protocol;

/// traefik에 노출할 진입점
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub protocol: Protocol,
    pub port: u16,
}

impl EntryPoint {
    pub fn new(name: impl Into<String>, protocol: Protocol, port: u16) -> Self {
        Self { name: name.into(), protocol, port }
    }
}

/// traefik-route 연동으로 제출할 라우팅 설정
#[derive(Debug, Clone)]
pub struct TraefikRoute {
    model: String,
    app: String,
    fqdn: String,
    tls: bool,
    entrypoints: Vec<EntryPoint>,
}

impl TraefikRoute {
    pub fn new(
        model: impl Into<String>,
        app: impl Into<String>,
        fqdn: impl Into<String>,
        tls: bool,
        entrypoints: Vec<EntryPoint>,
    ) -> Self {
        Self {
            model: model.into(),
            app: app.into(),
            fqdn: fqdn.into(),
            tls,
            entrypoints,
        }
    }

    /// 진입점별 리스닝 주소 (static 설정)
    pub fn static_config(&self) -> Value {
        let entry_points: Map<String, Value> = self
            .entrypoints
            .iter()
            .map(|ep| (ep.name.clone(), json!({ "address": format!(":{}", ep.port) })))
            .collect();
        json!({ "entryPoints": entry_points })
    }

    /// 진입점별 router/service (dynamic 설정)
    pub fn dynamic_config(&self) -> Value {
        let mut routers = Map::new();
        let mut services = Map::new();

        for ep in &self.entrypoints {
            let prefix = format!("juju-{}-{}", self.model, self.app);
            let service_name = format!("{}-service-{}", prefix, ep.name);

            routers.insert(
                format!("{}-{}", prefix, ep.name),
                json!({
                    "entryPoints": [ep.name],
                    "service": service_name,
                    "rule": "ClientIP(`0.0.0.0/0`)",
                }),
            );

            // TLS 없는 grpc는 h2c로 전달해야 함
            let scheme = match (ep.protocol, self.tls) {
                (Protocol::Grpc, false) => "h2c",
                (_, true) => "https",
                (_, false) => "http",
            };
            services.insert(
                service_name,
                json!({
                    "loadBalancer": {
                        "servers": [{ "url": format!("{}://{}:{}", scheme, self.fqdn, ep.port) }]
                    }
                }),
            );
        }

        json!({
            "http": {
                "routers": routers,
                "services": services,
            }
        })
    }

    /// static/dynamic 설정을 하나의 문서로 묶습니다.
    pub fn document(&self) -> Value {
        json!({
            "static": self.static_config(),
            "config": self.dynamic_config(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(tls: bool) -> TraefikRoute {
        TraefikRoute::new(
            "cos",
            "parca",
            "parca-0.parca-endpoints.cos.svc.cluster.local",
            tls,
            vec![
                EntryPoint::new("parca-grpc", Protocol::Grpc, 7993),
                EntryPoint::new("parca-http", Protocol::Http, 7994),
            ],
        )
    }

    #[test]
    fn test_static_config() {
        assert_eq!(
            route(false).static_config(),
            json!({
                "entryPoints": {
                    "parca-grpc": {"address": ":7993"},
                    "parca-http": {"address": ":7994"},
                }
            })
        );
    }

    #[test]
    fn test_grpc_without_tls_uses_h2c() {
        let config = route(false).dynamic_config();
        let services = &config["http"]["services"];
        assert_eq!(
            services["juju-cos-parca-service-parca-grpc"]["loadBalancer"]["servers"][0]["url"],
            "h2c://parca-0.parca-endpoints.cos.svc.cluster.local:7993"
        );
        assert_eq!(
            services["juju-cos-parca-service-parca-http"]["loadBalancer"]["servers"][0]["url"],
            "http://parca-0.parca-endpoints.cos.svc.cluster.local:7994"
        );
        assert_eq!(
            config["http"]["routers"]["juju-cos-parca-parca-grpc"]["service"],
            "juju-cos-parca-service-parca-grpc"
        );
    }

    #[test]
    fn test_tls_uses_https() {
        let config = route(true).dynamic_config();
        let services = &config["http"]["services"];
        assert_eq!(
            services["juju-cos-parca-service-parca-grpc"]["loadBalancer"]["servers"][0]["url"],
            "https://parca-0.parca-endpoints.cos.svc.cluster.local:7993"
        );
    }
}
