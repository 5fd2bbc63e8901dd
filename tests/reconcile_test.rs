use parca_operator::nginx::ResolverSource;
use parca_operator::reconcile::{ReconcileError, Reconciler, Snapshot};
use parca_operator::settings::Settings;
use parca_operator::workload::{FsContainer, PARCA_SERVICE};
use std::path::Path;
use std::sync::Arc;

const SNAPSHOT: &str = r#"{
    "hostname": "parca-0.parca-endpoints.cos.svc.cluster.local",
    "is_leader": true,
    "ingress": {"scheme": "http", "external_host": "parca.example.com", "path_prefix": "/cos-parca"},
    "scrape_jobs": [
        {"job_name": "profiled-app", "static_configs": [{"targets": ["10.1.0.5:8080"]}]}
    ]
}"#;

// 테스트용 컨테이너 루트와 reconciler 생성
fn setup(dir: &Path) -> Reconciler {
    for name in ["parca", "nginx", "exporter"] {
        std::fs::create_dir_all(dir.join(name)).unwrap();
    }

    let mut settings = Settings::default();
    settings.runtime.model = "cos".to_string();
    settings.runtime.route_output_path = dir.join("out").join("route.json");
    settings.nginx.ipv6 = false;

    Reconciler::new(
        settings,
        Arc::new(FsContainer::new("parca", dir.join("parca"))),
        Arc::new(FsContainer::new("nginx", dir.join("nginx"))),
        Arc::new(FsContainer::new("nginx-prometheus-exporter", dir.join("exporter"))),
    )
    .with_resolver(ResolverSource::Custom("10.0.0.10".to_string()))
}

#[tokio::test]
async fn test_full_pass_writes_all_workloads() {
    let dir = tempfile::tempdir().unwrap();
    let reconciler = setup(dir.path());
    let snapshot = Snapshot::from_json(SNAPSHOT).unwrap();

    let outcome = reconciler.reconcile(&snapshot, "test").await.unwrap();
    assert!(outcome.parca_restarted);
    assert!(!outcome.nginx.tls);
    assert!(outcome.route_written);

    // parca 설정 파일과 레이어
    let parca_yaml = std::fs::read_to_string(dir.path().join("parca/etc/parca/parca.yaml")).unwrap();
    assert!(parca_yaml.contains("profiled-app"));
    assert!(parca_yaml.contains("FILESYSTEM"));
    let parca_layer = std::fs::read_to_string(dir.path().join("parca/.layers/parca.json")).unwrap();
    assert!(parca_layer.contains("--path-prefix=/cos-parca"));

    // nginx 설정
    let nginx_conf = std::fs::read_to_string(dir.path().join("nginx/etc/nginx/nginx.conf")).unwrap();
    assert!(nginx_conf.contains("server_name parca-0.parca-endpoints.cos.svc.cluster.local;"));
    assert!(nginx_conf.contains("return 302 /cos-parca;"));
    assert!(nginx_conf.contains("resolver 10.0.0.10;"));

    // exporter 레이어
    let exporter_layer =
        std::fs::read_to_string(dir.path().join("exporter/.layers/nginx-prometheus-exporter.json")).unwrap();
    assert!(exporter_layer.contains("http://127.0.0.1:7994/status"));

    // traefik 라우트 문서
    let route: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out/route.json")).unwrap()).unwrap();
    assert_eq!(route["static"]["entryPoints"]["parca-grpc"]["address"], ":7993");
    assert_eq!(
        route["config"]["http"]["services"]["juju-cos-parca-service-parca-grpc"]["loadBalancer"]["servers"][0]["url"],
        "h2c://parca-0.parca-endpoints.cos.svc.cluster.local:7993"
    );
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let reconciler = setup(dir.path());
    let snapshot = Snapshot::from_json(SNAPSHOT).unwrap();

    let first = reconciler.reconcile(&snapshot, "startup").await.unwrap();
    let second = reconciler.reconcile(&snapshot, "snapshot-modified").await.unwrap();

    assert_ne!(first.pass_id, second.pass_id);
    assert!(!second.parca_restarted);
    assert!(!second.nginx.reloaded);
    assert!(!second.route_written);
}

#[tokio::test]
async fn test_non_leader_skips_route() {
    let dir = tempfile::tempdir().unwrap();
    let reconciler = setup(dir.path());
    let snapshot = Snapshot::from_json(&SNAPSHOT.replace(r#""is_leader": true"#, r#""is_leader": false"#)).unwrap();

    let outcome = reconciler.reconcile(&snapshot, "test").await.unwrap();
    assert!(!outcome.route_written);
    assert!(!dir.path().join("out/route.json").exists());
}

#[tokio::test]
async fn test_resolver_failure_aborts_before_nginx_write() {
    let dir = tempfile::tempdir().unwrap();
    let reconciler = setup(dir.path()).with_resolver(ResolverSource::File(dir.path().join("missing.conf")));
    let snapshot = Snapshot::from_json(SNAPSHOT).unwrap();

    let result = reconciler.reconcile(&snapshot, "test").await;
    assert!(matches!(result, Err(ReconcileError::Workload(_))));
    assert!(!dir.path().join("nginx/etc/nginx/nginx.conf").exists());
    assert!(!dir.path().join("out/route.json").exists());
}

#[tokio::test]
async fn test_snapshot_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, SNAPSHOT).unwrap();

    let snapshot = Snapshot::from_file(&path).await.unwrap();
    assert!(snapshot.is_leader);
    assert_eq!(snapshot.scrape_jobs[0].job_name, "profiled-app");

    assert!(matches!(
        Snapshot::from_file(dir.path().join("missing.json")).await,
        Err(ReconcileError::SnapshotRead { .. })
    ));
}

#[tokio::test]
async fn test_remote_store_and_s3() {
    let dir = tempfile::tempdir().unwrap();
    let reconciler = setup(dir.path());
    let snapshot = Snapshot::from_json(
        r#"{
            "hostname": "parca-0.svc",
            "s3": {"endpoint": "https://s3.example.com", "bucket": "profiles", "access-key": "ak", "secret-key": "sk", "region": "eu-west-1"},
            "remote_store": {"remote-store-address": "grpc.polarsignals.com:443", "remote-store-bearer-token": "deadbeef"}
        }"#,
    )
    .unwrap();

    reconciler.reconcile(&snapshot, "test").await.unwrap();

    let parca_yaml = std::fs::read_to_string(dir.path().join("parca/etc/parca/parca.yaml")).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&parca_yaml).unwrap();
    assert_eq!(value["object_storage"]["bucket"]["type"], "S3");
    assert_eq!(value["object_storage"]["bucket"]["config"]["bucket"], "profiles");
    assert_eq!(value["object_storage"]["bucket"]["config"]["endpoint"], "s3.example.com");
    assert_eq!(value["object_storage"]["bucket"]["config"]["insecure"], false);

    let parca_layer = std::fs::read_to_string(dir.path().join("parca/.layers/parca.json")).unwrap();
    assert!(parca_layer.contains("--store-address=grpc.polarsignals.com:443"));
    assert!(parca_layer.contains("--mode=scraper-only"));
}

#[tokio::test]
async fn test_path_prefix_change_requests_parca_restart() {
    let dir = tempfile::tempdir().unwrap();
    let reconciler = setup(dir.path());
    let supervisor = FsContainer::new("parca", dir.path().join("parca"));

    let without_prefix = Snapshot::from_json(&SNAPSHOT.replace(r#", "path_prefix": "/cos-parca""#, "")).unwrap();
    reconciler.reconcile(&without_prefix, "startup").await.unwrap();
    let before = supervisor.services().await.unwrap()[PARCA_SERVICE].clone();
    assert!(!before.command.contains("--path-prefix"));

    // parca.yaml은 같고 명령행만 바뀜
    let with_prefix = Snapshot::from_json(SNAPSHOT).unwrap();
    let outcome = reconciler.reconcile(&with_prefix, "snapshot-modified").await.unwrap();
    assert!(outcome.parca_restarted);

    let after = supervisor.services().await.unwrap()[PARCA_SERVICE].clone();
    assert_eq!(after.generation, before.generation + 1);
    assert!(after.command.contains("--path-prefix=/cos-parca"));
}
