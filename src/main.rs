use std::path::Path;
use std::sync::Arc;

use parca_operator::logging::init_logging;
use parca_operator::reconcile::{ReconcileError, Reconciler, Snapshot, SnapshotEvent, SnapshotWatcher};
use parca_operator::settings::Settings;
use parca_operator::workload::{FsContainer, VersionProbe};
use tracing::{error, info, warn};

async fn run_pass(reconciler: &Reconciler, snapshot_path: &Path, trigger: &str) -> Result<(), ReconcileError> {
    let snapshot = Snapshot::from_file(snapshot_path).await?;
    reconciler.reconcile(&snapshot, trigger).await.map(|_| ())
}

#[tokio::main]
async fn main() {
    let settings = match Settings::load().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&settings.logging);

    let runtime = settings.runtime.clone();
    let parca_port = settings.ports.parca;
    let reconciler = Reconciler::new(
        settings,
        Arc::new(FsContainer::new("parca", &runtime.parca_root)),
        Arc::new(FsContainer::new("nginx", &runtime.nginx_root)),
        Arc::new(FsContainer::new("nginx-prometheus-exporter", &runtime.exporter_root)),
    );

    info!(
        snapshot = %runtime.snapshot_path.display(),
        watch = runtime.watch,
        "parca 오퍼레이터 시작"
    );

    if let Err(e) = run_pass(&reconciler, &runtime.snapshot_path, "startup").await {
        error!(error = %e, "초기 reconcile 실패");
        if !runtime.watch {
            std::process::exit(1);
        }
    }

    let probe = tokio::spawn(async move {
        let version = VersionProbe::new(parca_port).version().await;
        info!(version = %version, "parca 워크로드 버전");
    });

    if !runtime.watch {
        if let Err(e) = probe.await {
            warn!(error = %e, "버전 확인 작업 실패");
        }
        return;
    }

    let mut watcher = SnapshotWatcher::new(&runtime.snapshot_path);
    if let Err(e) = watcher.start() {
        error!(error = %e, "스냅샷 감시 시작 실패");
        std::process::exit(1);
    }

    // 한 번에 하나의 패스만 실행되며, 실행 중 쌓인 이벤트는 다음 패스 하나로 합쳐짐
    while let Some(event) = watcher.watch().await {
        let coalesced = watcher.drain();
        if matches!(event, SnapshotEvent::Deleted(_)) && !runtime.snapshot_path.exists() {
            warn!(path = %runtime.snapshot_path.display(), "스냅샷 파일 삭제됨, 다음 변경까지 대기");
            continue;
        }
        if coalesced > 0 {
            info!(coalesced = coalesced, "연속된 스냅샷 이벤트를 한 번의 패스로 처리");
        }
        if let Err(e) = run_pass(&reconciler, &runtime.snapshot_path, event.trigger()).await {
            error!(error = %e, trigger = event.trigger(), "reconcile 실패");
        }
    }
}
