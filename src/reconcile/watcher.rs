use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Result as NotifyResult, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::error::ReconcileError;

/// 스냅샷 파일 변경 이벤트
#[derive(Debug, PartialEq, Clone)]
pub enum SnapshotEvent {
    Modified(PathBuf),
    Created(PathBuf),
    Deleted(PathBuf),
}

impl SnapshotEvent {
    /// 로그와 패스 기록에 남길 트리거 이름
    pub fn trigger(&self) -> &'static str {
        match self {
            SnapshotEvent::Modified(_) => "snapshot-modified",
            SnapshotEvent::Created(_) => "snapshot-created",
            SnapshotEvent::Deleted(_) => "snapshot-deleted",
        }
    }
}

/// 스냅샷 파일 감시자
///
/// 파일을 원자적으로 교체하는 경우에도 이벤트를 놓치지 않도록 상위 디렉토리를
/// 감시하고 대상 파일 이름으로 거릅니다.
pub struct SnapshotWatcher {
    path: PathBuf,
    event_tx: mpsc::Sender<SnapshotEvent>,
    event_rx: mpsc::Receiver<SnapshotEvent>,
    watcher: Option<RecommendedWatcher>,
}

impl SnapshotWatcher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            path: path.into(),
            event_tx,
            event_rx,
            watcher: None,
        }
    }

    /// 테스트용 이벤트 송신자 반환
    #[cfg(test)]
    pub fn get_sender(&self) -> mpsc::Sender<SnapshotEvent> {
        self.event_tx.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start(&mut self) -> Result<(), ReconcileError> {
        let event_tx = self.event_tx.clone();
        let target = self.path.file_name().map(|name| name.to_os_string());

        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: NotifyResult<Event>| {
            match res {
                Ok(event) => {
                    use notify::EventKind::*;

                    for path in event.paths {
                        if path.file_name().map(|n| n.to_os_string()) != target {
                            continue;
                        }
                        let snapshot_event = match event.kind {
                            Modify(_) => SnapshotEvent::Modified(path),
                            Create(_) => SnapshotEvent::Created(path),
                            Remove(_) => SnapshotEvent::Deleted(path),
                            _ => continue,
                        };
                        debug!(event = ?snapshot_event, "스냅샷 파일 이벤트");
                        let _ = event_tx.blocking_send(snapshot_event);
                    }
                }
                Err(e) => error!("감시 오류: {}", e),
            }
        })
        .map_err(|e| ReconcileError::WatchError(e.to_string()))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        debug!("경로 감시 시작: {}", dir.display());
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| ReconcileError::WatchError(e.to_string()))?;

        self.watcher = Some(watcher);
        Ok(())
    }

    /// 이벤트 수신 대기
    pub async fn watch(&mut self) -> Option<SnapshotEvent> {
        self.event_rx.recv().await
    }

    /// 이미 쌓인 이벤트를 버리고 개수를 반환합니다. 연속된 쓰기를 한 번의 패스로 묶을 때 사용합니다.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.event_rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}
