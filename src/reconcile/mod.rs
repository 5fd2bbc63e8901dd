//! 외부 입력 스냅샷을 받아 워크로드를 맞추는 reconcile 루프입니다.

mod error;
mod reconciler;
mod snapshot;
mod watcher;

pub use error::ReconcileError;
pub use reconciler::{PassOutcome, Reconciler, PARCA_UPSTREAM};
pub use snapshot::Snapshot;
pub use watcher::{SnapshotEvent, SnapshotWatcher};
