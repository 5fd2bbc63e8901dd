use std::fmt;

use crate::relations::RelationError;
use crate::workload::WorkloadError;

#[derive(Debug)]
pub enum ReconcileError {
    /// 스냅샷 파일을 읽을 수 없음
    SnapshotRead {
        path: String,
        error: std::io::Error,
    },
    /// 스냅샷 JSON 파싱 실패
    SnapshotParse(String),
    /// 스냅샷 값 검증 실패
    Relation(RelationError),
    /// 워크로드 반영 실패
    Workload(WorkloadError),
    /// 라우트 문서 기록 실패
    RouteWrite {
        path: String,
        reason: String,
    },
    /// 파일 감시 설정 실패
    WatchError(String),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SnapshotRead { path, error } =>
                write!(f, "스냅샷 {} 읽기 실패: {}", path, error),
            Self::SnapshotParse(reason) =>
                write!(f, "스냅샷 파싱 오류: {}", reason),
            Self::Relation(e) =>
                write!(f, "잘못된 연동 데이터: {}", e),
            Self::Workload(e) =>
                write!(f, "워크로드 반영 실패: {}", e),
            Self::RouteWrite { path, reason } =>
                write!(f, "라우트 문서 {} 기록 실패: {}", path, reason),
            Self::WatchError(reason) =>
                write!(f, "감시 오류: {}", reason),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SnapshotRead { error, .. } => Some(error),
            Self::Relation(e) => Some(e),
            Self::Workload(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RelationError> for ReconcileError {
    fn from(err: RelationError) -> Self {
        ReconcileError::Relation(err)
    }
}

impl From<WorkloadError> for ReconcileError {
    fn from(err: WorkloadError) -> Self {
        ReconcileError::Workload(err)
    }
}
