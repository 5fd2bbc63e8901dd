use std::path::Path;
use std::time::Instant;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, error, info, span, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 로거를 초기화합니다.
///
/// 파일로 출력하는 경우 반환된 guard가 살아 있는 동안만 로그가 기록됩니다.
pub fn init_logging(settings: &LogSettings) -> WorkerGuard {
    let filter = EnvFilter::from_default_env().add_directive(settings.level.into());

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path.file_name().map(|f| f.to_os_string()).unwrap_or_else(|| "parca-operator.log".into());
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let result = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(settings.output == LogOutput::Stdout).try_init(),
    };
    if let Err(e) = result {
        eprintln!("로거 초기화 실패: {}", e);
    }
    guard
}

/// 한 번의 reconcile 패스 기록
#[derive(Debug)]
pub struct PassLog {
    pub pass_id: String,
    pub trigger: String,
    /// 시작 시각 (RFC 3339, UTC)
    pub started_at: String,
    pub duration_ms: u64,
    pub nginx_reloaded: bool,
    pub parca_restarted: bool,
    pub error: Option<String>,
    started: Instant,
}

impl PassLog {
    pub fn new(pass_id: String, trigger: impl Into<String>) -> Self {
        let trigger = trigger.into();
        let started_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        info!(pass_id = %pass_id, trigger = %trigger, started_at = %started_at, "reconcile 패스 시작");
        Self {
            pass_id,
            trigger,
            started_at,
            duration_ms: 0,
            nginx_reloaded: false,
            parca_restarted: false,
            error: None,
            started: Instant::now(),
        }
    }

    pub fn with_outcome(&mut self, parca_restarted: bool, nginx_reloaded: bool) {
        self.parca_restarted = parca_restarted;
        self.nginx_reloaded = nginx_reloaded;
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        let error_msg = error.to_string();
        error!(pass_id = %self.pass_id, error = %error_msg, "reconcile 패스 오류");
        self.error = Some(error_msg);
    }

    pub fn finish(&mut self) {
        self.duration_ms = self.started.elapsed().as_millis() as u64;
    }
}

pub fn log_pass(log: &PassLog) {
    let level = if log.error.is_some() {
        Level::ERROR
    } else if log.nginx_reloaded || log.parca_restarted {
        Level::INFO
    } else {
        Level::DEBUG
    };

    let span = span!(
        Level::INFO,
        "pass",
        pass_id = %log.pass_id,
        trigger = %log.trigger,
        started_at = %log.started_at,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(error = ?log.error, "reconcile 패스 실패"),
        Level::INFO => info!(
            nginx_reloaded = log.nginx_reloaded,
            parca_restarted = log.parca_restarted,
            "reconcile 패스 완료: 워크로드 변경"
        ),
        _ => debug!(
            nginx_reloaded = log.nginx_reloaded,
            parca_restarted = log.parca_restarted,
            "reconcile 패스 완료: 변경 없음"
        ),
    }
}
