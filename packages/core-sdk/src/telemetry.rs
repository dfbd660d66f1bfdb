use std::{fs::OpenOptions, io::Write, path::PathBuf, sync::Mutex};

use anyhow::Result;
use once_cell::sync::Lazy;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::models::Severity;

const LOG_FILE_NAME: &str = "xianyu-smoke.log";

static TELEMETRY_ENABLED: Lazy<std::sync::RwLock<bool>> =
    Lazy::new(|| std::sync::RwLock::new(false));

static LOG_DIR: Lazy<std::sync::RwLock<PathBuf>> =
    Lazy::new(|| std::sync::RwLock::new(PathBuf::from("logs")));

/**
 * \brief 初始化 tracing 输出，默认级别 info，可由 RUST_LOG 覆盖。
 */
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .try_init();
}

/**
 * \brief 更新遥测开关状态。
 */
pub fn set_enabled(enabled: bool) {
    if let Ok(mut guard) = TELEMETRY_ENABLED.write() {
        *guard = enabled;
    }
}

/**
 * \brief 查询当前遥测开关状态。
 */
pub fn is_enabled() -> bool {
    TELEMETRY_ENABLED.read().map(|g| *g).unwrap_or(false)
}

/**
 * \brief 设置日志文件所在目录，默认 logs。
 */
pub fn set_log_dir(dir: impl Into<PathBuf>) {
    if let Ok(mut guard) = LOG_DIR.write() {
        *guard = dir.into();
    }
}

/**
 * \brief 当前日志文件路径。
 */
pub fn log_file_path() -> PathBuf {
    let dir = LOG_DIR
        .read()
        .map(|g| g.clone())
        .unwrap_or_else(|_| PathBuf::from("logs"));
    dir.join(LOG_FILE_NAME)
}

/**
 * \brief 检查过程输出的接收端。
 */
pub trait Reporter: Send + Sync {
    fn report(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.report(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.report(Severity::Info, message);
    }

    fn success(&self, message: &str) {
        self.report(Severity::Success, message);
    }

    fn warning(&self, message: &str) {
        self.report(Severity::Warning, message);
    }

    fn error(&self, message: &str) {
        self.report(Severity::Error, message);
    }
}

/**
 * \brief 转发到 tracing；开启遥测时同时追加到日志文件。
 */
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{}", message),
            Severity::Info => tracing::info!("{}", message),
            Severity::Success => tracing::info!(outcome = "success", "{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
        log_event(severity, "smoke", message);
    }
}

/**
 * \brief 在内存中记录所有报告行。
 */
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, severity: Severity, message: &str) {
        if let Ok(mut guard) = self.lines.lock() {
            guard.push((severity, message.to_string()));
        }
    }
}

/**
 * \brief 记录一条事件到日志文件。
 */
pub fn log_event(severity: Severity, category: &str, message: &str) {
    if !is_enabled() {
        return;
    }
    if let Err(err) = write_line(severity.as_str(), category, message) {
        eprintln!("telemetry write failed: {}", err);
    }
}

fn write_line(level: &str, category: &str, message: &str) -> Result<()> {
    let path = log_file_path();
    if let Some(log_dir) = path.parent() {
        if !log_dir.exists() {
            std::fs::create_dir_all(log_dir)?;
        }
    }
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{} [{}] {} - {}", timestamp, level, category, message)?;
    Ok(())
}
