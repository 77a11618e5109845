//! tracing 初始化
//!
//! 输出目标由 [`AppConfig`] 决定：始终写 stdout，`file_logs` 开启时
//! 再向 `log_dir` 按天滚动写入 `danci-vocab.log`。

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

const LOG_FILE_PREFIX: &str = "danci-vocab.log";

/// 文件日志后台写线程的句柄，丢弃后剩余日志不再落盘
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// 未开启文件日志或目录无法创建时返回 None
fn file_writer(config: &AppConfig) -> Option<(NonBlocking, WorkerGuard)> {
    if !config.file_logs {
        return None;
    }
    if let Err(err) = std::fs::create_dir_all(&config.log_dir) {
        // subscriber 尚未安装
        eprintln!("无法创建日志目录 {}: {}", config.log_dir.display(), err);
        return None;
    }

    let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

pub fn init_tracing(config: &AppConfig) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if guard.is_some() {
        tracing::debug!(log_dir = %config.log_dir.display(), "文件日志已开启");
    }
    guard.map(|guard| FileLogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_writer_follows_config() {
        let tmp = tempfile::tempdir().unwrap();
        let log_dir = tmp.path().join("nested").join("logs");

        let disabled = AppConfig {
            file_logs: false,
            log_dir: log_dir.clone(),
            ..AppConfig::default()
        };
        assert!(file_writer(&disabled).is_none());
        assert!(!log_dir.exists());

        let enabled = AppConfig {
            file_logs: true,
            ..disabled
        };
        assert!(file_writer(&enabled).is_some());
        assert!(log_dir.is_dir());
    }
}
