//! 观测性初始化。

pub mod events;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::env_string;

const LOG_FILE_PREFIX: &str = "callcoach.log";

/// 安装全局订阅者；若启用了文件日志，返回的 guard 需存活至进程退出。
pub fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env_string("CALLCOACH_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let plain_layer = (!json).then(|| fmt::layer().with_target(false));
    let json_layer = json.then(|| fmt::layer().json().with_target(true));

    let (file_layer, guard) = match env_string("CALLCOACH_LOG_DIR").map(PathBuf::from) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| anyhow!("failed to set global subscriber: {err}"))?;

    Ok(guard)
}
