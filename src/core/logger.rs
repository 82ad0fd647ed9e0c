use crate::models::config::{LogConfig, LogFormat, LogLevel, LogOutput};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 全局日志级别 reload handle
static LOG_LEVEL_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// 文件输出的后台写线程 guard，进程存活期间不能 drop
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 初始化日志系统
///
/// 支持基于配置的日志输出，包括：
/// - 日志级别（trace/debug/info/warn/error）
/// - 输出格式（JSON/纯文本）
/// - 输出目标（控制台/文件/both）
///
/// 日志级别可以通过 `update_log_level` 动态调整，其余配置需要重启生效。
pub fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    let filter = create_env_filter(&config.level);
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    let mut layers = Vec::new();

    if matches!(config.output, LogOutput::Console | LogOutput::Both) {
        layers.push(create_console_layer(config.format));
    }

    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        layers.push(create_file_layer(
            config.format,
            config.file_path.as_deref(),
        )?);
    }

    Registry::default()
        .with(filter_layer)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("注册日志订阅器失败: {e}"))?;

    tracing::info!(
        level = config.level.as_str(),
        format = ?config.format,
        output = ?config.output,
        file_path = ?config.file_path,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 创建环境过滤器
fn create_env_filter(level: &LogLevel) -> EnvFilter {
    // 优先从环境变量读取
    // 格式：RUST_LOG=debug 或 RUST_LOG=virtualbrowse=trace,reqwest=warn
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter(level))
}

fn default_env_filter(level: &LogLevel) -> EnvFilter {
    // 应用代码使用指定级别，第三方库使用 WARN
    EnvFilter::new(filter_directives(level))
}

fn filter_directives(level: &LogLevel) -> String {
    format!(
        "virtualbrowse={},hyper=warn,reqwest=warn,h2=warn,tokio=warn",
        level.as_str()
    )
}

/// 创建控制台输出层
fn create_console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(cfg!(debug_assertions))
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .with_target(true)
            .with_thread_ids(false)
            .boxed(),
    }
}

/// 创建按天滚动的文件输出层
fn create_file_layer<S>(
    format: LogFormat,
    file_path: Option<&str>,
) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let log_dir = get_log_dir(file_path)?;
    let file_appender = rolling::daily(log_dir, "virtualbrowse");
    let (writer, guard) = non_blocking(file_appender);
    let _ = FILE_GUARD.set(guard);

    let layer = match format {
        LogFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .boxed(),
    };
    Ok(layer)
}

/// 获取日志目录
fn get_log_dir(file_path: Option<&str>) -> anyhow::Result<PathBuf> {
    let dir = match file_path {
        Some(path) => PathBuf::from(path),
        None => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("无法获取用户主目录"))?
            .join(".virtualbrowse")
            .join("logs"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// 动态更新日志级别（热重载）
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    handle
        .reload(default_env_filter(&new_level))
        .map_err(|e| anyhow::anyhow!("重载日志级别失败: {}", e))?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        let directives = filter_directives(&LogLevel::Debug);
        assert!(directives.starts_with("virtualbrowse=debug"));
        assert!(directives.contains("reqwest=warn"));
    }

    #[test]
    fn test_get_log_dir_creates_custom_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("logs");
        let dir = get_log_dir(target.to_str()).unwrap();
        assert_eq!(dir, target);
        assert!(target.is_dir());
    }
}
