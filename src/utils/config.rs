use crate::core::error::{AppError, AppResult};
use crate::models::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件路径覆盖
pub const ENV_CONFIG_PATH: &str = "VIRTUALBROWSE_CONFIG";
pub const ENV_HOST: &str = "VIRTUALBROWSE_HOST";
pub const ENV_PORT: &str = "VIRTUALBROWSE_PORT";
pub const ENV_SELF_ORIGIN: &str = "VIRTUALBROWSE_SELF_ORIGIN";

/// VirtualBrowse 配置目录 (~/.virtualbrowse)，若不存在则创建
pub fn config_dir() -> AppResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| AppError::Config {
        reason: "无法获取用户主目录".to_string(),
    })?;
    let config_dir = home_dir.join(".virtualbrowse");
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

/// 配置文件路径（可由 VIRTUALBROWSE_CONFIG 覆盖）
pub fn config_path() -> AppResult<PathBuf> {
    match std::env::var(ENV_CONFIG_PATH) {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(config_dir()?.join("config.json")),
    }
}

/// 读取配置文件（若文件不存在返回 Ok(None)）
pub fn read_app_config(path: &Path) -> AppResult<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content).map_err(|e| AppError::Config {
        reason: format!("解析配置文件 {} 失败: {e}", path.display()),
    })?;
    Ok(Some(config))
}

/// 加载最终生效的配置：配置文件（或默认值）+ 环境变量覆盖
pub fn load_app_config() -> AppResult<AppConfig> {
    let path = config_path()?;
    let mut config = match read_app_config(&path)? {
        Some(config) => {
            tracing::debug!(path = %path.display(), "已读取配置文件");
            config
        }
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// 应用环境变量覆盖
fn apply_env_overrides(config: &mut AppConfig) -> AppResult<()> {
    if let Ok(host) = std::env::var(ENV_HOST) {
        config.server.host = host;
    }

    if let Ok(port) = std::env::var(ENV_PORT) {
        config.server.port = port.trim().parse().map_err(|e| AppError::Config {
            reason: format!("{ENV_PORT} 无效: {e}"),
        })?;
    }

    if let Ok(origin) = std::env::var(ENV_SELF_ORIGIN) {
        if !origin.trim().is_empty() {
            config.proxy.self_origin = Some(origin.trim().to_string());
            config.proxy.block_self_reference = true;
        }
    }

    Ok(())
}
