// lib.rs - 暴露服务层给二进制入口和集成方使用

pub mod core; // 核心基础设施层
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;
pub use services::proxy::{HttpFetcher, ProxyInstance, TargetResolver, UpstreamFetcher};

// 重新导出常用类型
pub use anyhow::{Context, Result};

pub use crate::core::{
    build_http_client, init_logger, update_log_level, AppError, AppResult, ProxyError,
    ProxyResult,
};
pub use utils::config::load_app_config;
