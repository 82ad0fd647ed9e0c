//! 统一错误类型定义
//!
//! `ProxyError` 覆盖单次代理请求的全部失败类别，`AppError` 用于启动与配置阶段。

use hyper::StatusCode;
use thiserror::Error;

/// 单次代理请求的错误类型
#[derive(Error, Debug)]
pub enum ProxyError {
    /// 目标 URL 缺失或无法解析
    #[error("无效的目标 URL: {reason}")]
    InvalidUrl { reason: String },

    /// 目标主机为本地回环或内网地址
    #[error("禁止访问的主机: {host}")]
    BlockedHost { host: String },

    /// 目标指向代理自身
    #[error("目标指向代理自身: {origin}")]
    SelfReferential { origin: String },

    /// 上游请求失败（DNS、TLS、超时、连接重置等）
    #[error("上游请求失败: {message}")]
    UpstreamFetch { message: String },

    /// 单个资源引用改写失败（仅在改写器内部使用，不会返回给调用方）
    #[error("资源引用改写失败: {reference}")]
    Rewrite { reference: String },
}

impl ProxyError {
    pub fn invalid_url(reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            reason: reason.into(),
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            ProxyError::BlockedHost { .. } | ProxyError::SelfReferential { .. } => {
                StatusCode::FORBIDDEN
            }
            ProxyError::UpstreamFetch { .. } | ProxyError::Rewrite { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON 错误响应中的错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            ProxyError::InvalidUrl { .. } => "INVALID_URL",
            ProxyError::BlockedHost { .. } => "BLOCKED_HOST",
            ProxyError::SelfReferential { .. } => "SELF_REFERENTIAL",
            ProxyError::UpstreamFetch { .. } => "UPSTREAM_FETCH_ERROR",
            ProxyError::Rewrite { .. } => "REWRITE_FAILURE",
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::UpstreamFetch {
            message: err.to_string(),
        }
    }
}

pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

/// 启动与配置阶段的错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("配置错误: {reason}")]
    Config { reason: String },

    #[error("出站代理配置错误: {reason}")]
    ProxyConfigError { reason: String },

    #[error("文件 I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
