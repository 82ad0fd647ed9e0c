// 核心基础设施层：错误类型、日志、HTTP 客户端

pub mod error;
pub mod http;
pub mod logger;

pub use error::{AppError, AppResult, ProxyError, ProxyResult};
pub use http::{build_http_client, USER_AGENT};
pub use logger::{init_logger, update_log_level};
