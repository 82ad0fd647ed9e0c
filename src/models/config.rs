// 全局配置结构，放在 models 以便在库和二进制之间共享
use serde::{Deserialize, Serialize};

/// 应用配置（~/.virtualbrowse/config.json）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub proxy: ProxySettings,
    #[serde(default)]
    pub outbound_proxy: OutboundProxyConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// 入站监听配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    // 允许局域网访问（默认仅本地访问）
    #[serde(default)]
    pub allow_public: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allow_public: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8788
}

/// 代理行为配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxySettings {
    /// 代理入口路径，改写后的资源引用都指回这里
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    /// 代理自身的对外 origin（如 `https://vb.example.com`）
    #[serde(default)]
    pub self_origin: Option<String>,
    /// 是否拦截指向自身的请求
    #[serde(default)]
    pub block_self_reference: bool,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            endpoint_path: default_endpoint_path(),
            self_origin: None,
            block_self_reference: false,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: None,
        }
    }
}

fn default_endpoint_path() -> String {
    "/api/fetch".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

/// 出站代理配置（上游请求经由 HTTP/HTTPS/SOCKS5 代理发出）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutboundProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub proxy_type: Option<String>, // "http", "https", "socks5"
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("无效的日志级别: {s}")),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub output: LogOutput,
    /// 日志目录（为空时使用 ~/.virtualbrowse/logs）
    #[serde(default)]
    pub file_path: Option<String>,
}
