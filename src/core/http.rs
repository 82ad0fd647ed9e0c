use crate::core::error::{AppError, AppResult};
use crate::models::config::{OutboundProxyConfig, ProxySettings};
use crate::services::proxy::resolver::is_blocked_host;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

/// 固定的描述性 User-Agent
pub const USER_AGENT: &str = concat!(
    "virtualbrowse/",
    env!("CARGO_PKG_VERSION"),
    " (+same-origin frame proxy)"
);

/// 构建上游请求使用的 HTTP 客户端
///
/// - 自动跟随重定向（上限由 `max_redirects` 决定）
/// - 整体请求超时由 `fetch_timeout_secs` 决定
/// - 可选的出站代理
pub fn build_http_client(
    settings: &ProxySettings,
    outbound: &OutboundProxyConfig,
) -> AppResult<Client> {
    let user_agent = settings.user_agent.as_deref().unwrap_or(USER_AGENT);

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(settings.fetch_timeout_secs))
        .redirect(redirect_policy(settings.max_redirects));

    if outbound.enabled {
        let proxy_url = build_proxy_url(outbound)?;
        let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
            // 为 SOCKS5 提供更友好的错误说明
            if proxy_url.starts_with("socks5") {
                AppError::ProxyConfigError {
                    reason: format!("SOCKS5 代理初始化失败：{e}。若需要远程 DNS 解析，建议使用 socks5h://"),
                }
            } else {
                AppError::ProxyConfigError {
                    reason: format!("代理 URL 无效: {e}"),
                }
            }
        })?;

        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| AppError::Other(e.into()))
}

/// 重定向策略：限制跳数，并且不跟随指向本地或内网地址的跳转
fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= max_redirects {
            return attempt.error(format!("重定向次数超过 {max_redirects}"));
        }
        let blocked = attempt
            .url()
            .host()
            .map(|host| is_blocked_host(&host))
            .unwrap_or(false);
        if blocked {
            tracing::warn!(location = %attempt.url(), "拒绝跟随指向内网地址的重定向");
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

/// 构建出站代理 URL
fn build_proxy_url(config: &OutboundProxyConfig) -> AppResult<String> {
    let proxy_type = config
        .proxy_type
        .as_ref()
        .ok_or_else(|| AppError::ProxyConfigError {
            reason: "代理类型未设置".to_string(),
        })?;

    let host = config
        .host
        .as_ref()
        .ok_or_else(|| AppError::ProxyConfigError {
            reason: "代理主机未设置".to_string(),
        })?;

    let port = config
        .port
        .as_ref()
        .ok_or_else(|| AppError::ProxyConfigError {
            reason: "代理端口未设置".to_string(),
        })?;

    let auth = match (&config.username, &config.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            format!("{username}:{password}@")
        }
        _ => String::new(),
    };

    let scheme = match proxy_type.as_str() {
        "socks5" => "socks5",
        "https" => "https",
        _ => "http",
    };

    Ok(format!("{scheme}://{auth}{host}:{port}"))
}
