// 上游请求
//
// UpstreamFetcher 是代理与网络之间的唯一接缝：
// - HttpFetcher 使用 reqwest 真实发出 GET 请求
// - 测试中可替换为内存实现

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;

use super::resolver::ResolvedTarget;
use super::utils::body::{stream_body, BoxBody};
use crate::core::error::{ProxyError, ProxyResult};

/// 上游响应头（名称小写，重复时取第一个）
#[derive(Debug, Clone, Default)]
pub struct UpstreamHeaders {
    entries: Vec<(String, String)>,
}

impl UpstreamHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((name.to_ascii_lowercase(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for UpstreamHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.push(name.as_ref(), value);
        }
        headers
    }
}

/// 响应体：HTML 解码为文本以便改写，其余原样透传
pub enum UpstreamBody {
    Text(String),
    Binary(BoxBody),
}

impl std::fmt::Debug for UpstreamBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamBody::Text(text) => write!(f, "Text({} bytes)", text.len()),
            UpstreamBody::Binary(_) => write!(f, "Binary(..)"),
        }
    }
}

/// 上游响应
///
/// `status` 只用于日志，不影响代理返回的状态码。
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub final_url: String,
    pub headers: UpstreamHeaders,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    pub fn is_html(&self) -> bool {
        is_html_content_type(self.content_type())
    }
}

/// 仅依据 content-type 的主类型判断是否为 HTML，忽略 charset 等参数
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|primary| primary.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}

/// 上游请求 trait
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// 对目标发出一次 GET 请求，重定向对调用方透明
    ///
    /// # 错误
    /// 任何网络层失败返回 `ProxyError::UpstreamFetch`，不做自动重试
    async fn fetch(&self, target: &ResolvedTarget) -> ProxyResult<UpstreamResponse>;
}

/// 基于 reqwest 的上游请求实现
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UpstreamFetcher for HttpFetcher {
    async fn fetch(&self, target: &ResolvedTarget) -> ProxyResult<UpstreamResponse> {
        let response = self
            .client
            .get(target.normalized_url())
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| fetch_error(target, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: UpstreamHeaders = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        tracing::debug!(
            target_url = %target.normalized_url(),
            final_url = %final_url,
            status,
            content_type = ?headers.get("content-type"),
            "上游响应"
        );

        let body = if is_html_content_type(headers.get("content-type")) {
            // reqwest 按 content-type 中的 charset 解码
            let text = response.text().await.map_err(|e| fetch_error(target, e))?;
            UpstreamBody::Text(text)
        } else {
            UpstreamBody::Binary(stream_body(response.bytes_stream()))
        };

        Ok(UpstreamResponse {
            status,
            final_url,
            headers,
            body,
        })
    }
}

fn fetch_error(target: &ResolvedTarget, err: reqwest::Error) -> ProxyError {
    tracing::warn!(target_url = %target.normalized_url(), error = %err, "上游请求失败");
    ProxyError::from(err)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html_content_type() {
        assert!(is_html_content_type(Some("text/html")));
        assert!(is_html_content_type(Some("TEXT/HTML; charset=ISO-8859-1")));
        assert!(is_html_content_type(Some(" text/html ;charset=utf-8")));
        assert!(!is_html_content_type(Some("text/css")));
        assert!(!is_html_content_type(Some("application/xhtml+xml")));
        assert!(!is_html_content_type(Some("image/png")));
        assert!(!is_html_content_type(None));
    }

    #[test]
    fn test_headers_first_match_wins() {
        let headers: UpstreamHeaders = vec![
            ("Cache-Control", "no-cache"),
            ("cache-control", "max-age=60"),
        ]
        .into_iter()
        .collect();
        assert_eq!(headers.get("cache-control"), Some("no-cache"));
        assert_eq!(headers.get("CACHE-CONTROL"), Some("no-cache"));
        assert_eq!(headers.get("expires"), None);
        assert_eq!(headers.iter().count(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_fetch_error() {
        // 端口 1 上通常没有服务，连接会被拒绝
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let fetcher = HttpFetcher::new(client);
        let target = crate::services::proxy::resolver::TargetResolver::new()
            .resolve("http://203.0.113.1:1/")
            .unwrap();
        let err = fetcher.fetch(&target).await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamFetch { .. }));
    }
}
