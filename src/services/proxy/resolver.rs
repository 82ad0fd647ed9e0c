//! 目标解析：规范化调用方给出的 URL，并在任何网络请求之前执行安全策略
//!
//! - 缺少 scheme 时补全为 `https://`
//! - YouTube 观看页改写为 embed 地址
//! - 拒绝本地回环与内网地址
//! - 可选：拒绝指向代理自身的请求

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use super::utils::loop_detector::is_self_referential;
use crate::core::error::{ProxyError, ProxyResult};

/// 解析后的目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub scheme: String,
    pub host: String,
    pub path: String,
    url: Url,
}

impl ResolvedTarget {
    fn from_url(url: Url) -> ProxyResult<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::invalid_url("缺少主机名"))?
            .to_string();
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            path: url.path().to_string(),
            url,
        })
    }

    /// 规范化后的完整 URL
    pub fn normalized_url(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// 形如 `https://example.com:8443` 的 origin
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// 上游重定向后的最终地址，作为改写基准；无法解析时保持原目标
    pub fn redirected_to(&self, final_url: &str) -> ResolvedTarget {
        if final_url == self.url.as_str() {
            return self.clone();
        }
        Url::parse(final_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .and_then(|url| Self::from_url(url).ok())
            .unwrap_or_else(|| self.clone())
    }

    /// origin + 目录路径（去掉末尾的文件名），用于 `<base href>`
    pub fn base_href(&self) -> String {
        let dir = match self.path.rfind('/') {
            Some(idx) => &self.path[..=idx],
            None => "/",
        };
        format!("{}{}", self.origin(), dir)
    }
}

/// 目标解析器
///
/// `self_origins` 为空时不做自引用检查。
#[derive(Debug, Clone, Default)]
pub struct TargetResolver {
    self_origins: Vec<String>,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启用自引用检查
    pub fn with_self_origins(origins: Vec<String>) -> Self {
        let self_origins = origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_lowercase())
            .filter(|o| !o.is_empty())
            .collect();
        Self { self_origins }
    }

    pub fn resolve(&self, raw_target: &str) -> ProxyResult<ResolvedTarget> {
        let trimmed = raw_target.trim();
        if trimmed.is_empty() {
            return Err(ProxyError::invalid_url("目标 URL 为空"));
        }

        let candidate = if has_http_scheme(trimmed) {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let parsed =
            Url::parse(&candidate).map_err(|e| ProxyError::invalid_url(format!("{candidate}: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProxyError::invalid_url(format!(
                "不支持的协议: {}",
                parsed.scheme()
            )));
        }

        let url = canonicalize_youtube(parsed);

        // 自身 origin 可能就是本地地址，先于主机黑名单检查以给出更准确的错误
        if let Some(origin) = is_self_referential(url.as_str(), &self.self_origins) {
            return Err(ProxyError::SelfReferential {
                origin: origin.to_string(),
            });
        }

        let host = url
            .host()
            .ok_or_else(|| ProxyError::invalid_url("缺少主机名"))?;
        if is_blocked_host(&host) {
            return Err(ProxyError::BlockedHost {
                host: host.to_string(),
            });
        }

        ResolvedTarget::from_url(url)
    }
}

fn has_http_scheme(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// YouTube 观看页（`/watch?v=ID`、`youtu.be/ID`）改写为 `/embed/ID`，以便在 iframe 内播放
fn canonicalize_youtube(url: Url) -> Url {
    let host = url.host_str().unwrap_or_default();

    let video_id = match host {
        "youtube.com" | "www.youtube.com" | "m.youtube.com" if url.path() == "/watch" => url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned()),
        "youtu.be" => url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(str::to_string),
        _ => None,
    };

    match video_id.filter(|id| is_video_id(id)) {
        Some(id) => {
            Url::parse(&format!("https://www.youtube.com/embed/{id}")).unwrap_or(url)
        }
        None => url,
    }
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// 本地回环、内网与链路本地地址一律拒绝
pub fn is_blocked_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(ip) => is_blocked_ipv4(ip),
        Host::Ipv6(ip) => is_blocked_ipv6(ip),
    }
}

fn is_blocked_ipv4(ip: &Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    match a {
        0 | 10 | 127 => true,
        172 => (16..=31).contains(&b),
        192 => b == 168,
        169 => b == 254,
        _ => false,
    }
}

fn is_blocked_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_ipv4(&v4);
    }
    let first = ip.segments()[0];
    (first & 0xfe00) == 0xfc00 // fc00::/7
        || (first & 0xffc0) == 0xfe80 // fe80::/10
}
