// 响应头净化
//
// 只转发白名单中的上游响应头，CSP、X-Frame-Options 等一律丢弃，
// 避免上游重新施加 iframe 嵌入限制。非 HTML 响应只保留 content-type。

use hyper::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL, CONTENT_TYPE, EXPIRES};

use super::fetcher::UpstreamResponse;

/// 标记响应由代理生成（便于前端调试）
pub const PROXY_MARKER_HEADER: &str = "x-virtualbrowse-proxy";
pub const PROXY_MARKER_VALUE: &str = "1";

/// HTML 响应统一使用 UTF-8（改写后的文本已是 UTF-8）
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const DEFAULT_BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// HTML 响应除 content-type 外允许透传的上游响应头
static PASSTHROUGH_HEADERS: [HeaderName; 2] = [CACHE_CONTROL, EXPIRES];

/// 计算返回给调用方的响应头
pub fn sanitize(upstream: &UpstreamResponse) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let content_type = if upstream.is_html() {
        HeaderValue::from_static(HTML_CONTENT_TYPE)
    } else {
        upstream
            .content_type()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_BINARY_CONTENT_TYPE))
    };
    headers.insert(CONTENT_TYPE, content_type);

    let passthrough: &[HeaderName] = if upstream.is_html() {
        &PASSTHROUGH_HEADERS
    } else {
        &[]
    };
    for name in passthrough {
        if let Some(value) = upstream
            .headers
            .get(name.as_str())
            .and_then(|v| HeaderValue::from_str(v).ok())
        {
            headers.insert(name.clone(), value);
        }
    }

    headers.insert(
        HeaderName::from_static(PROXY_MARKER_HEADER),
        HeaderValue::from_static(PROXY_MARKER_VALUE),
    );

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::proxy::fetcher::{UpstreamBody, UpstreamHeaders};
    use crate::services::proxy::utils::body::full;

    fn upstream(headers: &[(&str, &str)], html: bool) -> UpstreamResponse {
        UpstreamResponse {
            status: 200,
            final_url: "https://example.com/".to_string(),
            headers: headers.iter().copied().collect::<UpstreamHeaders>(),
            body: if html {
                UpstreamBody::Text(String::new())
            } else {
                UpstreamBody::Binary(full(""))
            },
        }
    }

    #[test]
    fn test_html_headers() {
        let response = upstream(
            &[
                ("content-type", "text/html; charset=ISO-8859-1"),
                ("content-security-policy", "default-src 'self'"),
                ("x-frame-options", "DENY"),
                ("set-cookie", "a=b"),
                ("cache-control", "max-age=60"),
                ("expires", "Thu, 01 Dec 2044 16:00:00 GMT"),
            ],
            true,
        );
        let headers = sanitize(&response);

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), HTML_CONTENT_TYPE);
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "max-age=60");
        assert_eq!(
            headers.get(EXPIRES).unwrap(),
            "Thu, 01 Dec 2044 16:00:00 GMT"
        );
        assert!(headers.get("content-security-policy").is_none());
        assert!(headers.get("x-frame-options").is_none());
        assert!(headers.get("set-cookie").is_none());
        assert_eq!(headers.get(PROXY_MARKER_HEADER).unwrap(), PROXY_MARKER_VALUE);
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn test_binary_keeps_content_type() {
        let response = upstream(
            &[
                ("content-type", "image/png"),
                ("content-security-policy", "default-src 'self'"),
            ],
            false,
        );
        let headers = sanitize(&response);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "image/png");
        assert!(headers.get("content-security-policy").is_none());
        assert!(headers.get(CACHE_CONTROL).is_none());
    }

    #[test]
    fn test_non_html_only_content_type() {
        let response = upstream(
            &[
                ("content-type", "text/css"),
                ("cache-control", "max-age=3600"),
                ("expires", "Thu, 01 Dec 2044 16:00:00 GMT"),
                ("etag", "\"abc\""),
            ],
            false,
        );
        let headers = sanitize(&response);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/css");
        assert!(headers.get(CACHE_CONTROL).is_none());
        assert!(headers.get(EXPIRES).is_none());
        assert!(headers.get("etag").is_none());
        // 只剩 content-type 与代理标记
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_missing_content_type_defaults_to_octet_stream() {
        let headers = sanitize(&upstream(&[], false));
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            DEFAULT_BINARY_CONTENT_TYPE
        );
    }

    #[test]
    fn test_duplicate_headers_first_wins() {
        let response = upstream(
            &[
                ("content-type", "text/html"),
                ("cache-control", "no-store"),
                ("cache-control", "max-age=3600"),
            ],
            true,
        );
        let headers = sanitize(&response);
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-store");
    }
}
