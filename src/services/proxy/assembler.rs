// 响应组装
//
// HTML：净化后的响应头 + 改写并注入脚本后的文档
// 其他：净化后的响应头 + 原样透传的上游字节流
// 两种情况下状态码都固定为 200，上游的非 2xx 状态只作为内容透传。

use hyper::{Response, StatusCode};

use super::fetcher::{UpstreamBody, UpstreamResponse};
use super::headers::sanitize;
use super::injector::inject;
use super::rewriter::{rewrite, RewriteContext};
use super::utils::body::{full, BoxBody};

/// 单次请求的选项
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    pub cookie_removal: bool,
}

/// HTML 处理流水线：meta 删除 → base 插入 → 引用改写 → 脚本注入
pub fn transform_html(html: &str, ctx: &RewriteContext, options: AssembleOptions) -> String {
    let rewritten = rewrite(html, ctx);
    inject(&rewritten, ctx, options.cookie_removal)
}

/// 组装最终响应
pub fn assemble(
    upstream: UpstreamResponse,
    ctx: &RewriteContext,
    options: AssembleOptions,
) -> Response<BoxBody> {
    let headers = sanitize(&upstream);

    let body = match upstream.body {
        UpstreamBody::Text(html) if upstream.is_html() => {
            full(transform_html(&html, ctx, options))
        }
        // 非 HTML 文本不做任何处理
        UpstreamBody::Text(text) => full(text),
        UpstreamBody::Binary(body) => body,
    };

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::proxy::fetcher::UpstreamHeaders;
    use crate::services::proxy::headers::{HTML_CONTENT_TYPE, PROXY_MARKER_HEADER};
    use crate::services::proxy::resolver::TargetResolver;
    use http_body_util::BodyExt;
    use hyper::header::CONTENT_TYPE;

    fn ctx(url: &str) -> RewriteContext {
        RewriteContext::new(TargetResolver::new().resolve(url).unwrap(), "/api/fetch")
    }

    fn upstream(status: u16, headers: &[(&str, &str)], body: UpstreamBody) -> UpstreamResponse {
        UpstreamResponse {
            status,
            final_url: "https://example.com/".to_string(),
            headers: headers.iter().copied().collect::<UpstreamHeaders>(),
            body,
        }
    }

    async fn body_string(response: Response<BoxBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_html_pipeline() {
        let html = r#"<html><head></head><body><a href="/x">go</a></body></html>"#;
        let response = assemble(
            upstream(
                200,
                &[
                    ("content-type", "text/html; charset=iso-8859-1"),
                    ("x-frame-options", "SAMEORIGIN"),
                ],
                UpstreamBody::Text(html.to_string()),
            ),
            &ctx("example.com"),
            AssembleOptions::default(),
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), HTML_CONTENT_TYPE);
        assert!(response.headers().get("x-frame-options").is_none());
        assert!(response.headers().get(PROXY_MARKER_HEADER).is_some());

        let body = body_string(response).await;
        assert!(body.contains(r#"<base href="https://example.com/">"#));
        assert!(body.contains(r#"href="/api/fetch?u=https%3A%2F%2Fexample.com%2Fx""#));
        assert!(body.contains("</script>\n</body>"));
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_content() {
        let response = assemble(
            upstream(
                404,
                &[("content-type", "text/html")],
                UpstreamBody::Text("<body>not found</body>".to_string()),
            ),
            &ctx("example.com/missing"),
            AssembleOptions::default(),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("not found"));
    }

    #[tokio::test]
    async fn test_binary_passthrough() {
        let png: &[u8] = b"\x89PNG\r\n\x1a\nsrc=\"a.png\"";
        let response = assemble(
            upstream(
                200,
                &[
                    ("content-type", "image/png"),
                    ("content-security-policy", "default-src 'none'"),
                ],
                UpstreamBody::Binary(full(png.to_vec())),
            ),
            &ctx("example.com/logo.png"),
            AssembleOptions {
                cookie_removal: true,
            },
        );
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "image/png");
        assert!(response.headers().get("content-security-policy").is_none());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], png);
    }

    #[tokio::test]
    async fn test_non_html_text_untouched() {
        let css = "body { background: url(bg.png) }";
        let response = assemble(
            upstream(
                200,
                &[("content-type", "text/css")],
                UpstreamBody::Text(css.to_string()),
            ),
            &ctx("example.com/site.css"),
            AssembleOptions::default(),
        );
        assert_eq!(body_string(response).await, css);
    }

    #[test]
    fn test_cookie_banner_sweep_included_when_enabled() {
        let html = r#"<html><head></head><body><div class="cookie-banner"><button>Accept</button></div></body></html>"#;
        let c = ctx("example.com");

        let with = transform_html(html, &c, AssembleOptions { cookie_removal: true });
        assert!(with.contains(r#"<div class="cookie-banner">"#));
        assert!(with.contains(r#"[class*="cookie" i]"#));

        let without = transform_html(html, &c, AssembleOptions::default());
        assert!(!without.contains("MutationObserver"));
    }
}
