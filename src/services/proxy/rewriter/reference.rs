// 单个资源引用的分类与改写

use std::borrow::Cow;

use url::Url;

use super::RewriteContext;
use crate::core::error::{ProxyError, ProxyResult};

/// 不经过代理的 scheme
const EXCLUDED_SCHEMES: [&str; 8] = [
    "http:",
    "https:",
    "data:",
    "blob:",
    "mailto:",
    "tel:",
    "javascript:",
    "about:",
];

/// 本身允许被嵌入的播放器域名：直接加载，不经过代理
const EMBEDDABLE_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
    "player.vimeo.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ReferenceKind {
    /// 空值、绝对 URL、`data:` 等以及已代理的引用
    Untouched,
    /// `//host/path`
    ProtocolRelative,
    /// 相对于页面的引用
    Relative,
}

pub(super) fn classify(value: &str, ctx: &RewriteContext) -> ReferenceKind {
    let value = value.trim();
    // 文档内锚点不受 <base> 影响，也不需要再请求一次
    if value.is_empty() || value.starts_with('#') || ctx.is_proxied(value) {
        return ReferenceKind::Untouched;
    }
    if value.starts_with("//") {
        return ReferenceKind::ProtocolRelative;
    }
    if has_excluded_scheme(value) || has_scheme(value) {
        return ReferenceKind::Untouched;
    }
    ReferenceKind::Relative
}

fn has_excluded_scheme(value: &str) -> bool {
    EXCLUDED_SCHEMES.iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

/// 是否以任意 `scheme:` 开头（RFC 3986：字母开头，后接字母、数字、`+`、`-`、`.`）
fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// 解码属性值中的字符引用（具名与数字形式）
///
/// 只用于属性值；`<style>` 块是原始文本，不做解码。
pub(super) fn decode_entities(value: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(value)
}

/// 重新写回带引号的属性值：转义 `&` 与包裹用的引号
pub(super) fn escape_attr_value(value: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' if quote == '"' => escaped.push_str("&quot;"),
            '\'' if quote == '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn resolve(value: &str, ctx: &RewriteContext) -> ProxyResult<Url> {
    ctx.base
        .url()
        .join(value.trim())
        .map_err(|_| ProxyError::Rewrite {
            reference: value.to_string(),
        })
}

/// 相对引用 → 代理引用
pub(super) fn rewrite_relative(value: &str, ctx: &RewriteContext) -> ProxyResult<String> {
    let absolute = resolve(value, ctx)?;
    Ok(ctx.proxy_url(absolute.as_str()))
}

/// 协议相对引用补全 scheme；可嵌入的播放器直接返回绝对 URL，其余走代理
pub(super) fn rewrite_protocol_relative(value: &str, ctx: &RewriteContext) -> ProxyResult<String> {
    let absolute = resolve(value, ctx)?;
    let embeddable = absolute
        .host_str()
        .is_some_and(|host| EMBEDDABLE_HOSTS.contains(&host));
    if embeddable {
        Ok(absolute.to_string())
    } else {
        Ok(ctx.proxy_url(absolute.as_str()))
    }
}

/// 按类型改写任意引用；返回 `None` 表示保持原样
///
/// 单个引用的改写失败只记录 trace 日志。
pub(super) fn rewrite_any(value: &str, ctx: &RewriteContext) -> Option<String> {
    let result = match classify(value, ctx) {
        ReferenceKind::Untouched => return None,
        ReferenceKind::Relative => rewrite_relative(value, ctx),
        ReferenceKind::ProtocolRelative => rewrite_protocol_relative(value, ctx),
    };
    swallow(result)
}

/// 吞掉单个引用的改写错误
pub(super) fn swallow(result: ProxyResult<String>) -> Option<String> {
    match result {
        Ok(rewritten) => Some(rewritten),
        Err(err) => {
            tracing::trace!(error = %err, "保留无法改写的引用");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::proxy::rewriter::tests::ctx;

    #[test]
    fn test_classify() {
        let c = ctx("https://example.com/a/b.html");
        for value in [
            "",
            "   ",
            "http://x.com/",
            "HTTPS://x.com/",
            "data:image/png;base64,AAAA",
            "blob:https://example.com/uuid",
            "mailto:a@b.c",
            "tel:+123",
            "JavaScript:alert(1)",
            "about:blank",
            "ftp://files.example.com/",
            "/api/fetch?u=https%3A%2F%2Fexample.com%2F",
            "#top",
            "#icon-search",
        ] {
            assert_eq!(classify(value, &c), ReferenceKind::Untouched, "{value}");
        }
        assert_eq!(classify("//cdn.x/y.js", &c), ReferenceKind::ProtocolRelative);
        for value in ["x.png", "/x.png", "../x.png", "?q=1", "./a:b"] {
            assert_eq!(classify(value, &c), ReferenceKind::Relative, "{value}");
        }
    }

    #[test]
    fn test_relative_resolution_roundtrip() {
        let c = ctx("https://example.com/docs/guide/intro.html?x=1");
        for (relative, expected) in [
            ("/x", "https://example.com/x"),
            ("img/a.png", "https://example.com/docs/guide/img/a.png"),
            ("../up.css", "https://example.com/docs/up.css"),
            ("?page=2", "https://example.com/docs/guide/intro.html?page=2"),
            ("#top", "https://example.com/docs/guide/intro.html?x=1#top"),
            ("a b.html", "https://example.com/docs/guide/a%20b.html"),
        ] {
            let rewritten = rewrite_relative(relative, &c).unwrap();
            let encoded = rewritten.strip_prefix("/api/fetch?u=").unwrap();
            assert_eq!(urlencoding::decode(encoded).unwrap(), expected);
        }
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("/s?a=1&amp;b=2"), "/s?a=1&b=2");
        assert_eq!(decode_entities("/s?a=1&#38;b=2"), "/s?a=1&b=2");
        assert_eq!(decode_entities("url(&quot;/a.png&quot;)"), r#"url("/a.png")"#);
        assert_eq!(decode_entities("url(&#39;/a.png&#39;)"), "url('/a.png')");
        assert_eq!(decode_entities("/plain.png"), "/plain.png");
    }

    #[test]
    fn test_escape_attr_value() {
        assert_eq!(
            escape_attr_value(r#"font-family:"A&B" 'x'"#, '"'),
            "font-family:&quot;A&amp;B&quot; 'x'"
        );
        assert_eq!(escape_attr_value(r#"a "b" 'c'"#, '\''), r#"a "b" &#39;c&#39;"#);
    }

    #[test]
    fn test_protocol_relative() {
        let c = ctx("http://example.com/");
        assert_eq!(
            rewrite_protocol_relative("//cdn.example.net/app.js", &c).unwrap(),
            "/api/fetch?u=http%3A%2F%2Fcdn.example.net%2Fapp.js"
        );
        assert_eq!(
            rewrite_protocol_relative("//www.youtube.com/embed/abc", &c).unwrap(),
            "http://www.youtube.com/embed/abc"
        );
    }

    #[test]
    fn test_unparsable_reference_is_swallowed() {
        let c = ctx("https://example.com/");
        assert!(rewrite_protocol_relative("//exa mple.com/", &c).is_err());
        assert_eq!(rewrite_any("//exa mple.com/", &c), None);
        assert_eq!(rewrite_any("//[::1/", &c), None);
    }
}
