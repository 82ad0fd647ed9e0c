// CSS url(...) 改写：`<style>` 块与 `style` 属性

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::reference::{decode_entities, escape_attr_value, rewrite_any};
use super::RewriteContext;

static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(<style\b[^>]*>)(.*?)(</style\s*>)").expect("invalid style block regex")
});

static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(\s)(style)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .expect("invalid style attribute regex")
});

static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#)
        .expect("invalid css url regex")
});

pub(super) fn rewrite_css_urls(html: &str, ctx: &RewriteContext) -> String {
    let html = STYLE_BLOCK.replace_all(html, |caps: &Captures| {
        format!(
            "{}{}{}",
            &caps[1],
            rewrite_css_text(&caps[2], '"', ctx),
            &caps[3]
        )
    });

    STYLE_ATTR
        .replace_all(&html, |caps: &Captures| {
            // 重新加引号时避开属性本身使用的引号
            let (value, attr_quote, url_quote) = match (caps.get(4), caps.get(5)) {
                (Some(v), _) => (v.as_str(), '"', '\''),
                (_, Some(v)) => (v.as_str(), '\'', '"'),
                _ => return caps[0].to_string(),
            };
            // 属性值里的 `&quot;` 等字符引用先解码，CSS 才能看到真实的引号
            let css = decode_entities(value);
            let rewritten = rewrite_css_text(&css, url_quote, ctx);
            if rewritten == css {
                return caps[0].to_string();
            }
            format!(
                "{}{}{}{attr_quote}{}{attr_quote}",
                &caps[1],
                &caps[2],
                &caps[3],
                escape_attr_value(&rewritten, attr_quote)
            )
        })
        .into_owned()
}

/// 改写一段 CSS 文本中的全部 `url(...)`
pub(super) fn rewrite_css_text(css: &str, quote: char, ctx: &RewriteContext) -> String {
    CSS_URL
        .replace_all(css, |caps: &Captures| {
            let value = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match rewrite_any(value, ctx) {
                Some(rewritten) => format!("url({quote}{rewritten}{quote})"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::proxy::rewriter::tests::ctx;

    #[test]
    fn test_style_block() {
        let c = ctx("https://example.com/theme/");
        let html = "<style type=\"text/css\">\n.a { background: url(bg.png) }\n.b { background: URL( \"//cdn.example.net/b.png\" ) }\n</style>";
        assert_eq!(
            rewrite_css_urls(html, &c),
            "<style type=\"text/css\">\n.a { background: url(\"/api/fetch?u=https%3A%2F%2Fexample.com%2Ftheme%2Fbg.png\") }\n.b { background: url(\"/api/fetch?u=https%3A%2F%2Fcdn.example.net%2Fb.png\") }\n</style>"
        );
    }

    #[test]
    fn test_style_attribute_quotes() {
        let c = ctx("https://example.com/");
        assert_eq!(
            rewrite_css_urls(r#"<div style="background:url('/a.png')">"#, &c),
            r#"<div style="background:url('/api/fetch?u=https%3A%2F%2Fexample.com%2Fa.png')">"#
        );
        assert_eq!(
            rewrite_css_urls(r#"<div style='background:url(/a.png)'>"#, &c),
            r#"<div style='background:url("/api/fetch?u=https%3A%2F%2Fexample.com%2Fa.png")'>"#
        );
    }

    #[test]
    fn test_style_attribute_character_references() {
        let c = ctx("https://example.com/");
        assert_eq!(
            rewrite_css_urls(
                r#"<div style="background-image:url(&quot;/img/a.png&quot;)"></div>"#,
                &c
            ),
            r#"<div style="background-image:url('/api/fetch?u=https%3A%2F%2Fexample.com%2Fimg%2Fa.png')"></div>"#
        );
        assert_eq!(
            rewrite_css_urls(r#"<div style="background:url(&#39;/b.png&#39;)">"#, &c),
            r#"<div style="background:url('/api/fetch?u=https%3A%2F%2Fexample.com%2Fb.png')">"#
        );
        // 其余文本中的引号重新转义，不会提前结束属性
        assert_eq!(
            rewrite_css_urls(
                r#"<p style="font-family:&quot;A&amp;B&quot;;background:url(/c.png)">"#,
                &c
            ),
            r#"<p style="font-family:&quot;A&amp;B&quot;;background:url('/api/fetch?u=https%3A%2F%2Fexample.com%2Fc.png')">"#
        );
    }

    #[test]
    fn test_style_block_is_not_decoded() {
        let c = ctx("https://example.com/");
        let html = "<style>.a{background:url(&quot;x.png&quot;)}</style>";
        assert_eq!(
            rewrite_css_urls(html, &c),
            "<style>.a{background:url(\"/api/fetch?u=https%3A%2F%2Fexample.com%2F%26quot%3Bx.png%26quot%3B\")}</style>"
        );
    }

    #[test]
    fn test_excluded_css_urls_unchanged() {
        let c = ctx("https://example.com/");
        for html in [
            r#"<style>.a{background:url(https://x.org/a.png)}</style>"#,
            r#"<style>.a{background:url("data:image/svg+xml;utf8,<svg/>")}</style>"#,
            r#"<style>.a{background:url(blob:https://example.com/1)}</style>"#,
            r#"<style>.a{background:url()}</style>"#,
            r#"<div style="mask:url(/api/fetch?u=https%3A%2F%2Fexample.com%2Fm.svg)">"#,
        ] {
            assert_eq!(rewrite_css_urls(html, &c), html);
        }
    }

    #[test]
    fn test_url_outside_css_untouched() {
        let c = ctx("https://example.com/");
        let html = "<script>const u = 'url(a.png)';</script><p>url(b.png)</p>";
        assert_eq!(rewrite_css_urls(html, &c), html);
    }
}
