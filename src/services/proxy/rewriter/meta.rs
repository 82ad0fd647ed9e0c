// 删除页面内嵌的 CSP / X-Frame-Options meta 标签（与响应头净化策略一致）

use once_cell::sync::Lazy;
use regex::Regex;

static SECURITY_META: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<meta\b[^>]*\bhttp-equiv\s*=\s*["']?\s*(?:content-security-policy(?:-report-only)?|x-frame-options)\b[^>]*>"#,
    )
    .expect("invalid security meta regex")
});

pub fn strip_security_meta(html: &str) -> String {
    SECURITY_META.replace_all(html, "").into_owned()
}
