// <base href> 插入：为未改写的相对引用锚定正确的 origin

use once_cell::sync::Lazy;
use regex::Regex;

use crate::services::proxy::resolver::ResolvedTarget;

static HEAD_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("invalid head regex"));

/// 作为 `<head>` 的第一个子元素插入；没有 `<head>` 时放在文档最前面
///
/// 已存在相同的 base 标签时不重复插入。
pub fn insert_base_tag(html: &str, target: &ResolvedTarget) -> String {
    let tag = format!(r#"<base href="{}">"#, escape_attr(&target.base_href()));
    if html.contains(&tag) {
        return html.to_string();
    }

    match HEAD_OPEN.find(html) {
        Some(head) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..head.end()]);
            out.push_str(&tag);
            out.push_str(&html[head.end()..]);
            out
        }
        None => format!("{tag}{html}"),
    }
}

/// HTML 属性值转义
fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
