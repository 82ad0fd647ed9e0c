// srcset 改写：逐个候选 URL 改写，描述符保持不变

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::reference::{decode_entities, escape_attr_value, rewrite_any};
use super::RewriteContext;

static SRCSET_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(\s)(srcset|imagesrcset)(\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>][^\s>]*))"#)
        .expect("invalid srcset regex")
});

pub(super) fn rewrite_srcset_attributes(html: &str, ctx: &RewriteContext) -> String {
    SRCSET_ATTR
        .replace_all(html, |caps: &Captures| {
            // 无引号的值改写后统一加双引号
            let (value, quote) = match (caps.get(4), caps.get(5), caps.get(6)) {
                (Some(v), _, _) => (v.as_str(), '"'),
                (_, Some(v), _) => (v.as_str(), '\''),
                (_, _, Some(v)) => (v.as_str(), '"'),
                _ => return caps[0].to_string(),
            };
            match rewrite_srcset_value(&decode_entities(value), ctx) {
                Some(rewritten) => format!(
                    "{}{}{}{quote}{}{quote}",
                    &caps[1],
                    &caps[2],
                    &caps[3],
                    escape_attr_value(&rewritten, quote)
                ),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// 改写整个 srcset 值；没有任何候选被改写时返回 `None`
fn rewrite_srcset_value(value: &str, ctx: &RewriteContext) -> Option<String> {
    let candidates = parse_candidates(value);
    let mut changed = false;

    let rewritten: Vec<String> = candidates
        .into_iter()
        .map(|(url, descriptor)| {
            let url = match rewrite_any(url, ctx) {
                Some(new_url) => {
                    changed = true;
                    new_url
                }
                None => url.to_string(),
            };
            if descriptor.is_empty() {
                url
            } else {
                format!("{url} {descriptor}")
            }
        })
        .collect();

    changed.then(|| rewritten.join(", "))
}

/// 拆分候选项：`<url> <描述符>?`，以逗号分隔
///
/// URL 本身不含空白，因此 `data:` URL 里的逗号不会被当作分隔符。
fn parse_candidates(value: &str) -> Vec<(&str, &str)> {
    let mut candidates = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        rest = &rest[url_end..];

        // URL 以逗号结尾时没有描述符
        let url = raw_url.trim_end_matches(',');
        if url.len() != raw_url.len() {
            candidates.push((url, ""));
            continue;
        }

        let descriptor_end = rest.find(',').unwrap_or(rest.len());
        let descriptor = rest[..descriptor_end].trim();
        rest = &rest[descriptor_end..];
        candidates.push((url, descriptor));
    }

    candidates
}
