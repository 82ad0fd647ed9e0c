// src / href 属性改写

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::reference::{
    classify, decode_entities, rewrite_protocol_relative, rewrite_relative, swallow, ReferenceKind,
};
use super::RewriteContext;

/// `src=` / `href=`，支持双引号、单引号和无引号的值
///
/// 属性名前必须是空白，避免命中 `data-src`、`srcset` 或脚本中的 `.src=`。
/// 无引号的值一直延续到空白或 `>`，其中可以包含 `=`。
static SRC_HREF_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(\s)(src|href)(\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>][^\s>]*))"#)
        .expect("invalid src/href regex")
});

/// 步骤 3：相对引用
pub(super) fn rewrite_relative_attributes(html: &str, ctx: &RewriteContext) -> String {
    rewrite_attributes(html, |value| match classify(value, ctx) {
        ReferenceKind::Relative => swallow(rewrite_relative(value, ctx)),
        _ => None,
    })
}

/// 步骤 4：协议相对引用
pub(super) fn rewrite_protocol_relative_attributes(html: &str, ctx: &RewriteContext) -> String {
    rewrite_attributes(html, |value| match classify(value, ctx) {
        ReferenceKind::ProtocolRelative => swallow(rewrite_protocol_relative(value, ctx)),
        _ => None,
    })
}

fn rewrite_attributes<F>(html: &str, rewrite_value: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    SRC_HREF_ATTR
        .replace_all(html, |caps: &Captures| {
            let original = caps[0].to_string();
            let (value, quote) = match (caps.get(4), caps.get(5), caps.get(6)) {
                (Some(v), _, _) => (v.as_str(), "\""),
                (_, Some(v), _) => (v.as_str(), "'"),
                (_, _, Some(v)) => (v.as_str(), ""),
                _ => return original,
            };

            match rewrite_value(&decode_entities(value)) {
                Some(rewritten) => format!(
                    "{}{}{}{quote}{rewritten}{quote}",
                    &caps[1], &caps[2], &caps[3]
                ),
                None => original,
            }
        })
        .into_owned()
}
