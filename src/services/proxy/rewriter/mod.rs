//! 资源引用改写
//!
//! 基于文本模式匹配（非 DOM 解析）改写 HTML，使所有子资源重新经过代理。
//! 各步骤按固定顺序作用于同一文本：
//!
//! 1. 删除 CSP / X-Frame-Options 的 `<meta http-equiv>` 标签
//! 2. 在 `<head>` 开头插入 `<base href>`
//! 3. `src` / `href` 相对引用 → `/api/fetch?u=<编码后的绝对 URL>`
//! 4. 协议相对引用（`//host/path`）补全 scheme 后同样走代理
//! 5. `srcset` 中的每个候选 URL 单独改写
//! 6. `<style>` 块与 `style` 属性中的 CSS `url(...)`
//!
//! 无法解析的单个引用保持原样，整个改写过程不会失败。

mod attributes;
mod base;
mod css;
mod meta;
mod reference;
mod srcset;

use super::resolver::ResolvedTarget;

pub use base::insert_base_tag;
pub use meta::strip_security_meta;

/// 单次请求内只读的改写上下文
#[derive(Debug, Clone)]
pub struct RewriteContext {
    pub base: ResolvedTarget,
    /// 代理入口路径，例如 `/api/fetch`
    pub proxy_endpoint: String,
}

impl RewriteContext {
    pub fn new(base: ResolvedTarget, proxy_endpoint: impl Into<String>) -> Self {
        Self {
            base,
            proxy_endpoint: proxy_endpoint.into(),
        }
    }

    /// 构造指向代理的引用
    pub fn proxy_url(&self, absolute: &str) -> String {
        format!(
            "{}?u={}",
            self.proxy_endpoint,
            urlencoding::encode(absolute)
        )
    }

    /// 是否已经是代理引用
    pub fn is_proxied(&self, value: &str) -> bool {
        value
            .strip_prefix(self.proxy_endpoint.as_str())
            .is_some_and(|rest| rest.starts_with('?'))
    }
}

/// 完整改写：meta 删除、base 插入以及全部引用改写
pub fn rewrite(html: &str, ctx: &RewriteContext) -> String {
    let html = strip_security_meta(html);
    let html = insert_base_tag(&html, &ctx.base);
    rewrite_references(&html, ctx)
}

/// 仅改写资源引用（步骤 3-6）
pub fn rewrite_references(html: &str, ctx: &RewriteContext) -> String {
    let html = attributes::rewrite_relative_attributes(html, ctx);
    let html = attributes::rewrite_protocol_relative_attributes(&html, ctx);
    let html = srcset::rewrite_srcset_attributes(&html, ctx);
    css::rewrite_css_urls(&html, ctx)
}
