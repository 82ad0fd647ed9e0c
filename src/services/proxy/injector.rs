// 客户端脚本注入
//
// 注入的脚本运行在被代理页面中：
// - 捕获阶段拦截链接点击，向父窗口发送 {type: "navigate", href}
// - 初次加载完成后发送 {type: "loaded", href}
// - 可选：持续清除 Cookie / 隐私同意弹窗
//
// 代理本身从不执行这段脚本，只把它作为文档的一部分输出。

use once_cell::sync::Lazy;
use regex::Regex;

use super::rewriter::RewriteContext;

/// 消息类型（与外层页面约定）
pub const MESSAGE_NAVIGATE: &str = "navigate";
pub const MESSAGE_LOADED: &str = "loaded";

static BODY_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</body\s*>").expect("invalid body close regex"));

const SCRIPT_HEAD: &str = r#"<script data-virtualbrowse="1">
(function () {
  function post(type, href) {
    try { window.parent.postMessage({ type: type, href: href }, '*'); } catch (e) {}
  }

  try {
    document.addEventListener('click', function (e) {
      try {
        var el = e.target;
        while (el && el.nodeType === 1 && el.tagName !== 'A') el = el.parentElement;
        if (el && el.nodeType === 1 && el.tagName === 'A' && el.href) {
          e.preventDefault();
          post('navigate', el.href);
        }
      } catch (err) {}
    }, true);
  } catch (e) {}

  function notifyLoaded() { post('loaded', location.href); }
  try {
    if (document.readyState === 'loading') {
      document.addEventListener('DOMContentLoaded', notifyLoaded);
    } else {
      notifyLoaded();
    }
  } catch (e) {}
"#;

const COOKIE_SWEEP: &str = r#"
  var BANNER_SELECTORS = [
    '[id*="cookie" i]', '[class*="cookie" i]', '[role*="cookie" i]',
    '[id*="consent" i]', '[class*="consent" i]', '[role*="consent" i]',
    '[id*="gdpr" i]', '[class*="gdpr" i]', '[role*="gdpr" i]',
    '[role="dialog"]', '[role="alertdialog"]', '[aria-modal="true"]'
  ].join(',');
  var DISMISS_LABEL = /(accept|agree|allow|consent|got it|ok\b|okay|dismiss|close|reject|decline|understand|akzeptieren|accepter|aceptar|accetta)/i;
  var CONTROLS = 'button, a[role="button"], [role="button"], input[type="button"], input[type="submit"]';

  function controlLabel(el) {
    return ((el.innerText || el.textContent || el.value || '') + ' ' +
      (el.getAttribute('aria-label') || '') + ' ' + (el.getAttribute('title') || '')).trim();
  }

  function dismiss(banner) {
    try {
      var controls = banner.querySelectorAll(CONTROLS);
      for (var i = 0; i < controls.length; i++) {
        if (DISMISS_LABEL.test(controlLabel(controls[i]))) {
          controls[i].click();
          break;
        }
      }
    } catch (e) {}
  }

  function sweep() {
    try {
      var found = document.querySelectorAll(BANNER_SELECTORS);
      for (var i = 0; i < found.length; i++) {
        var el = found[i];
        if (el.getAttribute('data-virtualbrowse-hidden')) continue;
        if (el === document.body || el === document.documentElement) continue;
        el.setAttribute('data-virtualbrowse-hidden', '1');
        dismiss(el);
        try { el.style.setProperty('display', 'none', 'important'); } catch (e) {}
      }
      // 弹窗常会锁住页面滚动
      if (found.length) {
        try {
          document.documentElement.style.removeProperty('overflow');
          if (document.body) document.body.style.removeProperty('overflow');
        } catch (e) {}
      }
    } catch (e) {}
  }

  try {
    sweep();
    new MutationObserver(sweep).observe(document.documentElement, { childList: true, subtree: true });
  } catch (e) {}
"#;

const SCRIPT_TAIL: &str = "})();\n</script>";

/// 组装注入脚本
pub fn build_script(cookie_removal: bool) -> String {
    let mut script =
        String::with_capacity(SCRIPT_HEAD.len() + COOKIE_SWEEP.len() + SCRIPT_TAIL.len());
    script.push_str(SCRIPT_HEAD);
    if cookie_removal {
        script.push_str(COOKIE_SWEEP);
    }
    script.push_str(SCRIPT_TAIL);
    script
}

/// 把脚本插入到第一个 `</body>` 之前；没有 `</body>` 时追加到文档末尾
pub fn inject(html: &str, ctx: &RewriteContext, cookie_removal: bool) -> String {
    let script = build_script(cookie_removal);
    tracing::trace!(
        target_url = %ctx.base.normalized_url(),
        cookie_removal,
        "注入客户端脚本"
    );

    match BODY_CLOSE.find(html) {
        Some(close) => {
            let mut out = String::with_capacity(html.len() + script.len() + 1);
            out.push_str(&html[..close.start()]);
            out.push_str(&script);
            out.push('\n');
            out.push_str(&html[close.start()..]);
            out
        }
        None => format!("{html}{script}"),
    }
}
