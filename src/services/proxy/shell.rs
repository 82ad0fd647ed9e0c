// 内置外壳页面（GET /）
//
// 地址栏 + 前往按钮 + Cookie 弹窗开关 + 状态栏 + 沙箱 iframe。
// 页面没有任何服务端逻辑，只负责拼出代理地址并响应 iframe 发来的消息。

use super::injector::{MESSAGE_LOADED, MESSAGE_NAVIGATE};

const SHELL_TEMPLATE: &str = r#"<!doctype html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>virtualbrowse</title>
<style>
  html, body { margin: 0; height: 100%; font-family: system-ui, sans-serif; }
  body { display: flex; flex-direction: column; }
  .bar { display: flex; gap: 8px; align-items: center; padding: 8px; border-bottom: 1px solid #ddd; }
  #address { flex: 1; padding: 6px 8px; font-size: 14px; }
  #status { padding: 4px 8px; font-size: 12px; color: #666; }
  #view { flex: 1; border: 0; width: 100%; }
</style>
</head>
<body>
<div class="bar">
  <input id="address" type="text" placeholder="example.com" autofocus>
  <button id="goBtn" type="button">Go</button>
  <label><input id="cookieToggle" type="checkbox" checked> 隐藏 Cookie 弹窗</label>
</div>
<div id="status">就绪</div>
<iframe id="view" sandbox="allow-scripts allow-same-origin allow-forms allow-popups"></iframe>
<script>
(function () {
  var ENDPOINT = __ENDPOINT__;
  var address = document.getElementById('address');
  var goBtn = document.getElementById('goBtn');
  var view = document.getElementById('view');
  var status = document.getElementById('status');
  var cookieToggle = document.getElementById('cookieToggle');

  // iframe 内的链接和 location 指向代理地址时，取回原始目标
  function unwrap(href) {
    try {
      var parsed = new URL(href, location.href);
      if (parsed.pathname === ENDPOINT && parsed.searchParams.get('u')) {
        return parsed.searchParams.get('u');
      }
    } catch (e) {}
    return href;
  }

  function navigate(url) {
    url = unwrap(String(url || '').trim());
    if (!url) return;
    if (!/^https?:\/\//i.test(url)) url = 'https://' + url;
    address.value = url;
    status.textContent = '加载中 ' + url + ' ...';
    var cookies = cookieToggle.checked ? '1' : '0';
    view.src = ENDPOINT + '?u=' + encodeURIComponent(url) + '&cookies=' + cookies;
  }

  goBtn.onclick = function () { navigate(address.value); };
  address.addEventListener('keydown', function (e) {
    if (e.key === 'Enter') navigate(address.value);
  });

  window.addEventListener('message', function (event) {
    var data = event.data;
    if (!data || typeof data !== 'object') return;
    if (data.type === '__NAVIGATE__') {
      navigate(data.href);
    } else if (data.type === '__LOADED__') {
      var href = unwrap(data.href);
      status.textContent = '已加载: ' + href;
      address.value = href;
    }
  });
})();
</script>
</body>
</html>
"#;

/// 渲染外壳页面，代理入口路径以 JS 字符串字面量嵌入
pub fn render_shell(endpoint_path: &str) -> String {
    let endpoint = serde_json::to_string(endpoint_path)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace("</", "<\\/");
    SHELL_TEMPLATE
        .replace("__ENDPOINT__", &endpoint)
        .replace("__NAVIGATE__", MESSAGE_NAVIGATE)
        .replace("__LOADED__", MESSAGE_LOADED)
}
