//! 代理回环检测工具
//!
//! 防止目标 URL 指向代理自身导致无限递归抓取

/// 检查目标 URL 是否包含代理自身的任一 origin
///
/// # 参数
/// - `target_url`: 规范化后的目标 URL
/// - `own_origins`: 代理自身的 origin 列表（已转小写、无末尾斜杠）
///
/// # 返回
/// - `Some(origin)`: 检测到回环，返回命中的 origin
/// - `None`: 未检测到回环
pub fn is_self_referential<'a>(target_url: &str, own_origins: &'a [String]) -> Option<&'a str> {
    let target = target_url.to_lowercase();
    own_origins
        .iter()
        .find(|origin| target.contains(origin.as_str()))
        .map(String::as_str)
}

/// 监听地址对应的本地 origin（未显式配置 self_origin 时使用）
pub fn local_origins(port: u16) -> Vec<String> {
    vec![
        format!("http://127.0.0.1:{port}"),
        format!("https://127.0.0.1:{port}"),
        format!("http://localhost:{port}"),
        format!("https://localhost:{port}"),
    ]
}
