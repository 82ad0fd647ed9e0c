// 同源转发代理模块
//
// 目标解析 → 上游请求 → 响应头净化 / HTML 改写 / 脚本注入 → 响应组装

pub mod assembler;
pub mod fetcher;
pub mod headers;
pub mod injector;
pub mod proxy_instance;
pub mod resolver;
pub mod rewriter;
pub mod shell;
pub mod utils;

pub use assembler::{assemble, AssembleOptions};
pub use fetcher::{HttpFetcher, UpstreamBody, UpstreamFetcher, UpstreamResponse};
pub use proxy_instance::ProxyInstance;
pub use resolver::{ResolvedTarget, TargetResolver};
pub use rewriter::RewriteContext;
