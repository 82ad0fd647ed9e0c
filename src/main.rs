use std::sync::Arc;

use anyhow::{Context, Result};
use virtualbrowse::{build_http_client, init_logger, load_app_config, HttpFetcher, ProxyInstance};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config().context("加载配置失败")?;

    init_logger(&config.log).context("初始化日志系统失败")?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "virtualbrowse 启动");

    let client =
        build_http_client(&config.proxy, &config.outbound_proxy).context("创建 HTTP 客户端失败")?;
    let fetcher = Arc::new(HttpFetcher::new(client));

    let instance = ProxyInstance::new(config, fetcher);
    let addr = instance.start().await?;
    tracing::info!("🚀 打开 http://{addr}/ 开始浏览");

    tokio::signal::ctrl_c()
        .await
        .context("监听退出信号失败")?;

    instance.stop().await?;
    Ok(())
}
