// 代理实例管理
//
// ProxyInstance 封装整个同源转发代理服务，负责：
// - HTTP 服务器的启动和停止
// - 请求路由（代理入口 / 外壳页面 / 其他路径）
// - 目标解析 → 上游请求 → 响应组装 的流水线协调

use anyhow::{Context, Result};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, Uri};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use super::assembler::{assemble, AssembleOptions};
use super::fetcher::UpstreamFetcher;
use super::resolver::TargetResolver;
use super::rewriter::RewriteContext;
use super::shell::render_shell;
use super::utils::body::{full, BoxBody};
use super::utils::error_responses;
use super::utils::loop_detector::local_origins;
use crate::core::error::{ProxyError, ProxyResult};
use crate::models::AppConfig;

/// 请求处理共享的状态
struct ProxyState {
    endpoint_path: String,
    resolver: TargetResolver,
    fetcher: Arc<dyn UpstreamFetcher>,
}

/// 代理入口的查询参数
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProxyQuery {
    target: String,
    cookie_removal: bool,
}

impl ProxyQuery {
    fn parse(query: Option<&str>) -> ProxyResult<Self> {
        let mut target = None;
        let mut cookie_removal = false;

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "u" if target.is_none() => target = Some(value.into_owned()),
                "cookies" => cookie_removal = value == "1",
                _ => {}
            }
        }

        let target = target.ok_or_else(|| ProxyError::invalid_url("缺少 u 参数"))?;
        Ok(Self {
            target,
            cookie_removal,
        })
    }
}

/// 代理实例
pub struct ProxyInstance {
    config: Arc<AppConfig>,
    fetcher: Arc<dyn UpstreamFetcher>,
    server_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
}

impl ProxyInstance {
    /// 创建新的代理实例
    pub fn new(config: AppConfig, fetcher: Arc<dyn UpstreamFetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            server_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// 启动代理服务，返回实际绑定的地址（端口为 0 时由系统分配）
    pub async fn start(&self) -> Result<SocketAddr> {
        // 检查是否已经在运行
        {
            let handle = self.server_handle.read().await;
            if handle.is_some() {
                anyhow::bail!("代理实例已在运行");
            }
        }

        let server = &self.config.server;
        let host = if server.allow_public {
            "0.0.0.0"
        } else {
            server.host.as_str()
        };

        let listener = TcpListener::bind((host, server.port))
            .await
            .with_context(|| format!("绑定地址 {host}:{} 失败", server.port))?;
        let local_addr = listener.local_addr().context("读取监听地址失败")?;

        let state = Arc::new(ProxyState {
            endpoint_path: self.config.proxy.endpoint_path.clone(),
            resolver: self.build_resolver(local_addr.port()),
            fetcher: Arc::clone(&self.fetcher),
        });

        tracing::info!(
            addr = %local_addr,
            endpoint = %state.endpoint_path,
            allow_public = server.allow_public,
            "代理服务已启动"
        );

        // 启动服务器
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&state);

                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let state = Arc::clone(&state);
                                async move { handle_request(req, state).await }
                            });

                            if let Err(err) =
                                http1::Builder::new().serve_connection(io, service).await
                            {
                                tracing::debug!(peer = %peer, error = ?err, "处理连接失败");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "接受连接失败");
                    }
                }
            }
        });

        // 保存服务器句柄
        {
            let mut h = self.server_handle.write().await;
            *h = Some(handle);
        }

        Ok(local_addr)
    }

    /// 停止代理服务
    pub async fn stop(&self) -> Result<()> {
        let handle = {
            let mut h = self.server_handle.write().await;
            h.take()
        };

        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("代理服务已停止");
        }

        Ok(())
    }

    /// 检查服务是否在运行
    pub async fn is_running(&self) -> bool {
        let handle = self.server_handle.read().await;
        handle.is_some()
    }

    /// 自引用检查使用的 origin：显式配置的对外 origin + 本机监听地址
    fn build_resolver(&self, bound_port: u16) -> TargetResolver {
        let proxy = &self.config.proxy;
        if !proxy.block_self_reference {
            return TargetResolver::new();
        }

        let mut origins: Vec<String> = proxy.self_origin.iter().cloned().collect();
        origins.extend(local_origins(bound_port));
        let listen_origin = format!("http://{}:{bound_port}", self.config.server.host);
        if !origins.contains(&listen_origin) {
            origins.push(listen_origin);
        }
        TargetResolver::with_self_origins(origins)
    }
}

/// 处理单个请求
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ProxyState>,
) -> Result<Response<BoxBody>, Infallible> {
    // 代理端点不读取请求体
    let (parts, _body) = req.into_parts();
    Ok(route(&state, &parts.method, &parts.uri).await)
}

async fn route(state: &ProxyState, method: &Method, uri: &Uri) -> Response<BoxBody> {
    let path = uri.path();

    if path == state.endpoint_path {
        if method != Method::GET && method != Method::HEAD {
            return error_responses::method_not_allowed(method.as_str());
        }
        return handle_proxy(state, uri.query()).await;
    }

    if path == "/" && (method == Method::GET || method == Method::HEAD) {
        let mut response = Response::new(full(render_shell(&state.endpoint_path)));
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        return response;
    }

    error_responses::not_found(path)
}

async fn handle_proxy(state: &ProxyState, query: Option<&str>) -> Response<BoxBody> {
    let started = Instant::now();

    match proxy_pipeline(state, query).await {
        Ok(response) => {
            tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "代理请求完成");
            response
        }
        Err(err) => {
            match &err {
                ProxyError::UpstreamFetch { .. } => {
                    tracing::warn!(error = %err, "代理请求失败")
                }
                _ => tracing::info!(error = %err, "代理请求被拒绝"),
            }
            error_responses::proxy_error(&err)
        }
    }
}

async fn proxy_pipeline(state: &ProxyState, query: Option<&str>) -> ProxyResult<Response<BoxBody>> {
    let params = ProxyQuery::parse(query)?;
    let target = state.resolver.resolve(&params.target)?;

    tracing::info!(
        target_url = %target.normalized_url(),
        cookie_removal = params.cookie_removal,
        "🔄 代理请求"
    );

    let upstream = state.fetcher.fetch(&target).await?;
    let base = target.redirected_to(&upstream.final_url);
    let ctx = RewriteContext::new(base, state.endpoint_path.clone());

    Ok(assemble(
        upstream,
        &ctx,
        AssembleOptions {
            cookie_removal: params.cookie_removal,
        },
    ))
}
