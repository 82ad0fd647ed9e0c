//! 代理错误响应模板
//!
//! 统一的 JSON 错误格式和响应构建：`{"error", "message", "details"}`

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde_json::json;

use super::body::{full, BoxBody};
use crate::core::ProxyError;

fn json_response(status: StatusCode, code: &str, message: &str, details: &str) -> Response<BoxBody> {
    let payload = json!({
        "error": code,
        "message": message,
        "details": details,
    });
    let body = serde_json::to_vec_pretty(&payload).unwrap_or_default();

    let mut response = Response::new(full(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// 代理请求失败
pub fn proxy_error(err: &ProxyError) -> Response<BoxBody> {
    let details = match err {
        ProxyError::InvalidUrl { .. } => "请通过 u 参数提供有效的 http(s) 地址",
        ProxyError::BlockedHost { .. } => "不允许代理本地回环或内网地址",
        ProxyError::SelfReferential { .. } => "目标地址指向代理自身，已拒绝以避免回环",
        ProxyError::UpstreamFetch { .. } => "请检查目标站点是否可访问",
        ProxyError::Rewrite { .. } => "页面改写失败",
    };
    json_response(err.status_code(), err.error_code(), &err.to_string(), details)
}

/// 未知路径
pub fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        &format!("路径不存在: {path}"),
        "",
    )
}

/// 代理端点只接受 GET / HEAD
pub fn method_not_allowed(method: &str) -> Response<BoxBody> {
    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        &format!("不支持的请求方法: {method}"),
        "代理端点仅支持 GET 和 HEAD",
    );
    response
        .headers_mut()
        .insert("allow", HeaderValue::from_static("GET, HEAD"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn json_body(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_proxy_error_shape() {
        let response = proxy_error(&ProxyError::BlockedHost {
            host: "10.0.0.1".into(),
        });
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = json_body(response).await;
        assert_eq!(body["error"], "BLOCKED_HOST");
        assert!(body["message"].as_str().unwrap().contains("10.0.0.1"));
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let response = proxy_error(&ProxyError::UpstreamFetch {
            message: "connection reset".into(),
        });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "UPSTREAM_FETCH_ERROR");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let response = method_not_allowed("POST");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get("allow").unwrap(), "GET, HEAD");
        assert_eq!(json_body(response).await["error"], "METHOD_NOT_ALLOWED");
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = not_found("/nope");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["message"]
            .as_str()
            .unwrap()
            .contains("/nope"));
    }
}
