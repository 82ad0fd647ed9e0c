//! HTTP Body 类型定义
//!
//! 统一的 BoxBody：改写后的 HTML 使用 `Full`，二进制资源使用上游字节流

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Body, Frame};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pin_project! {
    pub struct BoxBody {
        #[pin]
        inner: Pin<Box<dyn Body<Data = Bytes, Error = BoxError> + Send>>,
    }
}

impl Body for BoxBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.project().inner.poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> hyper::body::SizeHint {
        self.inner.size_hint()
    }
}

impl std::fmt::Debug for BoxBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxBody").finish_non_exhaustive()
    }
}

/// 创建 BoxBody 的辅助函数
pub fn box_body<B>(body: B) -> BoxBody
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    BoxBody {
        inner: Box::pin(body.map_err(Into::into)),
    }
}

/// 一次性完整响应体
pub fn full(data: impl Into<Bytes>) -> BoxBody {
    box_body(Full::new(data.into()))
}

/// 把字节流包装为响应体，不做任何缓冲
pub fn stream_body<S, E>(stream: S) -> BoxBody
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    let frames = stream.map(|chunk| {
        chunk
            .map(Frame::data)
            .map_err(|e| -> BoxError { e.into() })
    });
    box_body(StreamBody::new(frames))
}
