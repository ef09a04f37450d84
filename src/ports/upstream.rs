use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
};
use thiserror::Error;

/// Error from the upstream hop. `Unreachable` carries the transport error
/// text surfaced verbatim in the 502 body.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    #[error("{0}")]
    Unreachable(String),

    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),
}

/// A fully buffered request ready to forward to the origin.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The origin's buffered response.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The pooled client used for every forwarded request. Constructed once at
/// startup and shared.
#[async_trait]
pub trait UpstreamClient: Send + Sync + 'static {
    async fn forward(&self, req: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}
