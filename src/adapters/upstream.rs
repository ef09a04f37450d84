//! Pooled upstream HTTP client for the origin hop.
//!
//! reqwest handles connection pooling, redirect following, and transparent
//! decompression, which is why the relay path strips `content-encoding` and
//! `content-length` from origin responses.

use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use crate::{
    metrics,
    ports::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse},
    tracing_setup,
};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new() -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn forward(&self, req: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let span = tracing_setup::create_upstream_span(&req.url, req.method.as_str());

        async {
            let _timer = metrics::UpstreamTimer::new();

            let response = self
                .client
                .request(req.method, &req.url)
                .headers(req.headers)
                .body(req.body)
                .send()
                .await
                .map_err(|error| UpstreamError::Unreachable(error.to_string()))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|error| UpstreamError::Unreachable(error.to_string()))?;

            tracing::Span::current().record("http.status_code", status.as_u16());
            metrics::increment_upstream_request_total(status.as_u16());

            Ok(UpstreamResponse {
                status,
                headers,
                body,
            })
        }
        .instrument(span)
        .await
    }
}
