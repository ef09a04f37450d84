//! The proxy catch-all: every request not claimed by the admin or health
//! surface runs the inspection pipeline and, if allowed, is forwarded to the
//! origin.

use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    adapters::AppState,
    core::{Decision, InboundRequest},
    metrics,
    ports::{UpstreamError, UpstreamRequest},
    tracing_setup,
};

/// Headers scoped to a single transport connection (RFC 7230 §6.1); an
/// intermediary must not forward them in either direction.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Resolve the client IP: `X-Real-IP` wins, then the transport peer address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(value) = headers.get("x-real-ip")
        && let Ok(ip) = value.to_str()
        && !ip.is_empty()
    {
        return ip.to_string();
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

/// Copy request headers for the origin: everything except hop-by-hop headers
/// and `host` (reqwest derives the right host from the upstream URL).
pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for (name, value) in headers {
        let lower = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP_HEADERS.contains(&lower.as_str()) || lower == "host" {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Copy origin response headers for the client: hop-by-hop headers go, and
/// so do `content-encoding`/`content-length`. The client pool has already
/// decompressed the body and axum computes the length of what we send.
pub fn filter_response_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for (name, value) in headers {
        let lower = name.as_str().to_ascii_lowercase();
        if HOP_BY_HOP_HEADERS.contains(&lower.as_str())
            || lower == "content-encoding"
            || lower == "content-length"
        {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Snapshot the request headers as a JSON object for the log row. Values are
/// decoded lossily; duplicate names keep the last value.
pub fn headers_snapshot(headers: &HeaderMap) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        map.insert(
            name.as_str().to_string(),
            serde_json::Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        );
    }
    serde_json::Value::Object(map)
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    (status, axum::Json(body)).into_response()
}

/// Fallback handler wired after every admin route.
pub async fn proxy_handler(State(state): State<AppState>, req: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = resolve_client_ip(req.headers(), peer);

    let span = tracing_setup::create_request_span(method.as_str(), &path, &request_id, &ip);

    async {
        let _timer = metrics::RequestTimer::new(method.as_str());
        let response = handle(state, req, &ip).await;
        let status = response.status();
        tracing::Span::current().record("http.status_code", status.as_u16());
        tracing::info!(status = status.as_u16(), "request completed");
        response
    }
    .instrument(span)
    .await
}

async fn handle(state: AppState, req: Request, ip: &str) -> Response {
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().unwrap_or("").to_string();

    // Buffer the whole body: the lossy UTF-8 view feeds inspection, the raw
    // bytes are what the origin receives.
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(%error, "failed to read request body");
            return json_response(
                StatusCode::BAD_REQUEST,
                serde_json::json!({"detail": "Failed to read request body"}),
            );
        }
    };
    let body_text = if body_bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&body_bytes).into_owned())
    };

    let inbound = InboundRequest {
        ip: ip.to_string(),
        method: method.to_string(),
        path: path.clone(),
        query: query.clone(),
        headers: headers_snapshot(&parts.headers),
        body_text,
    };

    let decision = match state.pipeline.evaluate(&inbound).await {
        Ok(decision) => decision,
        Err(error) => {
            tracing::error!(%error, "inspection pipeline failed");
            metrics::increment_request_total(method.as_str(), "error", 500);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"detail": "WAF internal error"}),
            );
        }
    };

    match decision {
        Decision::IpBlocked => {
            metrics::increment_request_total(method.as_str(), "block", 403);
            json_response(
                StatusCode::FORBIDDEN,
                serde_json::json!({"detail": "Your IP has been blocked."}),
            )
        }
        Decision::RuleBlocked { threat_types } => {
            metrics::increment_request_total(method.as_str(), "block", 403);
            json_response(
                StatusCode::FORBIDDEN,
                serde_json::json!({
                    "detail": "Request blocked by WAF",
                    "threat_types": threat_types,
                }),
            )
        }
        Decision::Allowed => {
            let response =
                forward(&state, &parts.headers, method.clone(), &path, &query, ip, body_bytes)
                    .await;
            metrics::increment_request_total(method.as_str(), "allow", response.status().as_u16());
            response
        }
    }
}

async fn forward(
    state: &AppState,
    request_headers: &HeaderMap,
    method: axum::http::Method,
    path: &str,
    query: &str,
    ip: &str,
    body: Bytes,
) -> Response {
    let base = state.settings.backend_url.trim_end_matches('/');
    let url = if query.is_empty() {
        format!("{base}{path}")
    } else {
        format!("{base}{path}?{query}")
    };

    let original_host = request_headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut headers = filter_request_headers(request_headers);
    if let Ok(ip_value) = HeaderValue::from_str(ip) {
        headers.insert("x-forwarded-for", ip_value.clone());
        headers.insert("x-real-ip", ip_value);
    }
    if let Ok(host_value) = HeaderValue::from_str(&original_host) {
        headers.insert("x-forwarded-host", host_value);
    }

    match state
        .upstream
        .forward(UpstreamRequest {
            method,
            url,
            headers,
            body,
        })
        .await
    {
        Ok(upstream) => {
            let mut builder = Response::builder().status(upstream.status);
            if let Some(response_headers) = builder.headers_mut() {
                *response_headers = filter_response_headers(&upstream.headers);
            }
            match builder.body(Body::from(upstream.body)) {
                Ok(response) => response,
                Err(error) => {
                    tracing::error!(%error, "failed to assemble relay response");
                    json_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        serde_json::json!({"detail": "WAF internal error"}),
                    )
                }
            }
        }
        Err(UpstreamError::Unreachable(message)) => {
            tracing::error!(error = %message, "origin unreachable");
            json_response(
                StatusCode::BAD_GATEWAY,
                serde_json::json!({"detail": format!("Backend unreachable: {message}")}),
            )
        }
        Err(error) => {
            tracing::error!(%error, "upstream request invalid");
            json_response(
                StatusCode::BAD_GATEWAY,
                serde_json::json!({"detail": format!("Backend unreachable: {error}")}),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn client_ip_prefers_x_real_ip() {
        let headers = header_map(&[("x-real-ip", "9.9.9.9")]);
        let peer: SocketAddr = "1.2.3.4:5678".parse().unwrap();
        assert_eq!(resolve_client_ip(&headers, Some(peer)), "9.9.9.9");
    }

    #[test]
    fn client_ip_falls_back_to_peer_then_unknown() {
        let peer: SocketAddr = "1.2.3.4:5678".parse().unwrap();
        assert_eq!(resolve_client_ip(&HeaderMap::new(), Some(peer)), "1.2.3.4");
        assert_eq!(resolve_client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn client_ip_handles_ipv6_peer() {
        let peer: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(resolve_client_ip(&HeaderMap::new(), Some(peer)), "2001:db8::1");
    }

    #[test]
    fn request_filter_strips_hop_by_hop_and_host() {
        let headers = header_map(&[
            ("host", "waf.example"),
            ("connection", "keep-alive"),
            ("keep-alive", "timeout=5"),
            ("transfer-encoding", "chunked"),
            ("upgrade", "h2c"),
            ("te", "trailers"),
            ("trailers", "expires"),
            ("proxy-authenticate", "basic"),
            ("proxy-authorization", "basic Zm9v"),
            ("accept", "application/json"),
            ("x-custom", "kept"),
        ]);
        let filtered = filter_request_headers(&headers);
        assert!(filtered.get("host").is_none());
        for name in HOP_BY_HOP_HEADERS {
            assert!(filtered.get(*name).is_none(), "{name} should be stripped");
        }
        assert_eq!(filtered.get("accept").unwrap(), "application/json");
        assert_eq!(filtered.get("x-custom").unwrap(), "kept");
    }

    #[test]
    fn response_filter_strips_encoding_and_length() {
        let headers = header_map(&[
            ("content-encoding", "gzip"),
            ("content-length", "123"),
            ("connection", "close"),
            ("content-type", "text/html"),
            ("x-upstream", "kept"),
        ]);
        let filtered = filter_response_headers(&headers);
        assert!(filtered.get("content-encoding").is_none());
        assert!(filtered.get("content-length").is_none());
        assert!(filtered.get("connection").is_none());
        assert_eq!(filtered.get("content-type").unwrap(), "text/html");
        assert_eq!(filtered.get("x-upstream").unwrap(), "kept");
    }

    #[test]
    fn headers_snapshot_is_a_json_object() {
        let headers = header_map(&[("accept", "*/*"), ("x-a", "1")]);
        let snapshot = headers_snapshot(&headers);
        assert_eq!(snapshot["accept"], "*/*");
        assert_eq!(snapshot["x-a"], "1");
    }
}
