//! Lightweight metrics helpers for the WAF.
//!
//! Thin wrappers over the `metrics` crate macros plus RAII timers. No
//! exporter is embedded; the application can initialize any compatible
//! recorder externally.
//!
//! Provided metrics (labels vary by family):
//! * `warden_requests_total` (counter; method/action/status)
//! * `warden_request_duration_seconds` (histogram; method)
//! * `warden_blocked_total` (counter; reason = soft_block | hard_block | rules)
//! * `warden_upstream_requests_total` (counter; status)
//! * `warden_upstream_request_duration_seconds` (histogram)
//! * `warden_log_write_failures_total` (counter; log loss is visible here)
//! * `warden_ws_subscribers` (gauge)
//! * `warden_ws_events_total` (counter)
//!
//! The timer structs leverage `Drop` to record durations safely even when
//! early returns or errors occur.

use std::time::Instant;

use metrics::{
    Unit, counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use once_cell::sync::Lazy;

pub const WARDEN_REQUESTS_TOTAL: &str = "warden_requests_total";
pub const WARDEN_REQUEST_DURATION_SECONDS: &str = "warden_request_duration_seconds";
pub const WARDEN_BLOCKED_TOTAL: &str = "warden_blocked_total";
pub const WARDEN_UPSTREAM_REQUESTS_TOTAL: &str = "warden_upstream_requests_total";
pub const WARDEN_UPSTREAM_REQUEST_DURATION_SECONDS: &str =
    "warden_upstream_request_duration_seconds";
pub const WARDEN_LOG_WRITE_FAILURES_TOTAL: &str = "warden_log_write_failures_total";
pub const WARDEN_WS_SUBSCRIBERS: &str = "warden_ws_subscribers";
pub const WARDEN_WS_EVENTS_TOTAL: &str = "warden_ws_events_total";

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        WARDEN_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests that entered the inspection pipeline."
    );
    describe_histogram!(
        WARDEN_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of the full request pipeline including the upstream hop."
    );
    describe_counter!(
        WARDEN_BLOCKED_TOTAL,
        Unit::Count,
        "Requests rejected with 403, by reason."
    );
    describe_counter!(
        WARDEN_UPSTREAM_REQUESTS_TOTAL,
        Unit::Count,
        "Requests forwarded to the origin, by response status."
    );
    describe_histogram!(
        WARDEN_UPSTREAM_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of the upstream hop."
    );
    describe_counter!(
        WARDEN_LOG_WRITE_FAILURES_TOTAL,
        Unit::Count,
        "Attack log rows that failed to persist."
    );
    describe_gauge!(
        WARDEN_WS_SUBSCRIBERS,
        "Currently attached realtime log subscribers."
    );
    describe_counter!(
        WARDEN_WS_EVENTS_TOTAL,
        Unit::Count,
        "Log events broadcast to realtime subscribers."
    );
});

/// Register metric descriptions (idempotent).
pub fn init_metrics() {
    Lazy::force(&DESCRIPTIONS);
    tracing::info!("metrics descriptions registered");
}

pub fn increment_request_total(method: &str, action: &str, status: u16) {
    counter!(
        WARDEN_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "action" => action.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_request_duration(method: &str, duration: std::time::Duration) {
    histogram!(
        WARDEN_REQUEST_DURATION_SECONDS,
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn increment_blocked(reason: &str) {
    counter!(WARDEN_BLOCKED_TOTAL, "reason" => reason.to_string()).increment(1);
}

pub fn increment_upstream_request_total(status: u16) {
    counter!(
        WARDEN_UPSTREAM_REQUESTS_TOTAL,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_upstream_request_duration(duration: std::time::Duration) {
    histogram!(WARDEN_UPSTREAM_REQUEST_DURATION_SECONDS).record(duration.as_secs_f64());
}

pub fn increment_log_write_failures() {
    counter!(WARDEN_LOG_WRITE_FAILURES_TOTAL).increment(1);
}

pub fn set_ws_subscribers(count: usize) {
    gauge!(WARDEN_WS_SUBSCRIBERS).set(count as f64);
}

pub fn increment_ws_events() {
    counter!(WARDEN_WS_EVENTS_TOTAL).increment(1);
}

/// RAII helper measuring full pipeline duration.
pub struct RequestTimer {
    start: Instant,
    method: String,
}

impl RequestTimer {
    pub fn new(method: &str) -> Self {
        Self {
            start: Instant::now(),
            method: method.to_string(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_request_duration(&self.method, self.start.elapsed());
    }
}

/// RAII helper measuring the upstream hop.
pub struct UpstreamTimer {
    start: Instant,
}

impl UpstreamTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for UpstreamTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UpstreamTimer {
    fn drop(&mut self) {
        record_upstream_request_duration(self.start.elapsed());
    }
}
