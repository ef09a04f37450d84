//! The per-request decision pipeline.
//!
//! Order per request: soft blocklist, hard blocklist, rule inspection, log
//! write, decision. Every request, allowed or blocked, gets a log row
//! committed before the caller builds a response. The ephemeral tier fails
//! open; the persistent tier fails the request.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    core::{
        engine,
        fanout::LogFanout,
        types::{Action, AttackLog, NewAttackLog},
    },
    metrics,
    ports::{AttackLogStore, HardBlocklist, RuleStore, SoftBlocklist, StoreError},
};

/// Synthetic category recorded when a request is rejected by the blocklist.
pub const IP_BLOCKED_TYPE: &str = "IP_BLOCKED";
/// Score recorded for blocklist rejections.
pub const IP_BLOCKED_SCORE: i32 = 100;

/// A request normalized for inspection. The adapter keeps the raw body bytes
/// for forwarding; the pipeline only sees the lossy UTF-8 view.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub ip: String,
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: serde_json::Value,
    pub body_text: Option<String>,
}

/// Outcome of the pipeline, consumed by the proxy adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Soft or hard blocklist hit; respond 403 with the generic message.
    IpBlocked,
    /// Score reached the threshold; respond 403 with the matched categories.
    RuleBlocked { threat_types: Vec<String> },
    /// Forward to the origin.
    Allowed,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Writes the log row, then publishes the realtime event. A fan-out problem
/// never fails the request.
#[derive(Clone)]
pub struct LogRecorder {
    store: Arc<dyn AttackLogStore>,
    fanout: Arc<LogFanout>,
}

impl LogRecorder {
    pub fn new(store: Arc<dyn AttackLogStore>, fanout: Arc<LogFanout>) -> Self {
        Self { store, fanout }
    }

    pub async fn record(&self, entry: NewAttackLog) -> Result<AttackLog, StoreError> {
        let log = self.store.insert(entry).await?;
        match serde_json::to_string(&log.to_event()) {
            Ok(event) => self.fanout.broadcast(&event),
            Err(error) => tracing::warn!(%error, "failed to serialize log event"),
        }
        Ok(log)
    }
}

/// The decision half of the proxy: blocklist tiers, inspection, and
/// unconditional logging.
pub struct RequestPipeline {
    rules: Arc<dyn RuleStore>,
    soft_blocks: Arc<dyn SoftBlocklist>,
    hard_blocks: Arc<dyn HardBlocklist>,
    recorder: LogRecorder,
    threshold: i32,
}

impl RequestPipeline {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        soft_blocks: Arc<dyn SoftBlocklist>,
        hard_blocks: Arc<dyn HardBlocklist>,
        recorder: LogRecorder,
        threshold: i32,
    ) -> Self {
        Self {
            rules,
            soft_blocks,
            hard_blocks,
            recorder,
            threshold,
        }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Run the full decision sequence for one request. The log row is written
    /// before this returns, so the caller may commit a response immediately.
    pub async fn evaluate(&self, req: &InboundRequest) -> Result<Decision, PipelineError> {
        // Tier 1: ephemeral blocklist. Unavailability fails open.
        let soft_hit = match self.soft_blocks.is_blocked(&req.ip).await {
            Ok(hit) => hit,
            Err(error) => {
                tracing::warn!(ip = %req.ip, %error, "soft blocklist unavailable, failing open");
                false
            }
        };
        if soft_hit {
            metrics::increment_blocked("soft_block");
            self.record(req, IP_BLOCKED_SCORE, vec![IP_BLOCKED_TYPE.to_string()], Action::Block)
                .await;
            return Ok(Decision::IpBlocked);
        }

        // Tier 2: persistent blocklist. Unavailability fails the request.
        if self.hard_blocks.is_blocked(&req.ip).await? {
            metrics::increment_blocked("hard_block");
            self.record(req, IP_BLOCKED_SCORE, vec![IP_BLOCKED_TYPE.to_string()], Action::Block)
                .await;
            return Ok(Decision::IpBlocked);
        }

        // Rule inspection over the current enabled set; no request-scoped
        // snapshot, so a toggle is visible on the next request.
        let rules = self.rules.list_enabled().await?;
        let inspection = engine::inspect(
            &rules,
            &req.method,
            &req.path,
            &req.query,
            req.body_text.as_deref(),
            self.threshold,
        );

        self.record(
            req,
            inspection.threat_score,
            inspection.threat_types.clone(),
            inspection.action,
        )
        .await;

        match inspection.action {
            Action::Block => {
                metrics::increment_blocked("rules");
                tracing::info!(
                    ip = %req.ip,
                    score = inspection.threat_score,
                    types = ?inspection.threat_types,
                    "request blocked by rules"
                );
                Ok(Decision::RuleBlocked {
                    threat_types: inspection.threat_types,
                })
            }
            Action::Allow => Ok(Decision::Allowed),
        }
    }

    /// Write the log row. Insert failures are reported in metrics and logs
    /// but never fail the request; the decision stands either way.
    async fn record(
        &self,
        req: &InboundRequest,
        threat_score: i32,
        threat_types: Vec<String>,
        action_taken: Action,
    ) {
        let entry = NewAttackLog {
            ip_address: req.ip.clone(),
            method: req.method.clone(),
            endpoint: req.path.clone(),
            headers: req.headers.clone(),
            request_body: req.body_text.clone(),
            threat_score,
            action_taken,
            threat_types,
        };
        if let Err(error) = self.recorder.record(entry).await {
            metrics::increment_log_write_failures();
            tracing::warn!(%error, "attack log write failed, continuing");
        }
    }
}
