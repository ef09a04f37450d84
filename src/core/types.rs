//! Core data models for the WAF: rules, attack logs, and blocklist entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The global decision taken for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Block => "block",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pattern rule. The `action` field is advisory and retained for the admin
/// UI; the engine decides solely by the score threshold.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub rule_type: String,
    pub pattern: String,
    pub score: i32,
    pub action: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// An immutable record of one inspected request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttackLog {
    pub id: Uuid,
    pub ip_address: String,
    pub method: String,
    pub endpoint: String,
    pub headers: Option<serde_json::Value>,
    pub request_body: Option<String>,
    pub threat_score: i32,
    pub action_taken: String,
    pub threat_types: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl AttackLog {
    /// The JSON event published to realtime subscribers after the row commits.
    pub fn to_event(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "new_log",
            "data": {
                "id": self.id,
                "ip_address": self.ip_address,
                "method": self.method,
                "endpoint": self.endpoint,
                "threat_score": self.threat_score,
                "action_taken": self.action_taken,
                "threat_types": self.threat_types.clone().unwrap_or_default(),
                "created_at": self.created_at.to_rfc3339(),
            },
        })
    }
}

/// Slim serialization of an [`AttackLog`] for the admin listing (the header
/// snapshot and body are deliberately omitted).
#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub id: Uuid,
    pub ip_address: String,
    pub method: String,
    pub endpoint: String,
    pub threat_score: i32,
    pub action_taken: String,
    pub threat_types: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AttackLog> for LogView {
    fn from(log: AttackLog) -> Self {
        Self {
            id: log.id,
            ip_address: log.ip_address,
            method: log.method,
            endpoint: log.endpoint,
            threat_score: log.threat_score,
            action_taken: log.action_taken,
            threat_types: log.threat_types.unwrap_or_default(),
            created_at: log.created_at,
        }
    }
}

/// Fields for a log row about to be written.
#[derive(Debug, Clone)]
pub struct NewAttackLog {
    pub ip_address: String,
    pub method: String,
    pub endpoint: String,
    pub headers: serde_json::Value,
    pub request_body: Option<String>,
    pub threat_score: i32,
    pub action_taken: Action,
    pub threat_types: Vec<String>,
}

/// A persistent (hard) blocklist entry. Rows with `expires_at` in the past
/// are treated as non-blocking on the read path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlockedIp {
    pub id: Uuid,
    pub ip_address: String,
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Result of scoring one request against the enabled rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub threat_score: i32,
    /// Matched category tags, deduplicated in first-seen order.
    pub threat_types: Vec<String>,
    pub action: Action,
}

/// Aggregate traffic statistics served by `/api/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficStats {
    pub total_requests: i64,
    pub blocked_requests: i64,
    pub allowed_requests: i64,
    pub top_ips: Vec<IpCount>,
    pub threat_distribution: Vec<ThreatCount>,
    pub requests_over_time: Vec<HourlyCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreatCount {
    #[serde(rename = "type")]
    pub threat_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyCount {
    pub hour: String,
    pub count: i64,
}
