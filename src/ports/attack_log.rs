use async_trait::async_trait;

use crate::{
    core::types::{AttackLog, NewAttackLog, TrafficStats},
    ports::StoreError,
};

/// Append-only store of request decisions.
#[async_trait]
pub trait AttackLogStore: Send + Sync + 'static {
    /// Insert and commit one log row, returning it with id and timestamp.
    async fn insert(&self, entry: NewAttackLog) -> Result<AttackLog, StoreError>;

    /// Most recent rows first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AttackLog>, StoreError>;

    /// Aggregates for the dashboard: totals, top attacker IPs, category
    /// histogram, and the last-24h hourly series.
    async fn stats(&self) -> Result<TrafficStats, StoreError>;
}
