use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    core::{seed::SeedRule, types::Rule},
    ports::StoreError,
};

/// Persistent, mutable set of pattern rules.
#[async_trait]
pub trait RuleStore: Send + Sync + 'static {
    /// Enabled rules in creation order, the set the engine scores against.
    async fn list_enabled(&self) -> Result<Vec<Rule>, StoreError>;

    /// Every rule in creation order, for the admin surface.
    async fn list_all(&self) -> Result<Vec<Rule>, StoreError>;

    /// Flip `enabled` on one rule. Returns the updated rule, or `None` when
    /// no rule has that id.
    async fn toggle(&self, id: Uuid) -> Result<Option<Rule>, StoreError>;

    /// Insert `defaults` if and only if the rules table is empty. Atomic:
    /// concurrent boots of multiple replicas seed exactly once. Returns the
    /// number of rules inserted (zero when the table was already populated).
    async fn seed_if_empty(&self, defaults: &[SeedRule]) -> Result<u64, StoreError>;
}
