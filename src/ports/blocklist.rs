use async_trait::async_trait;
use thiserror::Error;

use crate::{core::types::BlockedIp, ports::StoreError};

/// Error from the ephemeral store. The pipeline fails open on these: a dead
/// Redis must not take legitimate traffic down with it.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SoftBlockError {
    #[error("ephemeral store error: {0}")]
    Backend(String),
}

/// Ephemeral TTL-based blocklist (`blocked:<ip>` keys). Checked before the
/// hard tier; the core never writes to it.
#[async_trait]
pub trait SoftBlocklist: Send + Sync + 'static {
    /// True when a `blocked:<ip>` key holds any value.
    async fn is_blocked(&self, ip: &str) -> Result<bool, SoftBlockError>;

    /// Liveness probe for the readiness endpoint.
    async fn ping(&self) -> Result<(), SoftBlockError>;
}

/// Persistent blocklist rows. Entries past their `expires_at` are treated as
/// non-blocking on the read path.
#[async_trait]
pub trait HardBlocklist: Send + Sync + 'static {
    async fn is_blocked(&self, ip: &str) -> Result<bool, StoreError>;

    /// All entries, newest first, for the admin surface.
    async fn list(&self) -> Result<Vec<BlockedIp>, StoreError>;

    /// Delete an entry by address. Returns false when no row matched.
    async fn remove(&self, ip: &str) -> Result<bool, StoreError>;
}
