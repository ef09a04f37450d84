//! Ports: the trait seams between the core pipeline and its backing stores.
//!
//! Adapters (Postgres, Redis, reqwest) implement these; the core and the
//! tests only ever see the traits.

pub mod attack_log;
pub mod blocklist;
pub mod rule_store;
pub mod upstream;

use thiserror::Error;

pub use attack_log::AttackLogStore;
pub use blocklist::{HardBlocklist, SoftBlockError, SoftBlocklist};
pub use rule_store::RuleStore;
pub use upstream::{UpstreamClient, UpstreamError, UpstreamRequest, UpstreamResponse};

/// Error from the persistent store. Failures here fail the request (5xx);
/// only the ephemeral tier is allowed to fail open.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}
