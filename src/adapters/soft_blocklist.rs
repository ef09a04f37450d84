//! Redis-backed soft blocklist: `blocked:<ip>` keys with a TTL.

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::OnceCell;

use crate::ports::{SoftBlockError, SoftBlocklist};

impl From<redis::RedisError> for SoftBlockError {
    fn from(error: redis::RedisError) -> Self {
        SoftBlockError::Backend(error.to_string())
    }
}

/// The connection manager is built lazily so an unreachable Redis at boot
/// does not keep the proxy from starting; the pipeline fails open until the
/// store comes back.
pub struct RedisSoftBlocklist {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
}

impl RedisSoftBlocklist {
    pub fn new(url: &str) -> Result<Self, SoftBlockError> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            manager: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, SoftBlockError> {
        let manager = self
            .manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl SoftBlocklist for RedisSoftBlocklist {
    async fn is_blocked(&self, ip: &str) -> Result<bool, SoftBlockError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(format!("blocked:{ip}")).await?;
        Ok(value.is_some())
    }

    async fn ping(&self) -> Result<(), SoftBlockError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_url() {
        assert!(RedisSoftBlocklist::new("not-a-url").is_err());
    }

    #[test]
    fn accepts_redis_url_without_connecting() {
        // Client::open only parses; no server needs to be listening.
        assert!(RedisSoftBlocklist::new("redis://localhost:6379/0").is_ok());
    }
}
