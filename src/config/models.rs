//! Runtime settings, sourced from the environment.

use serde::Deserialize;

/// Everything the WAF needs to run. `DATABASE_URL`, `REDIS_URL` and
/// `BACKEND_URL` are required; the rest have defaults applied by the loader.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Persistent store DSN (`DATABASE_URL`).
    pub database_url: String,
    /// Ephemeral store DSN (`REDIS_URL`).
    pub redis_url: String,
    /// Upstream origin base URL (`BACKEND_URL`).
    pub backend_url: String,
    /// Listen address (`WAF_HOST`, default `0.0.0.0`).
    pub waf_host: String,
    /// Listen port (`WAF_PORT`, default `8000`).
    pub waf_port: u16,
    /// Block at or above this score (`THREAT_SCORE_THRESHOLD`, default `50`).
    pub threat_score_threshold: i32,
    /// Comma-separated origins allowed on the admin endpoints
    /// (`CORS_ORIGINS`, optional).
    pub cors_origins: Option<String>,
}

impl Settings {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.waf_host, self.waf_port)
    }
}
