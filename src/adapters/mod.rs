//! Adapters: concrete implementations of the ports plus the HTTP surface.

pub mod admin;
pub mod pg;
pub mod proxy;
pub mod soft_blocklist;
pub mod upstream;
pub mod ws;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch},
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

pub use pg::{PgAttackLogStore, PgHardBlocklist, PgRuleStore};
pub use soft_blocklist::RedisSoftBlocklist;
pub use upstream::ReqwestUpstream;

use crate::{
    config::Settings,
    core::{LogFanout, RequestPipeline},
    ports::{AttackLogStore, HardBlocklist, RuleStore, SoftBlocklist, UpstreamClient},
};

/// Shared state threaded through every handler. Cheap to clone; everything
/// inside is an `Arc` or a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RequestPipeline>,
    pub upstream: Arc<dyn UpstreamClient>,
    pub rules: Arc<dyn RuleStore>,
    pub hard_blocks: Arc<dyn HardBlocklist>,
    pub soft_blocks: Arc<dyn SoftBlocklist>,
    pub logs: Arc<dyn AttackLogStore>,
    pub fanout: Arc<LogFanout>,
    pub db: PgPool,
    pub settings: Arc<Settings>,
}

/// Assemble the full router: admin and health routes first, the proxy
/// catch-all as the fallback so it never shadows them.
pub fn build_router(state: AppState, cors: Option<CorsLayer>) -> Router {
    let mut router = Router::new()
        .route("/health", get(admin::health))
        .route("/ready", get(admin::ready))
        .route("/api/logs", get(admin::list_logs))
        .route("/api/stats", get(admin::get_stats))
        .route("/api/rules", get(admin::list_rules))
        .route("/api/rules/{id}/toggle", patch(admin::toggle_rule))
        .route("/api/blocked-ips", get(admin::list_blocked_ips))
        .route("/api/blocked-ips/{ip}", delete(admin::unblock_ip))
        .route("/ws/logs", get(ws::ws_logs));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router.fallback(proxy::proxy_handler).with_state(state)
}
