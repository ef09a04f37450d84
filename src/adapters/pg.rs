//! Postgres-backed stores for rules, attack logs, and the hard blocklist.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    core::{
        seed::SeedRule,
        types::{AttackLog, BlockedIp, HourlyCount, IpCount, NewAttackLog, Rule, ThreatCount, TrafficStats},
    },
    ports::{AttackLogStore, HardBlocklist, RuleStore, StoreError},
};

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Database(error.to_string())
    }
}

const RULE_COLUMNS: &str = "id, name, type, pattern, score, action, enabled, created_at";
const LOG_COLUMNS: &str = "id, ip_address, method, endpoint, headers, request_body, threat_score, action_taken, threat_types, created_at";

pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn list_enabled(&self) -> Result<Vec<Rule>, StoreError> {
        let rules = sqlx::query_as::<_, Rule>(&format!(
            "SELECT {RULE_COLUMNS} FROM waf_rules WHERE enabled ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rules)
    }

    async fn list_all(&self) -> Result<Vec<Rule>, StoreError> {
        let rules = sqlx::query_as::<_, Rule>(&format!(
            "SELECT {RULE_COLUMNS} FROM waf_rules ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rules)
    }

    async fn toggle(&self, id: Uuid) -> Result<Option<Rule>, StoreError> {
        let rule = sqlx::query_as::<_, Rule>(&format!(
            "UPDATE waf_rules SET enabled = NOT enabled WHERE id = $1 RETURNING {RULE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rule)
    }

    async fn seed_if_empty(&self, defaults: &[SeedRule]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waf_rules")
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        for rule in defaults {
            sqlx::query(
                "INSERT INTO waf_rules (id, name, type, pattern, score, action, enabled) \
                 VALUES ($1, $2, $3, $4, $5, $6, TRUE)",
            )
            .bind(Uuid::new_v4())
            .bind(rule.name)
            .bind(rule.rule_type)
            .bind(rule.pattern)
            .bind(rule.score)
            .bind(rule.action)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(defaults.len() as u64)
    }
}

pub struct PgHardBlocklist {
    pool: PgPool,
}

impl PgHardBlocklist {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HardBlocklist for PgHardBlocklist {
    async fn is_blocked(&self, ip: &str) -> Result<bool, StoreError> {
        // Expired rows are non-blocking; they stay visible in list() until
        // an operator removes them.
        let blocked: bool = sqlx::query_scalar(
            "SELECT EXISTS( \
                 SELECT 1 FROM blocked_ips \
                 WHERE ip_address = $1 \
                   AND (expires_at IS NULL OR expires_at > now()))",
        )
        .bind(ip)
        .fetch_one(&self.pool)
        .await?;
        Ok(blocked)
    }

    async fn list(&self) -> Result<Vec<BlockedIp>, StoreError> {
        let ips = sqlx::query_as::<_, BlockedIp>(
            "SELECT id, ip_address, reason, expires_at, created_at \
             FROM blocked_ips ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ips)
    }

    async fn remove(&self, ip: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blocked_ips WHERE ip_address = $1")
            .bind(ip)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct PgAttackLogStore {
    pool: PgPool,
}

impl PgAttackLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttackLogStore for PgAttackLogStore {
    async fn insert(&self, entry: NewAttackLog) -> Result<AttackLog, StoreError> {
        let log = sqlx::query_as::<_, AttackLog>(&format!(
            "INSERT INTO attack_logs \
                 (id, ip_address, method, endpoint, headers, request_body, \
                  threat_score, action_taken, threat_types) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {LOG_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&entry.ip_address)
        .bind(&entry.method)
        .bind(&entry.endpoint)
        .bind(&entry.headers)
        .bind(&entry.request_body)
        .bind(entry.threat_score)
        .bind(entry.action_taken.as_str())
        .bind(&entry.threat_types)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AttackLog>, StoreError> {
        let logs = sqlx::query_as::<_, AttackLog>(&format!(
            "SELECT {LOG_COLUMNS} FROM attack_logs \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn stats(&self) -> Result<TrafficStats, StoreError> {
        let total_requests: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attack_logs")
            .fetch_one(&self.pool)
            .await?;
        let blocked_requests: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attack_logs WHERE action_taken = 'block'")
                .fetch_one(&self.pool)
                .await?;
        let allowed_requests: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM attack_logs WHERE action_taken = 'allow'")
                .fetch_one(&self.pool)
                .await?;

        let top_ips: Vec<(String, i64)> = sqlx::query_as(
            "SELECT ip_address, COUNT(*) AS count FROM attack_logs \
             GROUP BY ip_address ORDER BY count DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;

        let threat_distribution: Vec<(String, i64)> = sqlx::query_as(
            "SELECT t AS threat_type, COUNT(*) AS count \
             FROM attack_logs CROSS JOIN LATERAL unnest(threat_types) AS t \
             GROUP BY t ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let hourly: Vec<(chrono::DateTime<chrono::Utc>, i64)> = sqlx::query_as(
            "SELECT date_trunc('hour', created_at) AS hour, COUNT(*) AS count \
             FROM attack_logs \
             WHERE created_at >= now() - INTERVAL '24 hours' \
             GROUP BY hour ORDER BY hour",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(TrafficStats {
            total_requests,
            blocked_requests,
            allowed_requests,
            top_ips: top_ips
                .into_iter()
                .map(|(ip, count)| IpCount { ip, count })
                .collect(),
            threat_distribution: threat_distribution
                .into_iter()
                .map(|(threat_type, count)| ThreatCount { threat_type, count })
                .collect(),
            requests_over_time: hourly
                .into_iter()
                .map(|(hour, count)| HourlyCount {
                    hour: hour.format("%H:%M").to_string(),
                    count,
                })
                .collect(),
        })
    }
}
