// Integration tests for the decision pipeline over in-memory stores.

mod common;

use std::sync::atomic::Ordering;

use common::{harness_with, seeded_harness, seeded_rules};
use warden::core::{Decision, InboundRequest};

fn inbound(ip: &str, method: &str, path: &str, query: &str, body: Option<&str>) -> InboundRequest {
    InboundRequest {
        ip: ip.to_string(),
        method: method.to_string(),
        path: path.to_string(),
        query: query.to_string(),
        headers: serde_json::json!({}),
        body_text: body.map(str::to_string),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn union_select_is_blocked_and_logged() {
    let harness = seeded_harness();
    let req = inbound("1.2.3.4", "GET", "/users", "id=1%20UNION%20SELECT%201,2,3", None);

    let decision = harness.pipeline.evaluate(&req).await.unwrap();
    assert_eq!(
        decision,
        Decision::RuleBlocked {
            threat_types: vec!["SQLi".to_string()],
        }
    );

    let log = harness.logs.last().expect("log row written");
    assert_eq!(log.ip_address, "1.2.3.4");
    assert_eq!(log.endpoint, "/users");
    assert_eq!(log.threat_score, 60);
    assert_eq!(log.action_taken, "block");
    assert_eq!(log.threat_types.as_deref(), Some(&["SQLi".to_string()][..]));
}

#[tokio::test(flavor = "multi_thread")]
async fn clean_request_is_allowed_with_zero_score() {
    let harness = seeded_harness();
    let req = inbound("5.6.7.8", "GET", "/ping", "", None);

    let decision = harness.pipeline.evaluate(&req).await.unwrap();
    assert_eq!(decision, Decision::Allowed);

    let log = harness.logs.last().expect("log row written");
    assert_eq!(log.threat_score, 0);
    assert_eq!(log.action_taken, "allow");
    assert_eq!(log.threat_types.as_deref(), Some(&[][..]));
}

#[tokio::test(flavor = "multi_thread")]
async fn soft_block_short_circuits_before_rules() {
    let harness = seeded_harness();
    harness.soft.block("9.9.9.9");

    // A payload that would also trip the rules; the blocklist wins.
    let req = inbound("9.9.9.9", "GET", "/users", "id=1 UNION SELECT 1", None);
    let decision = harness.pipeline.evaluate(&req).await.unwrap();
    assert_eq!(decision, Decision::IpBlocked);

    let log = harness.logs.last().expect("log row written");
    assert_eq!(log.threat_score, 100);
    assert_eq!(log.action_taken, "block");
    assert_eq!(
        log.threat_types.as_deref(),
        Some(&["IP_BLOCKED".to_string()][..])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn hard_block_applies_when_soft_misses() {
    let harness = seeded_harness();
    harness.hard.block("10.0.0.7");

    let decision = harness
        .pipeline
        .evaluate(&inbound("10.0.0.7", "GET", "/ping", "", None))
        .await
        .unwrap();
    assert_eq!(decision, Decision::IpBlocked);
    assert_eq!(harness.logs.last().unwrap().threat_score, 100);
}

#[tokio::test(flavor = "multi_thread")]
async fn soft_store_outage_fails_open() {
    let harness = seeded_harness();
    harness.soft.block("9.9.9.9");
    harness.soft.fail.store(true, Ordering::Relaxed);

    let decision = harness
        .pipeline
        .evaluate(&inbound("9.9.9.9", "GET", "/ping", "", None))
        .await
        .unwrap();
    // The entry exists but the store is down: treat as not blocked.
    assert_eq!(decision, Decision::Allowed);
    assert_eq!(harness.logs.last().unwrap().action_taken, "allow");
}

#[tokio::test(flavor = "multi_thread")]
async fn hard_store_outage_fails_the_request() {
    let harness = seeded_harness();
    harness.hard.fail.store(true, Ordering::Relaxed);

    let result = harness
        .pipeline
        .evaluate(&inbound("1.2.3.4", "GET", "/ping", "", None))
        .await;
    assert!(result.is_err());
    assert_eq!(harness.logs.len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn log_write_failure_does_not_change_the_decision() {
    let harness = seeded_harness();
    harness.logs.fail.store(true, Ordering::Relaxed);

    let decision = harness
        .pipeline
        .evaluate(&inbound("1.2.3.4", "GET", "/users", "id=1 UNION SELECT 1", None))
        .await
        .unwrap();
    assert_eq!(
        decision,
        Decision::RuleBlocked {
            threat_types: vec!["SQLi".to_string()],
        }
    );
    assert_eq!(harness.logs.len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn every_decision_publishes_a_realtime_event() {
    let harness = seeded_harness();
    let (_id, mut events) = harness.fanout.attach();

    harness
        .pipeline
        .evaluate(&inbound("1.2.3.4", "POST", "/comment", "", Some("<script>alert(1)</script>")))
        .await
        .unwrap();

    let event = events.recv().await.expect("event published");
    let parsed: serde_json::Value = serde_json::from_str(&event).unwrap();
    assert_eq!(parsed["type"], "new_log");
    assert_eq!(parsed["data"]["method"], "POST");
    assert_eq!(parsed["data"]["endpoint"], "/comment");
    assert_eq!(parsed["data"]["action_taken"], "block");
    assert!(parsed["data"]["threat_score"].as_i64().unwrap() >= 60);
}

#[tokio::test(flavor = "multi_thread")]
async fn toggling_a_rule_off_is_visible_on_the_next_request() {
    let harness = seeded_harness();
    let req = inbound("1.2.3.4", "GET", "/users", "id=1 UNION SELECT 1", None);

    let before = harness.pipeline.evaluate(&req).await.unwrap();
    assert!(matches!(before, Decision::RuleBlocked { .. }));

    let union_rule_id = {
        let rules = harness.rules.rules.lock().unwrap();
        rules
            .iter()
            .find(|r| r.name.contains("UNION"))
            .map(|r| r.id)
            .unwrap()
    };
    use warden::ports::RuleStore;
    harness.rules.toggle(union_rule_id).await.unwrap();

    let after = harness.pipeline.evaluate(&req).await.unwrap();
    assert_eq!(after, Decision::Allowed);
}

#[tokio::test(flavor = "multi_thread")]
async fn ipv6_addresses_round_trip_through_logs_and_blocklist() {
    let harness = seeded_harness();
    let ip = "2001:db8::dead:beef";
    harness.hard.block(ip);

    let decision = harness
        .pipeline
        .evaluate(&inbound(ip, "GET", "/ping", "", None))
        .await
        .unwrap();
    assert_eq!(decision, Decision::IpBlocked);
    assert_eq!(harness.logs.last().unwrap().ip_address, ip);
}

#[tokio::test(flavor = "multi_thread")]
async fn threshold_is_respected() {
    // Same request, higher threshold: allow instead of block.
    let strict = harness_with(seeded_rules(), 50);
    let lax = harness_with(seeded_rules(), 500);
    let req = inbound("1.2.3.4", "GET", "/users", "id=1 UNION SELECT 1", None);

    assert!(matches!(
        strict.pipeline.evaluate(&req).await.unwrap(),
        Decision::RuleBlocked { .. }
    ));
    assert_eq!(lax.pipeline.evaluate(&req).await.unwrap(), Decision::Allowed);

    // Both log the same score regardless of the verdict.
    assert_eq!(strict.logs.last().unwrap().threat_score, 60);
    assert_eq!(lax.logs.last().unwrap().threat_score, 60);
}
