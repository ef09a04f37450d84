//! Inspection engine: scores a normalized request against the enabled rules.
//!
//! The engine is a pure function over the rule set it is handed; it performs
//! no I/O and no caching, so toggling a rule is visible on the very next
//! request.

use std::borrow::Cow;

use crate::core::types::{Action, Inspection, Rule};

/// Percent-decode one corpus component, falling back to the raw text when the
/// encoding is malformed. Attackers routinely encode payloads
/// (`%20UNION%20SELECT`), so matching runs over the decoded view.
fn decode_component(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Build the inspection corpus: method, path, query and body joined by
/// newlines. Empty query and absent/empty body are skipped. Headers are
/// deliberately excluded to avoid false positives from values like
/// Content-Type.
pub fn build_corpus(method: &str, path: &str, query: &str, body: Option<&str>) -> String {
    let mut parts: Vec<Cow<'_, str>> = vec![Cow::Borrowed(method), decode_component(path)];
    if !query.is_empty() {
        parts.push(decode_component(query));
    }
    if let Some(body) = body
        && !body.is_empty()
    {
        parts.push(Cow::Borrowed(body));
    }
    parts.join("\n")
}

/// Score `corpus` against every enabled rule.
///
/// All rules are evaluated (no short-circuit); the score is the sum across
/// matching rules and the category tags are deduplicated in first-seen order.
/// A pattern that fails to compile is skipped; a bad rule must never take
/// the proxy down.
pub fn inspect_corpus(rules: &[Rule], corpus: &str, threshold: i32) -> Inspection {
    let mut threat_score = 0i32;
    let mut threat_types: Vec<String> = Vec::new();

    for rule in rules {
        let regex = match regex::RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => regex,
            Err(error) => {
                tracing::debug!(rule = %rule.name, %error, "skipping malformed rule pattern");
                continue;
            }
        };

        if regex.is_match(corpus) {
            threat_score += rule.score;
            if !threat_types.iter().any(|t| t == &rule.rule_type) {
                threat_types.push(rule.rule_type.clone());
            }
        }
    }

    let action = if threat_score >= threshold {
        Action::Block
    } else {
        Action::Allow
    };

    Inspection {
        threat_score,
        threat_types,
        action,
    }
}

/// Convenience wrapper: normalize the request triple and score it.
pub fn inspect(
    rules: &[Rule],
    method: &str,
    path: &str,
    query: &str,
    body: Option<&str>,
    threshold: i32,
) -> Inspection {
    let corpus = build_corpus(method, path, query, body);
    inspect_corpus(rules, &corpus, threshold)
}
