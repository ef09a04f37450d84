//! The default rule set applied on first boot.
//!
//! Patterns are matched case-insensitively against the inspection corpus
//! (method + path + query + body). The regex strings are part of the external
//! contract and must not be reworded.

/// One default rule, inserted verbatim when the rules table is empty.
#[derive(Debug, Clone, Copy)]
pub struct SeedRule {
    pub name: &'static str,
    pub rule_type: &'static str,
    pub pattern: &'static str,
    pub score: i32,
    pub action: &'static str,
}

pub const DEFAULT_RULES: &[SeedRule] = &[
    // SQL injection
    SeedRule {
        name: "SQLi – UNION SELECT",
        rule_type: "SQLi",
        pattern: r"union\s+(all\s+)?select",
        score: 60,
        action: "block",
    },
    SeedRule {
        name: "SQLi – Tautology (OR 1=1)",
        rule_type: "SQLi",
        pattern: r#"\b(or|and)\b\s+[\w'"]+\s*=\s*[\w'"]+"#,
        score: 40,
        action: "block",
    },
    SeedRule {
        name: "SQLi – Inline Comment",
        rule_type: "SQLi",
        pattern: r"(--|#|/\*|\*/)",
        score: 20,
        action: "log",
    },
    SeedRule {
        name: "SQLi – Stacked Queries",
        rule_type: "SQLi",
        pattern: r";\s*(select|insert|update|delete|drop|exec)",
        score: 60,
        action: "block",
    },
    // Cross-site scripting
    SeedRule {
        name: "XSS – Script Tag",
        rule_type: "XSS",
        pattern: r"<\s*script[^>]*>",
        score: 60,
        action: "block",
    },
    SeedRule {
        name: "XSS – Inline Event Handler",
        rule_type: "XSS",
        pattern: r"\bon(load|error|click|mouseover|focus|blur|submit|keydown|keyup)\s*=",
        score: 50,
        action: "block",
    },
    SeedRule {
        name: "XSS – javascript: Protocol",
        rule_type: "XSS",
        pattern: r"javascript\s*:",
        score: 50,
        action: "block",
    },
    // Path traversal
    SeedRule {
        name: "Path Traversal – Dot-Dot Slash",
        rule_type: "PathTraversal",
        pattern: r"(\.\./|\.\.\\|%2e%2e%2f|%2e%2e%5c|\.\.%2f|\.\.%5c)",
        score: 50,
        action: "block",
    },
    SeedRule {
        name: "Path Traversal – Sensitive Files",
        rule_type: "PathTraversal",
        pattern: r"(etc/passwd|etc/shadow|proc/self|win\.ini|system32)",
        score: 70,
        action: "block",
    },
    // Command injection
    SeedRule {
        name: "CmdInjection – Shell Metacharacters",
        rule_type: "CmdInjection",
        pattern: r"[;&|`$]\s*(ls|cat|id|whoami|uname|curl|wget|bash|sh|cmd|powershell)",
        score: 70,
        action: "block",
    },
    SeedRule {
        name: "CmdInjection – Subshell",
        rule_type: "CmdInjection",
        pattern: r"(\$\(|\`)[^)]*[)|\`]",
        score: 60,
        action: "block",
    },
    // SSRF
    SeedRule {
        name: "SSRF – Internal Address",
        rule_type: "SSRF",
        pattern: r"(https?://)?(localhost|127\.0\.0\.1|0\.0\.0\.0|169\.254\.|10\.\d+\.\d+\.\d+|172\.(1[6-9]|2\d|3[01])\.\d+\.\d+|192\.168\.)",
        score: 40,
        action: "log",
    },
];

#[cfg(test)]
mod tests {
    use regex::RegexBuilder;

    use super::*;

    #[test]
    fn every_default_pattern_compiles() {
        for rule in DEFAULT_RULES {
            RegexBuilder::new(rule.pattern)
                .case_insensitive(true)
                .build()
                .unwrap_or_else(|e| panic!("pattern for '{}' failed to compile: {e}", rule.name));
        }
    }

    #[test]
    fn default_scores_and_actions_are_sane() {
        for rule in DEFAULT_RULES {
            assert!(rule.score >= 0, "{} has a negative score", rule.name);
            assert!(
                rule.action == "block" || rule.action == "log",
                "{} has unknown action {}",
                rule.name,
                rule.action
            );
        }
    }

    #[test]
    fn categories_cover_the_usual_suspects() {
        let types: Vec<&str> = DEFAULT_RULES.iter().map(|r| r.rule_type).collect();
        for expected in ["SQLi", "XSS", "PathTraversal", "CmdInjection", "SSRF"] {
            assert!(types.contains(&expected), "missing category {expected}");
        }
    }
}
