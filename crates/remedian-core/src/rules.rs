//! Rule-based static suggestion lookup.
//!
//! A pure fallback source of remediation text, consulted when the
//! predictive-service path degrades. Rules are regex patterns over the
//! alert description, grouped per category. No retry or circuit-breaker
//! semantics apply here.

use crate::types::AlertCategory;
use lazy_static::lazy_static;
use regex::Regex;

/// A single suggestion rule: pattern over alert text plus canned advice.
pub struct SuggestionRule {
    pub id: &'static str,
    pub pattern: Regex,
    pub suggestion: &'static str,
    /// How reliable this rule has historically been.
    pub confidence: f64,
}

fn rule(id: &'static str, pattern: &str, suggestion: &'static str, confidence: f64) -> SuggestionRule {
    SuggestionRule {
        id,
        // Patterns are static and reviewed; a bad one is a programmer error.
        pattern: Regex::new(&format!("(?i){pattern}")).unwrap(),
        suggestion,
        confidence,
    }
}

lazy_static! {
    static ref CI_FAILURE_RULES: Vec<SuggestionRule> = vec![
        rule(
            "ci_assertion",
            r"assertion\s*error|assert.*failed|test.*failed",
            "Review test expectations and verify the actual output matches expected values.",
            0.95,
        ),
        rule(
            "ci_build",
            r"compilation failed|syntax\s*error|import\s*error|module.*not\s*found",
            "The build failed to compile. Check the error message for syntax issues or missing imports.",
            0.98,
        ),
        rule(
            "ci_timeout",
            r"timeout|exceeded.*time|operation.*timed out",
            "An operation exceeded its time limit. Profile the slow path or raise the timeout.",
            0.92,
        ),
        rule(
            "ci_dependency",
            r"version conflict|dependency.*mismatch|incompatible.*version",
            "Dependency versions conflict. Update the version constraints and re-run the dependency check.",
            0.88,
        ),
    ];

    static ref SECURITY_RULES: Vec<SuggestionRule> = vec![
        rule(
            "sec_phishing",
            r"phishing|suspicious.*email|verify.*account|confirm.*password",
            "Likely phishing. Do not follow links or provide credentials; report to the security team.",
            0.85,
        ),
        rule(
            "sec_malware",
            r"malware|suspicious.*file|virus.*detected|quarantine",
            "Possible malware. Isolate the file, run a full scan, and review access logs.",
            0.96,
        ),
        rule(
            "sec_social",
            r"urgent action|verify identity|confirm details|claim.*reward",
            "Possible social engineering. Verify through official channels before acting.",
            0.80,
        ),
        rule(
            "sec_scam",
            r"financial.*offer|lottery.*winner|prize|wire.*transfer|urgent.*payment",
            "Likely scam. Do not send money or personal information; block and report the sender.",
            0.93,
        ),
    ];
}

fn rules_for(category: AlertCategory) -> &'static [SuggestionRule] {
    match category {
        AlertCategory::CiFailure => &CI_FAILURE_RULES,
        AlertCategory::SpamIncident
        | AlertCategory::ScamIncident
        | AlertCategory::SecurityAlert => &SECURITY_RULES,
    }
}

/// Look up static remediation suggestions for an alert.
///
/// Returns suggestion text for every rule whose pattern matches `context`,
/// ordered by descending rule confidence. Empty when nothing matches.
pub fn lookup_suggestions(category: AlertCategory, context: &str) -> Vec<String> {
    let mut matched: Vec<&SuggestionRule> = rules_for(category)
        .iter()
        .filter(|r| r.pattern.is_match(context))
        .collect();
    matched.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matched.iter().map(|r| r.suggestion.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_assertion_rule_matches() {
        let suggestions = lookup_suggestions(
            AlertCategory::CiFailure,
            "pipeline 42: AssertionError in test_login",
        );
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].contains("test expectations"));
    }

    #[test]
    fn test_security_rules_apply_to_scam_category() {
        let suggestions = lookup_suggestions(
            AlertCategory::ScamIncident,
            "Urgent payment required to release your lottery winner prize",
        );
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("scam"));
    }

    #[test]
    fn test_no_match_returns_empty() {
        let suggestions = lookup_suggestions(AlertCategory::CiFailure, "all green");
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_ordering_by_confidence() {
        // Matches both the build rule (0.98) and the timeout rule (0.92).
        let suggestions = lookup_suggestions(
            AlertCategory::CiFailure,
            "compilation failed after operation timed out",
        );
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions[0].contains("compile"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let suggestions =
            lookup_suggestions(AlertCategory::SecurityAlert, "PHISHING attempt observed");
        assert_eq!(suggestions.len(), 1);
    }
}
