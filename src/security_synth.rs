//! Security Rule Synthesizer (§4.5.1): turns Layer 8 findings into
//! persistable Rule Store entries.

use crate::rule_store::{Category, Pattern, RegexPattern, Replacement, RuleCandidate, SecurityMeta};
use crate::types::Finding;
use crate::types::Severity;

struct Signature {
    keyword: &'static str,
    pattern: &'static str,
    flags: &'static str,
    replacement: &'static str,
    description: &'static str,
}

const SIGNATURES: &[Signature] = &[
    Signature {
        keyword: "eval",
        pattern: r"\beval\s*\([^)]+\)",
        flags: "g",
        replacement: "/* SECURITY: eval() removed */",
        description: "Remove eval() call",
    },
    Signature {
        keyword: "innerhtml",
        pattern: r"\.innerHTML\s*=\s*[^;]+",
        flags: "g",
        replacement: ".textContent = /* SECURITY: innerHTML replaced */",
        description: "Replace innerHTML assignment with textContent",
    },
    Signature {
        keyword: "dangerouslysetinnerhtml",
        pattern: r"dangerouslySetInnerHTML\s*=\s*\{\s*\{[^}]+\}\s*\}",
        flags: "g",
        replacement: "/* SECURITY: removed */",
        description: "Remove dangerouslySetInnerHTML usage",
    },
    Signature {
        keyword: "hardcoded",
        pattern: r#"(?i)(password|secret|key|token|apikey|api_key)\s*[:=]\s*['"][^'"]+['"]"#,
        flags: "g",
        replacement: "$1: process.env.$1 /* SECURITY: moved to env var */",
        description: "Move hardcoded credential to an environment variable",
    },
    Signature {
        keyword: "exec",
        pattern: r"child_process\.(exec|execSync)\s*\([^)]+\)",
        flags: "g",
        replacement: "/* SECURITY: exec removed */",
        description: "Remove child_process exec call",
    },
    Signature {
        keyword: "command injection",
        pattern: r"child_process\.(exec|execSync)\s*\([^)]+\)",
        flags: "g",
        replacement: "/* SECURITY: exec removed */",
        description: "Remove child_process exec call",
    },
    Signature {
        keyword: "sql",
        pattern: r"`[^`]*\$\{[^}]*\}[^`]*`",
        flags: "g",
        replacement: "/* SECURITY: use parameterized queries */",
        description: "Replace interpolated SQL template literal",
    },
    Signature {
        keyword: "sql injection",
        pattern: r"`[^`]*\$\{[^}]*\}[^`]*`",
        flags: "g",
        replacement: "/* SECURITY: use parameterized queries */",
        description: "Replace interpolated SQL template literal",
    },
];

fn matching_signature(finding: &Finding) -> Option<&'static Signature> {
    let haystack = format!(
        "{} {}",
        finding.signature_id.to_lowercase(),
        finding.description.to_lowercase()
    );
    SIGNATURES.iter().find(|sig| haystack.contains(sig.keyword))
}

/// Synthesize a Rule Store candidate from a single finding. Only
/// `critical`/`high` severity findings become rules; anything else (and
/// any finding matching no known signature keyword) yields `None`.
pub fn synthesize(finding: &Finding) -> Option<RuleCandidate> {
    if !matches!(finding.severity, Severity::Critical | Severity::High) {
        return None;
    }

    if let Some(sig) = matching_signature(finding) {
        let pattern = RegexPattern::new(sig.pattern, sig.flags).ok()?;
        return Some(RuleCandidate {
            pattern: Pattern::Regex(pattern),
            replacement: Replacement::Literal(sig.replacement.to_string()),
            description: sig.description.to_string(),
            category: Category::Security,
            layer: 8,
            confidence: 0.95,
            security: Some(SecurityMeta {
                severity: finding.severity,
                signature_id: finding.signature_id.clone(),
            }),
            required_import: None,
        });
    }

    // No signature matched. Fall back to a generic, lower-confidence rule
    // anchored on the finding's own captured text, when that text is a
    // reasonable literal match target (neither a fragment too short to be
    // specific nor long enough to be a near-universal matcher).
    let captured = finding.matched.as_deref()?;
    if !(5..=200).contains(&captured.len()) {
        return None;
    }

    let pattern = RegexPattern::new(&regex::escape(captured), "g").ok()?;
    Some(RuleCandidate {
        pattern: Pattern::Regex(pattern),
        replacement: Replacement::Literal(format!(
            "/* SECURITY: {} */",
            finding.description
        )),
        description: format!("Neutralize finding: {}", finding.description),
        category: Category::Security,
        layer: 8,
        confidence: 0.85,
        security: Some(SecurityMeta {
            severity: finding.severity,
            signature_id: finding.signature_id.clone(),
        }),
        required_import: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(signature_id: &str, description: &str, severity: Severity) -> Finding {
        Finding {
            signature_id: signature_id.to_string(),
            description: description.to_string(),
            severity,
            line: 1,
            column: 1,
            context: None,
            matched: None,
        }
    }

    #[test]
    fn test_eval_signature_synthesizes_rule() {
        let f = finding("eval-usage", "eval detected", Severity::Critical);
        let candidate = synthesize(&f).unwrap();
        assert_eq!(candidate.confidence, 0.95);
        let Pattern::Regex(r) = &candidate.pattern else {
            panic!("expected regex");
        };
        assert!(r.compiled.is_match(r#"eval("1+1")"#));
    }

    #[test]
    fn test_low_severity_findings_are_ignored() {
        let f = finding("eval-usage", "eval detected", Severity::Medium);
        assert!(synthesize(&f).is_none());
    }

    #[test]
    fn test_innerhtml_signature_rewrites() {
        let f = finding("innerHTML-write", "unsafe innerHTML assignment", Severity::High);
        let candidate = synthesize(&f).unwrap();
        let Pattern::Regex(r) = &candidate.pattern else {
            panic!("expected regex");
        };
        let rewritten = r
            .compiled
            .replace_all("el.innerHTML = userInput;", candidate.replacement.as_str());
        assert!(rewritten.contains("textContent"));
    }

    #[test]
    fn test_hardcoded_signature_preserves_capture_group() {
        let f = finding("hardcoded-secret", "hardcoded credential", Severity::High);
        let candidate = synthesize(&f).unwrap();
        let Pattern::Regex(r) = &candidate.pattern else {
            panic!("expected regex");
        };
        let rewritten = r
            .compiled
            .replace_all(r#"password: "hunter2""#, candidate.replacement.as_str());
        assert!(rewritten.contains("process.env.password"));
    }

    #[test]
    fn test_generic_fallback_from_captured_match() {
        let mut f = finding("weird-signature", "unrecognized pattern", Severity::Critical);
        f.matched = Some("someDangerousCall(arg)".to_string());
        let candidate = synthesize(&f).unwrap();
        assert_eq!(candidate.confidence, 0.85);
    }

    #[test]
    fn test_unmatched_and_uncaptured_finding_yields_none() {
        let f = finding("weird-signature", "unrecognized pattern", Severity::Critical);
        assert!(synthesize(&f).is_none());
    }
}
