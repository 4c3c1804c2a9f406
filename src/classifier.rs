//! Pattern Classifier: category assignment and confidence scoring
//! (§4.3) for candidate rules produced by the Pattern Extractors.

use crate::rule_store::{Category, Pattern, RuleCandidate};

/// Shape of the before/after diff a candidate rule was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    PureAddition,
    PureRemoval,
    Modification,
}

/// Inputs the confidence formula needs beyond the category itself.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInput {
    pub category: Category,
    pub diff_kind: DiffKind,
    pub nesting_depth: usize,
    pub pattern_source_len: usize,
}

fn base_weight(category: Category) -> f64 {
    match category {
        Category::JsxKeyProp | Category::Security => 0.95,
        Category::JsxComponent | Category::Accessibility => 0.875,
        Category::React19ForwardRef | Category::React19Refs | Category::ComponentConversion => {
            0.85
        }
        Category::Import
        | Category::TsconfigStrict
        | Category::TsconfigJsx
        | Category::TsconfigTarget
        | Category::TsconfigModule
        | Category::NextjsTurbopack
        | Category::NextjsImages
        | Category::NextjsDeprecated
        | Category::PackageScripts
        | Category::PackageAddDep
        | Category::PackageUpdateDep
        | Category::ComponentProps => 0.775,
        Category::Export | Category::Function | Category::Expression => 0.65,
    }
}

/// Step 1-5 of the confidence formula, clamped to [0.50, 0.95].
pub fn compute_confidence(input: ConfidenceInput) -> f64 {
    let mut score = base_weight(input.category);

    score += match input.diff_kind {
        DiffKind::PureAddition | DiffKind::PureRemoval => 0.10,
        DiffKind::Modification => 0.0,
    };

    if input.nesting_depth > 10 {
        score -= 0.15;
    } else if input.nesting_depth > 5 {
        score -= 0.10;
    }

    if input.pattern_source_len < 50 {
        score += 0.05;
    }

    score.clamp(0.50, 0.95)
}

/// Heuristic used by `validate` to reject patterns that would match
/// nearly everything (e.g. a bare `^` anchor).
fn is_overly_broad(pattern_source: &str) -> bool {
    matches!(pattern_source, "^" | "$" | "^$" | "" | ".*" | ".+")
}

/// Validate a candidate rule's fields per §4.3's acceptance criteria.
/// `pattern_source` is the regex body (or structural matcher text) only,
/// not the canonical `/body/flags` form.
pub fn validate(description: &str, pattern_source: &str, confidence: f64) -> Result<(), String> {
    if description.len() < 5 {
        return Err(format!(
            "description too short: {description:?} (need >= 5 chars)"
        ));
    }
    if !(0.50..=1.00).contains(&confidence) {
        return Err(format!("confidence {confidence} out of range [0.50, 1.00]"));
    }
    if pattern_source.is_empty() {
        return Err("pattern must not be empty".to_string());
    }
    if is_overly_broad(pattern_source) {
        return Err(format!("pattern {pattern_source:?} is overly broad"));
    }
    Ok(())
}

/// Validate a fully-built candidate, extracting its pattern source from
/// whichever variant it holds. Extractors call this before returning a
/// candidate to the Adaptive Layer (§4.4: "Only candidates passing
/// Classifier validation are returned").
pub fn validate_candidate(candidate: &RuleCandidate) -> Result<(), String> {
    let pattern_source = match &candidate.pattern {
        Pattern::Regex(r) => r.source.clone(),
        Pattern::Structural(s) => s.matcher.clone(),
    };
    validate(&candidate.description, &pattern_source, candidate.confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsx_key_prop_base_weight_is_critical() {
        let score = compute_confidence(ConfidenceInput {
            category: Category::JsxKeyProp,
            diff_kind: DiffKind::Modification,
            nesting_depth: 0,
            pattern_source_len: 100,
        });
        assert_eq!(score, 0.95);
    }

    #[test]
    fn test_pure_addition_bonus_applied() {
        let score = compute_confidence(ConfidenceInput {
            category: Category::Function,
            diff_kind: DiffKind::PureAddition,
            nesting_depth: 0,
            pattern_source_len: 100,
        });
        assert_eq!(score, 0.75);
    }

    #[test]
    fn test_short_pattern_bonus_applied() {
        let score = compute_confidence(ConfidenceInput {
            category: Category::Function,
            diff_kind: DiffKind::Modification,
            nesting_depth: 0,
            pattern_source_len: 10,
        });
        assert_eq!(score, 0.70);
    }

    #[test]
    fn test_deep_nesting_penalty() {
        let score = compute_confidence(ConfidenceInput {
            category: Category::JsxKeyProp,
            diff_kind: DiffKind::Modification,
            nesting_depth: 11,
            pattern_source_len: 100,
        });
        assert_eq!(score, 0.80);
    }

    #[test]
    fn test_clamped_to_095_maximum() {
        let score = compute_confidence(ConfidenceInput {
            category: Category::Security,
            diff_kind: DiffKind::PureAddition,
            nesting_depth: 0,
            pattern_source_len: 5,
        });
        assert_eq!(score, 0.95);
    }

    #[test]
    fn test_clamped_to_050_minimum() {
        let score = compute_confidence(ConfidenceInput {
            category: Category::Export,
            diff_kind: DiffKind::Modification,
            nesting_depth: 20,
            pattern_source_len: 100,
        });
        assert_eq!(score, 0.50);
    }

    #[test]
    fn test_validate_rejects_short_description() {
        assert!(validate("abc", "eval", 0.8).is_err());
    }

    #[test]
    fn test_validate_rejects_overly_broad_pattern() {
        assert!(validate("a fine description", "^", 0.8).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        assert!(validate("a fine description", "eval", 1.5).is_err());
    }

    #[test]
    fn test_validate_accepts_good_candidate() {
        assert!(validate("Enable TypeScript strict mode", r#""strict"\s*:\s*false"#, 0.9).is_ok());
    }
}
