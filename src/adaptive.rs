//! Adaptive Pattern-Learning Layer (§4.5, Layer 7).
//!
//! Two independent responsibilities: learning new rules from what earlier
//! layers changed (or flagged) in this run, and applying the accumulated
//! Rule Store against the current text.

use crate::extract;
use crate::rule_store::RuleStore;
use crate::security_synth;
use crate::types::{Change, ChangeKind, LayerResult, ResultEvent};

/// Learn from every previous layer's result for this file: a successful
/// mutation is handed to the Pattern Extractors, and any security
/// findings are handed to the Security Rule Synthesizer. Returns one
/// `ResultEvent::Learn` per rule registered (new or re-observed).
pub fn learn(
    rule_store: &mut RuleStore,
    file_path: &str,
    previous_results: &[LayerResult],
    debug: bool,
) -> Vec<ResultEvent> {
    let mut learned = Vec::new();

    for result in previous_results {
        if result.success && result.change_count > 0 {
            for candidate in extract::extract(&result.original_code, &result.code, file_path, debug) {
                let description = candidate.description.clone();
                rule_store.add(candidate);
                learned.push(ResultEvent::Learn { description });
            }
        }

        for finding in &result.security_findings {
            if let Some(candidate) = security_synth::synthesize(finding) {
                let description = candidate.description.clone();
                rule_store.add(candidate);
                learned.push(ResultEvent::Learn { description });
            }
        }
    }

    learned
}

/// Rules at or above `threshold` whose pattern already matches `text` but
/// were not applied (because they belong to another confidence band or
/// the caller wants a preview) are exposed as advisory `Change`s — they
/// are never counted in `change_count` since nothing in `text` actually
/// changes because of them.
fn advisory_suggestions(rule_store: &RuleStore, text: &str, threshold: f64) -> Vec<Change> {
    rule_store
        .rules()
        .iter()
        .filter(|rule| rule.confidence < threshold)
        .filter_map(|rule| match &rule.pattern {
            crate::rule_store::Pattern::Regex(r) if r.compiled.is_match(text) => Some(Change {
                kind: ChangeKind::Advisory,
                description: rule.description.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Apply every rule in `rule_store` at or above `threshold` to `text`,
/// then surface lower-confidence matching rules as advisory suggestions.
pub fn apply(rule_store: &RuleStore, text: &str, threshold: f64, layer_id: u32) -> LayerResult {
    if text.is_empty() {
        return LayerResult::empty_input(layer_id);
    }

    let (new_text, applied_descriptions) = rule_store.apply(text, threshold);
    let advisories = advisory_suggestions(rule_store, text, threshold);

    if applied_descriptions.is_empty() && advisories.is_empty() {
        return LayerResult::unchanged(layer_id, text);
    }

    let mut results: Vec<ResultEvent> = applied_descriptions
        .iter()
        .map(|d| ResultEvent::Apply {
            description: d.clone(),
        })
        .collect();
    if results.is_empty() {
        results.push(ResultEvent::Empty);
    }

    let mut changes: Vec<Change> = applied_descriptions
        .iter()
        .map(|d| Change {
            kind: ChangeKind::Apply,
            description: d.clone(),
        })
        .collect();
    changes.extend(advisories);

    LayerResult {
        success: true,
        code: new_text,
        original_code: text.to_string(),
        change_count: applied_descriptions.len(),
        results,
        changes,
        error: None,
        layer_id,
        security_findings: Vec::new(),
    }
}
