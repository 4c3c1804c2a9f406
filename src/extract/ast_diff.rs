//! Generic AST Diff Engine: before/after diffing for plain TS/JS files
//! (server actions, utilities, API routes) that aren't configuration or
//! component files. Emits rules for SSR guards, `console.*` neutralization,
//! wrapped calls/conditionals, added imports, and removal of dangerous
//! expressions.

use crate::ast::parse_module;
use crate::classifier::{ConfidenceInput, DiffKind, compute_confidence};
use crate::rule_store::{Category, Pattern, RegexPattern, Replacement, RuleCandidate};

use super::{diff_fragment, log};

fn classify(before_fragment: &str, after_fragment: &str) -> Category {
    let added_ssr_guard = !before_fragment.contains("typeof window")
        && after_fragment.contains("typeof window");
    if added_ssr_guard {
        return Category::Expression;
    }

    let neutralized_console =
        before_fragment.contains("console.") && !after_fragment.contains("console.");
    if neutralized_console {
        return Category::Function;
    }

    let removed_dangerous = ["eval(", "child_process", "new Function(", "dangerouslySetInnerHTML"]
        .iter()
        .any(|needle| before_fragment.contains(needle) && !after_fragment.contains(needle));
    if removed_dangerous {
        return Category::Security;
    }

    if !before_fragment.contains("import ") && after_fragment.contains("import ") {
        return Category::Import;
    }

    if !before_fragment.trim_start().starts_with("export")
        && after_fragment.trim_start().starts_with("export")
    {
        return Category::Export;
    }

    Category::Expression
}

fn diff_kind(before_fragment: &str, after_fragment: &str) -> DiffKind {
    if before_fragment.trim().is_empty() {
        DiffKind::PureAddition
    } else if after_fragment.trim().is_empty() {
        DiffKind::PureRemoval
    } else {
        DiffKind::Modification
    }
}

fn nesting_depth(fragment: &str) -> usize {
    fragment
        .lines()
        .next()
        .map(|line| line.len() - line.trim_start().len())
        .unwrap_or(0)
        / 2
}

pub fn extract(before: &str, after: &str, file_path: &str, debug: bool) -> Vec<RuleCandidate> {
    if parse_module(before, file_path).is_err() || parse_module(after, file_path).is_err() {
        log(debug, "ast-diff", file_path, "skipped: failed to parse as TS/JS");
        return Vec::new();
    }

    let Some((before_fragment, after_fragment)) = diff_fragment(before, after) else {
        return Vec::new();
    };

    if before_fragment.trim().is_empty() {
        log(debug, "ast-diff", file_path, "skipped: pure-addition fragment has no literal anchor");
        return Vec::new();
    }

    let category = classify(&before_fragment, &after_fragment);
    let confidence = compute_confidence(ConfidenceInput {
        category,
        diff_kind: diff_kind(&before_fragment, &after_fragment),
        nesting_depth: nesting_depth(&before_fragment),
        pattern_source_len: before_fragment.len(),
    });

    let Ok(pattern) = RegexPattern::new(&regex::escape(&before_fragment), "g") else {
        return Vec::new();
    };

    let description = match category {
        Category::Expression if after_fragment.contains("typeof window") => {
            "Guard browser-only access with an SSR check"
        }
        Category::Function => "Remove console statement",
        Category::Security => "Remove dangerous expression",
        Category::Import => "Add missing import",
        Category::Export => "Add missing export",
        _ => "Update expression",
    };

    vec![RuleCandidate {
        pattern: Pattern::Regex(pattern),
        replacement: Replacement::Literal(after_fragment),
        description: description.to_string(),
        category,
        layer: 3,
        confidence,
        security: None,
        required_import: None,
    }]
}
