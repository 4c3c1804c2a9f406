//! Component Extractor: JSX/TSX before/after diffing for client directives,
//! `.map()` key props, accessibility attributes, and React 19 ref migrations.

use crate::ast::parse_module;
use crate::classifier::{ConfidenceInput, DiffKind, compute_confidence};
use crate::rule_store::{Category, Pattern, RegexPattern, Replacement, RuleCandidate};

use super::{diff_fragment, log};

fn nesting_depth(fragment: &str) -> usize {
    fragment
        .lines()
        .next()
        .map(|line| line.len() - line.trim_start().len())
        .unwrap_or(0)
        / 2
}

fn classify(before_fragment: &str, after_fragment: &str) -> Category {
    let added_directive = (before_fragment.contains("\"use client\"")
        || before_fragment.contains("'use client'"))
        != (after_fragment.contains("\"use client\"") || after_fragment.contains("'use client'"));
    if added_directive {
        return Category::ComponentConversion;
    }

    if !before_fragment.contains("key=") && after_fragment.contains("key=") {
        return Category::JsxKeyProp;
    }

    let has_aria_or_alt = |text: &str| text.contains("aria-") || text.contains("alt=");
    if !has_aria_or_alt(before_fragment) && has_aria_or_alt(after_fragment) {
        return Category::Accessibility;
    }

    if before_fragment.contains("forwardRef") && !after_fragment.contains("forwardRef") {
        return Category::React19ForwardRef;
    }
    if !before_fragment.contains("ref={") && after_fragment.contains("ref={") {
        return Category::React19Refs;
    }

    if !before_fragment.contains("import ") && after_fragment.contains("import ") {
        return Category::Import;
    }

    Category::ComponentProps
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

pub fn extract(before: &str, after: &str, file_path: &str, debug: bool) -> Vec<RuleCandidate> {
    if parse_module(before, file_path).is_err() || parse_module(after, file_path).is_err() {
        log(debug, "component-extractor", file_path, "skipped: failed to parse as JSX/TSX");
        return Vec::new();
    }

    let Some((before_fragment, after_fragment)) = diff_fragment(before, after) else {
        return Vec::new();
    };

    if before_fragment.trim().is_empty() {
        log(debug, "component-extractor", file_path, "skipped: pure-addition fragment has no literal anchor");
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
        Category::ComponentConversion => "Add missing client directive",
        Category::JsxKeyProp => "Add missing key prop inside list rendering",
        Category::Accessibility => "Add missing accessibility attribute",
        Category::React19ForwardRef => "Migrate away from forwardRef wrapper",
        Category::React19Refs => "Pass ref as a plain component prop",
        Category::Import => "Add missing import",
        _ => "Update component prop usage",
    };

    vec![RuleCandidate {
        pattern: Pattern::Regex(pattern),
        replacement: Replacement::Literal(after_fragment),
        description: description.to_string(),
        category,
        layer: 2,
        confidence,
        security: None,
        required_import: None,
    }]
}
