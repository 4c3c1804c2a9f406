//! Pattern Extractors (§4.4): before/after diff analyzers that produce
//! candidate rules, dispatched by detected file type.

mod ast_diff;
mod component_extractor;
mod config_extractor;

use crate::rule_store::RuleCandidate;

/// Which extractor a file's content signature selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Tsconfig,
    NextConfig,
    PackageJson,
    Component,
    Generic,
}

/// Detect the extractor target by file name and content signature, per
/// §4.4's Configuration Extractor detection rule.
pub fn detect_file_kind(file_path: &str, content: &str) -> FileKind {
    let name = file_path.rsplit('/').next().unwrap_or(file_path);

    if name == "tsconfig.json" || (name.ends_with(".json") && content.contains("compilerOptions"))
    {
        return FileKind::Tsconfig;
    }
    if name.starts_with("next.config") {
        return FileKind::NextConfig;
    }
    if name == "package.json" {
        return FileKind::PackageJson;
    }
    if name.ends_with(".jsx") || name.ends_with(".tsx") {
        return FileKind::Component;
    }
    FileKind::Generic
}

/// Run the extractor selected by `file_path`/`before`'s content
/// signature, returning only candidates that pass classifier validation.
/// Parse failures are swallowed (an empty list is returned); the
/// `debug` flag controls whether a diagnostic is written to stderr,
/// matching `NEUROLINT_DEBUG`.
pub fn extract(before: &str, after: &str, file_path: &str, debug: bool) -> Vec<RuleCandidate> {
    if before == after {
        return Vec::new();
    }

    let kind = detect_file_kind(file_path, before);
    let candidates = match kind {
        FileKind::Tsconfig | FileKind::NextConfig | FileKind::PackageJson => {
            config_extractor::extract(before, after, kind, file_path, debug)
        }
        FileKind::Component => component_extractor::extract(before, after, file_path, debug),
        FileKind::Generic => ast_diff::extract(before, after, file_path, debug),
    };

    candidates
        .into_iter()
        .filter(|c| crate::classifier::validate_candidate(c).is_ok())
        .collect()
}

fn debug_log(debug: bool, extractor: &str, file_path: &str, message: &str) {
    if debug {
        eprintln!("[neurolint:{extractor}] {file_path}: {message}");
    }
}

pub(crate) use debug_log as log;

/// Find the smallest changed region between `before` and `after` by
/// trimming their common leading and trailing lines. Returns `None` when
/// the texts are identical. A single file is expected to carry one
/// coherent change per extractor invocation (one layer's transform of one
/// file), so a prefix/suffix trim is enough to isolate it.
pub(crate) fn diff_fragment(before: &str, after: &str) -> Option<(String, String)> {
    if before == after {
        return None;
    }

    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();

    let mut prefix = 0;
    while prefix < before_lines.len()
        && prefix < after_lines.len()
        && before_lines[prefix] == after_lines[prefix]
    {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < before_lines.len() - prefix
        && suffix < after_lines.len() - prefix
        && before_lines[before_lines.len() - 1 - suffix] == after_lines[after_lines.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let before_mid = before_lines[prefix..before_lines.len() - suffix].join("\n");
    let after_mid = after_lines[prefix..after_lines.len() - suffix].join("\n");
    Some((before_mid, after_mid))
}
