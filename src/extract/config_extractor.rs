//! Configuration Extractor: tsconfig / next.config / package.json diffing.

use regex::Regex;
use serde_json::Value;

use super::{FileKind, log};
use crate::rule_store::{Category, Pattern, RegexPattern, Replacement, RuleCandidate};

pub fn extract(
    before: &str,
    after: &str,
    kind: FileKind,
    file_path: &str,
    debug: bool,
) -> Vec<RuleCandidate> {
    match kind {
        FileKind::Tsconfig => extract_tsconfig(before, after, file_path, debug),
        FileKind::PackageJson => extract_package_json(before, after, file_path, debug),
        FileKind::NextConfig => extract_next_config(before, after),
        _ => Vec::new(),
    }
}

/// Strip `//` line comments and `/* */` block comments so JSON-with-
/// comments files (tsconfig.json) parse as plain JSON. Comments inside
/// string literals are left alone.
fn strip_jsonc_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn parse_json(content: &str) -> Option<Value> {
    serde_json::from_str(&strip_jsonc_comments(content)).ok()
}

fn literal_rule(
    description: &'static str,
    pattern_source: String,
    replacement: String,
    category: Category,
) -> Option<RuleCandidate> {
    make_rule(description, pattern_source, Replacement::Literal(replacement), category)
}

/// Like [`literal_rule`] but for replacements that reference capture
/// groups (`$1`) from `pattern_source`, used when a rule must preserve
/// part of the matched text rather than replace it wholesale.
fn template_rule(
    description: &'static str,
    pattern_source: String,
    replacement: String,
    category: Category,
) -> Option<RuleCandidate> {
    make_rule(description, pattern_source, Replacement::Template(replacement), category)
}

fn make_rule(
    description: &'static str,
    pattern_source: String,
    replacement: Replacement,
    category: Category,
) -> Option<RuleCandidate> {
    let pattern = RegexPattern::new(&pattern_source, "g").ok()?;
    Some(RuleCandidate {
        pattern: Pattern::Regex(pattern),
        replacement,
        description: description.to_string(),
        category,
        layer: 1,
        confidence: 0.80,
        security: None,
        required_import: None,
    })
}

fn extract_tsconfig(before: &str, after: &str, file_path: &str, debug: bool) -> Vec<RuleCandidate> {
    let (Some(before_json), Some(after_json)) = (parse_json(before), parse_json(after)) else {
        log(debug, "config-extractor", file_path, "non-JSON tsconfig, skipped");
        return Vec::new();
    };

    let before_opts = before_json.get("compilerOptions");
    let after_opts = after_json.get("compilerOptions");
    let (Some(before_opts), Some(after_opts)) = (before_opts, after_opts) else {
        return Vec::new();
    };

    let mut candidates = Vec::new();

    if before_opts.get("strict") == Some(&Value::Bool(false))
        && after_opts.get("strict") == Some(&Value::Bool(true))
    {
        candidates.extend(literal_rule(
            "Enable TypeScript strict mode",
            r#""strict"\s*:\s*false"#.to_string(),
            r#""strict": true"#.to_string(),
            Category::TsconfigStrict,
        ));
    }

    if let (Some(Value::String(b)), Some(Value::String(a))) =
        (before_opts.get("jsx"), after_opts.get("jsx"))
        && b != a
    {
        candidates.extend(literal_rule(
            "Update TypeScript JSX transform",
            format!(r#""jsx"\s*:\s*"{}""#, regex::escape(b)),
            format!(r#""jsx": "{a}""#),
            Category::TsconfigJsx,
        ));
    }

    if let (Some(Value::String(b)), Some(Value::String(a))) =
        (before_opts.get("target"), after_opts.get("target"))
        && b != a
    {
        candidates.extend(literal_rule(
            "Update TypeScript compilation target",
            format!(r#""target"\s*:\s*"{}""#, regex::escape(b)),
            format!(r#""target": "{a}""#),
            Category::TsconfigTarget,
        ));
    }

    if let (Some(Value::String(b)), Some(Value::String(a))) =
        (before_opts.get("module"), after_opts.get("module"))
        && b != a
    {
        candidates.extend(literal_rule(
            "Update TypeScript module system",
            format!(r#""module"\s*:\s*"{}""#, regex::escape(b)),
            format!(r#""module": "{a}""#),
            Category::TsconfigModule,
        ));
    }

    candidates
}

fn extract_package_json(
    before: &str,
    after: &str,
    file_path: &str,
    debug: bool,
) -> Vec<RuleCandidate> {
    let (Some(before_json), Some(after_json)) = (parse_json(before), parse_json(after)) else {
        log(debug, "config-extractor", file_path, "non-JSON package.json, skipped");
        return Vec::new();
    };

    let mut candidates = Vec::new();

    if let Some(Value::Object(after_scripts)) = after_json.get("scripts") {
        let before_scripts = before_json
            .get("scripts")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (name, value) in after_scripts {
            let Some(command) = value.as_str() else {
                continue;
            };
            if !before_scripts.contains_key(name) {
                candidates.extend(template_rule(
                    "Add package script",
                    r#""scripts"\s*:\s*\{([^}]*)\}"#.to_string(),
                    format!(r#""scripts": {{$1, "{name}": "{command}"}}"#),
                    Category::PackageScripts,
                ));
            }
        }
    }

    for dep_field in ["dependencies", "devDependencies"] {
        let Some(Value::Object(after_deps)) = after_json.get(dep_field) else {
            continue;
        };
        let before_deps = before_json
            .get(dep_field)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        for (name, after_version) in after_deps {
            let Some(after_version) = after_version.as_str() else {
                continue;
            };
            match before_deps.get(name).and_then(Value::as_str) {
                None => candidates.extend(template_rule(
                    "Add dependency",
                    format!(r#""{dep_field}"\s*:\s*\{{([^}}]*)\}}"#),
                    format!(r#""{dep_field}": {{$1, "{name}": "{after_version}"}}"#),
                    Category::PackageAddDep,
                )),
                Some(before_version) if before_version != after_version => {
                    candidates.extend(literal_rule(
                        "Update dependency version",
                        format!(r#""{}"\s*:\s*"{}""#, regex::escape(name), regex::escape(before_version)),
                        format!(r#""{name}": "{after_version}""#),
                        Category::PackageUpdateDep,
                    ));
                }
                _ => {}
            }
        }
    }

    candidates
}

/// `next.config.js` is a JS module, not JSON; we can't safely reparse and
/// diff it structurally without a JS evaluator, so this extractor looks
/// for well-known textual signatures instead (new Turbopack/image blocks,
/// removed deprecated flags) and emits advisory-strength rules.
fn extract_next_config(before: &str, after: &str) -> Vec<RuleCandidate> {
    let mut candidates = Vec::new();

    let has_turbopack = |text: &str| text.contains("turbopack");
    if !has_turbopack(before) && has_turbopack(after) {
        if let Some(block) = capture_block(after, "turbopack") {
            candidates.extend(literal_rule(
                "Add Turbopack configuration block",
                r"(module\.exports\s*=\s*\{)".to_string(),
                format!("$1\n  turbopack: {block},"),
                Category::NextjsTurbopack,
            ));
        }
    }

    let has_remote_patterns = |text: &str| text.contains("remotePatterns");
    if !has_remote_patterns(before) && has_remote_patterns(after) {
        if let Some(block) = capture_block(after, "images") {
            candidates.extend(literal_rule(
                "Add remote image patterns configuration",
                r"(module\.exports\s*=\s*\{)".to_string(),
                format!("$1\n  images: {block},"),
                Category::NextjsImages,
            ));
        }
    }

    for deprecated in ["swcMinify", "experimental.appDir"] {
        if before.contains(deprecated) && !after.contains(deprecated) {
            candidates.extend(literal_rule(
                "Remove deprecated Next.js configuration flag",
                format!(r"{}\s*:\s*[^,\n]+,?", regex::escape(deprecated)),
                String::new(),
                Category::NextjsDeprecated,
            ));
        }
    }

    candidates
}

/// Best-effort brace-balanced capture of `key: { ... }` starting at the
/// first occurrence of `key` in `text`.
fn capture_block(text: &str, key: &str) -> Option<String> {
    let key_pattern = Regex::new(&format!(r"{key}\s*:\s*\{{")).ok()?;
    let m = key_pattern.find(text)?;
    let brace_start = text[m.start()..].find('{')? + m.start();

    let mut depth = 0i32;
    for (offset, c) in text[brace_start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[brace_start..brace_start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_jsonc_comments_line_and_block() {
        let input = "{\n  // comment\n  \"a\": 1, /* inline */ \"b\": 2\n}";
        let stripped = strip_jsonc_comments(input);
        let value: Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], 2);
    }

    #[test]
    fn test_strip_jsonc_comments_preserves_string_contents() {
        let input = r#"{"url": "http://example.com"}"#;
        let stripped = strip_jsonc_comments(input);
        assert!(stripped.contains("http://example.com"));
    }

    #[test]
    fn test_extract_tsconfig_strict_mode() {
        let before = r#"{"compilerOptions":{"strict":false}}"#;
        let after = r#"{"compilerOptions":{"strict":true}}"#;
        let candidates = extract_tsconfig(before, after, "tsconfig.json", false);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].description, "Enable TypeScript strict mode");
        assert_eq!(candidates[0].category.as_str(), "tsconfig-strict");
    }

    #[test]
    fn test_extract_tsconfig_non_json_is_skipped() {
        let candidates = extract_tsconfig("not json", "still not json", "tsconfig.json", false);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_extract_package_json_new_script() {
        let before = r#"{"scripts": {"build": "tsc"}}"#;
        let after = r#"{"scripts": {"build": "tsc", "lint": "eslint ."}}"#;
        let candidates = extract_package_json(before, after, "package.json", false);
        assert!(candidates.iter().any(|c| c.category.as_str() == "package-scripts"));
    }

    #[test]
    fn test_extract_package_json_new_dependency() {
        let before = r#"{"dependencies": {}}"#;
        let after = r#"{"dependencies": {"react": "19.0.0"}}"#;
        let candidates = extract_package_json(before, after, "package.json", false);
        assert!(candidates.iter().any(|c| c.category.as_str() == "package-add-dep"));
    }

    #[test]
    fn test_extract_package_json_updated_dependency() {
        let before = r#"{"dependencies": {"react": "18.0.0"}}"#;
        let after = r#"{"dependencies": {"react": "19.0.0"}}"#;
        let candidates = extract_package_json(before, after, "package.json", false);
        assert!(candidates.iter().any(|c| c.category.as_str() == "package-update-dep"));
    }

    #[test]
    fn test_capture_block_balances_nested_braces() {
        let text = "module.exports = {\n  images: { remotePatterns: [{ hostname: 'x' }] },\n};";
        let block = capture_block(text, "images").unwrap();
        assert_eq!(block, "{ remotePatterns: [{ hostname: 'x' }] }");
    }

    #[test]
    fn test_extract_next_config_turbopack_addition() {
        let before = "module.exports = {};";
        let after = "module.exports = {\n  turbopack: { rules: {} },\n};";
        let candidates = extract_next_config(before, after);
        assert!(candidates.iter().any(|c| c.category.as_str() == "nextjs-turbopack"));
    }

    #[test]
    fn test_extract_next_config_deprecated_flag_removed() {
        let before = "module.exports = { swcMinify: true };";
        let after = "module.exports = {};";
        let candidates = extract_next_config(before, after);
        assert!(candidates.iter().any(|c| c.category.as_str() == "nextjs-deprecated"));
    }
}
