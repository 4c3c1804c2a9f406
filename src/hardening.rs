//! Server-Action Hardening (§4.6, Layer 8).
//!
//! Detection of server-action files is directive-based (`"use server"`).
//! Analysis for dangerous patterns runs on every file regardless of that
//! directive, via an AST walk rather than a source-text regex scan: the
//! severity of a `process.env` access depends on where in the tree it sits
//! (returned, spread, or handed to `JSON.stringify`), a distinction plain
//! text matching cannot make. Mutation only ever happens through the
//! five-step fail-safe quarantine sequence: Parse, Transform, Validate,
//! Size-check, Contamination-check, then Apply-or-Revert.

use regex::Regex;
use swc_ecma_ast::{CallExpr, Callee, Expr, ImportDecl, Lit, MemberExpr, MemberProp, NewExpr, PropOrSpread, ReturnStmt};
use swc_ecma_visit::{Visit, VisitWith};

use crate::ast::{ParsedModule, leading_module_directive, parse_module};
use crate::types::{Change, ChangeKind, Finding, LayerResult, ResultEvent, Severity};

/// Free-function or member-call names §4.6 treats as provably dangerous.
const DANGEROUS_CALL_NAMES: &[&str] =
    &["eval", "exec", "execSync", "spawn", "spawnSync", "execFile", "execFileSync", "Function"];

fn signature_for_call(name: &str) -> (&'static str, &'static str) {
    match name {
        "eval" => ("eval-usage", "Direct eval() call"),
        "exec" | "execSync" => ("command-injection", "Unsanitized shell command execution"),
        "spawn" | "spawnSync" | "execFile" | "execFileSync" => {
            ("process-spawn", "Unsanitized child process spawn")
        }
        _ => ("new-function", "Dynamic Function constructor"),
    }
}

fn callee_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.as_str()),
        Expr::Member(member) => match &member.prop {
            MemberProp::Ident(ident) => Some(ident.sym.as_str()),
            _ => None,
        },
        _ => None,
    }
}

fn is_json_stringify(expr: &Expr) -> bool {
    let Expr::Member(member) = expr else {
        return false;
    };
    let Expr::Ident(obj) = &*member.obj else {
        return false;
    };
    obj.sym.as_str() == "JSON" && matches!(&member.prop, MemberProp::Ident(ident) if ident.sym.as_str() == "stringify")
}

fn is_process_env(member: &MemberExpr) -> bool {
    let Expr::Ident(obj) = &*member.obj else {
        return false;
    };
    obj.sym.as_str() == "process" && matches!(&member.prop, MemberProp::Ident(ident) if ident.sym.as_str() == "env")
}

fn is_child_process_specifier(specifier: &str) -> bool {
    specifier == "child_process" || specifier == "node:child_process"
}

fn line_col(text: &str, byte_offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in text.char_indices() {
        if i >= byte_offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Walks the module AST tracking three mutually-exclusive syntactic
/// contexts a `process.env` reference can sit in: the argument of a
/// `return`, a spread inside an object literal, or an argument to
/// `JSON.stringify`. Each carries its own §4.6 severity.
struct Analyzer<'a> {
    code: &'a str,
    parsed: &'a ParsedModule,
    findings: Vec<Finding>,
    in_return_value: bool,
    in_spread: bool,
    in_stringify_arg: bool,
}

impl<'a> Analyzer<'a> {
    fn record(&mut self, signature_id: &str, description: impl Into<String>, severity: Severity, span: swc_common::Span) {
        let (start, end) = self.parsed.byte_range(span);
        let (line, column) = line_col(self.code, start);
        self.findings.push(Finding {
            signature_id: signature_id.to_string(),
            description: description.into(),
            severity,
            line,
            column,
            context: None,
            matched: self.code.get(start..end).map(str::to_string),
        });
    }
}

impl<'a> Visit for Analyzer<'a> {
    fn visit_return_stmt(&mut self, node: &ReturnStmt) {
        let prev = self.in_return_value;
        self.in_return_value = true;
        node.visit_children_with(self);
        self.in_return_value = prev;
    }

    fn visit_prop_or_spread(&mut self, node: &PropOrSpread) {
        if let PropOrSpread::Spread(spread) = node {
            let prev = self.in_spread;
            self.in_spread = true;
            spread.expr.visit_with(self);
            self.in_spread = prev;
        } else {
            node.visit_children_with(self);
        }
    }

    fn visit_call_expr(&mut self, node: &CallExpr) {
        if let Callee::Expr(expr) = &node.callee {
            if is_json_stringify(expr) {
                let prev = self.in_stringify_arg;
                self.in_stringify_arg = true;
                for arg in &node.args {
                    arg.visit_with(self);
                }
                self.in_stringify_arg = prev;
                return;
            }

            if let Expr::Ident(ident) = &**expr
                && ident.sym.as_str() == "require"
                && let Some(arg) = node.args.first()
                && let Expr::Lit(Lit::Str(s)) = &*arg.expr
                && let Some(specifier) = s.value.as_str()
                && is_child_process_specifier(specifier)
            {
                self.record("child-process-import", "Import of the child_process module", Severity::High, node.span);
            }

            if let Some(name) = callee_name(expr)
                && DANGEROUS_CALL_NAMES.contains(&name)
            {
                let (signature_id, description) = signature_for_call(name);
                self.record(signature_id, description, Severity::Critical, node.span);
            }
        }

        node.visit_children_with(self);
    }

    fn visit_new_expr(&mut self, node: &NewExpr) {
        if let Expr::Ident(ident) = &*node.callee
            && ident.sym.as_str() == "Function"
        {
            self.record("new-function", "Dynamic Function constructor", Severity::Critical, node.span);
        }
        node.visit_children_with(self);
    }

    fn visit_import_decl(&mut self, node: &ImportDecl) {
        if let Some(specifier) = node.src.value.as_str()
            && is_child_process_specifier(specifier)
        {
            self.record("child-process-import", "Import of the child_process module", Severity::High, node.span);
        }
        node.visit_children_with(self);
    }

    fn visit_member_expr(&mut self, node: &MemberExpr) {
        if is_process_env(node) {
            let (signature_id, severity, description) = if self.in_stringify_arg {
                (
                    "env-exposure-stringify",
                    Severity::High,
                    "process.env passed to JSON.stringify; verify no secret reaches the client",
                )
            } else if self.in_spread {
                ("env-exposure-spread", Severity::Critical, "process.env spread into an object literal")
            } else if self.in_return_value {
                ("env-exposure-return", Severity::Critical, "process.env returned directly")
            } else {
                (
                    "env-exposure",
                    Severity::Medium,
                    "Direct process.env access; verify this value never reaches the client",
                )
            };
            self.record(signature_id, description, severity, node.span);
            return;
        }
        node.visit_children_with(self);
    }
}

/// A file is treated as a server action when its module-level prologue is
/// the `"use server"` directive.
pub fn is_server_action_file(code: &str, file_path: &str) -> bool {
    parse_module(code, file_path)
        .ok()
        .and_then(|parsed| leading_module_directive(&parsed.module.body))
        .as_deref()
        == Some("use server")
}

/// Always-on analysis: walk the AST for dangerous calls, dangerous
/// imports, and `process.env` exposure, regardless of whether the file
/// is a detected server action. Unparseable input yields no findings;
/// [`harden`]'s own parse gate is what reports the parse failure.
pub fn analyze(code: &str) -> Vec<Finding> {
    let Ok(parsed) = parse_module(code, "<hardening-analysis>") else {
        return Vec::new();
    };
    let mut analyzer = Analyzer {
        code,
        parsed: &parsed,
        findings: Vec::new(),
        in_return_value: false,
        in_spread: false,
        in_stringify_arg: false,
    };
    parsed.module.visit_with(&mut analyzer);
    analyzer.findings
}

/// The narrow set of auto-fixable dangerous call sites (REMOVE_DANGEROUS_CALLS).
/// Findings outside this table — `child-process-import`
/// (REMOVE_DANGEROUS_IMPORTS) and the `env-exposure*` signatures
/// (PROTECT_ENV_VARS) — are reported but only ever carry a manual
/// recommendation; neither is auto-fixable per §4.6.
struct Removal {
    signature_id: &'static str,
    call_pattern: &'static str,
    default_name: &'static str,
}

const REMOVALS: &[Removal] = &[
    Removal {
        signature_id: "eval-usage",
        call_pattern: r"\beval\s*\([^)]*\)",
        default_name: "eval",
    },
    Removal {
        signature_id: "new-function",
        call_pattern: r"(?:new\s+)?\bFunction\s*\([^)]*\)",
        default_name: "Function",
    },
    Removal {
        signature_id: "command-injection",
        call_pattern: r"(?:[\w.]+\.)?\b(exec|execSync)\s*\([^)]*\)",
        default_name: "exec",
    },
    Removal {
        signature_id: "process-spawn",
        call_pattern: r"(?:[\w.]+\.)?\b(spawn|spawnSync|execFile|execFileSync)\s*\([^)]*\)",
        default_name: "spawn",
    },
];

/// Build the quarantine diagnostic that replaces a dangerous call. The
/// "Original" preview is the start of the *file*, not of the call itself:
/// embedding the matched call text verbatim would let the contamination
/// check re-detect the very pattern this step just neutralized.
fn neutralized_call(name: &str, original_file: &str) -> String {
    let preview: String = original_file.chars().take(50).collect();
    let preview = preview.replace('"', "'").replace('\n', " ");
    format!("console.error(\"[NEUROLINT-QUARANTINE] Dangerous function '{name}' has been neutralized. Original: {preview}\")")
}

/// Replace every auto-fixable dangerous call site in `code` with a
/// `console.error` quarantine diagnostic.
fn transform(code: &str, findings: &[Finding]) -> (String, Vec<String>) {
    let mut current = code.to_string();
    let mut applied = Vec::new();
    let mut handled = std::collections::HashSet::new();

    for finding in findings {
        if !handled.insert(finding.signature_id.as_str()) {
            continue;
        }
        let Some(removal) = REMOVALS.iter().find(|r| r.signature_id == finding.signature_id) else {
            continue;
        };
        let Ok(regex) = Regex::new(removal.call_pattern) else {
            continue;
        };
        if !regex.is_match(&current) {
            continue;
        }
        current = regex
            .replace_all(&current, |caps: &regex::Captures| {
                let name = caps.get(1).map(|m| m.as_str()).unwrap_or(removal.default_name);
                neutralized_call(name, code)
            })
            .into_owned();
        applied.push(finding.description.clone());
    }

    (current, applied)
}

/// A transformed file that shrinks or grows by more than this ratio
/// relative to the original is treated as a runaway rewrite and reverted.
/// The mandated quarantine diagnostic (§4.6) has real text overhead — a
/// single substitution in a short file can easily double its length — so
/// this is calibrated well above that baseline and only catches transforms
/// that blow a file up far beyond one diagnostic's worth of text.
const MAX_SIZE_DELTA_RATIO: f64 = 3.0;

fn size_check_passes(original: &str, transformed: &str) -> bool {
    if original.is_empty() {
        return transformed.is_empty();
    }
    let delta = (transformed.len() as f64 - original.len() as f64).abs();
    delta / original.len() as f64 <= MAX_SIZE_DELTA_RATIO
}

/// The transform must not introduce a *new* critical/high finding beyond
/// what the original already had of that signature.
fn contamination_check_passes(original_findings: &[Finding], transformed: &str) -> bool {
    let after_findings = analyze(transformed);
    let count_of = |findings: &[Finding], id: &str| findings.iter().filter(|f| f.signature_id == id).count();

    after_findings
        .iter()
        .filter(|f| matches!(f.severity, Severity::Critical | Severity::High))
        .all(|f| count_of(&after_findings, &f.signature_id) <= count_of(original_findings, &f.signature_id))
}

/// Run the analysis step and, when `quarantine` is set, the remaining
/// four-step fail-safe sequence (Transform, Validate, Size-check,
/// Contamination-check) against `code`. With `quarantine=false`, findings
/// are always reported but `code` is never mutated — that is the whole
/// point of the flag: audit without acting. On any failed gate under
/// `quarantine=true` the original text is kept and the findings are still
/// reported (quarantined, not silently dropped).
pub fn harden(code: &str, file_path: &str, layer_id: u32, quarantine: bool) -> LayerResult {
    if code.is_empty() {
        return LayerResult::empty_input(layer_id);
    }

    let findings = analyze(code);

    if !quarantine {
        let mut result = LayerResult::unchanged(layer_id, code);
        result.security_findings = findings;
        return result;
    }

    // Step 1: Parse.
    if parse_module(code, file_path).is_err() {
        let mut result = LayerResult::unchanged(layer_id, code);
        result.security_findings = findings;
        return result;
    }

    if findings.is_empty() {
        return LayerResult::unchanged(layer_id, code);
    }

    // Step 2: Transform.
    let (transformed, applied_descriptions) = transform(code, &findings);
    if applied_descriptions.is_empty() {
        let mut result = LayerResult::unchanged(layer_id, code);
        result.security_findings = findings;
        return result;
    }

    // Step 3: Validate (reparse).
    // Step 4: Size-check.
    // Step 5: Contamination-check.
    let passes = parse_module(&transformed, file_path).is_ok()
        && size_check_passes(code, &transformed)
        && contamination_check_passes(&findings, &transformed);

    if !passes {
        let mut result = LayerResult::failure(layer_id, code, "hardening fail-safe gate rejected the transform");
        result.security_findings = findings;
        return result;
    }

    // Apply.
    let changes: Vec<Change> = applied_descriptions
        .iter()
        .map(|d| Change {
            kind: ChangeKind::Apply,
            description: d.clone(),
        })
        .collect();
    let results: Vec<ResultEvent> = applied_descriptions
        .iter()
        .map(|d| ResultEvent::Apply {
            description: d.clone(),
        })
        .collect();

    LayerResult {
        success: true,
        code: transformed,
        original_code: code.to_string(),
        change_count: applied_descriptions.len(),
        results,
        changes,
        error: None,
        layer_id,
        security_findings: findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_server_action_file_detects_directive() {
        let code = "\"use server\";\nexport async function save() {}";
        assert!(is_server_action_file(code, "actions.ts"));
    }

    #[test]
    fn test_is_server_action_file_false_without_directive() {
        assert!(!is_server_action_file("export function save() {}", "actions.ts"));
    }

    #[test]
    fn test_analyze_detects_eval() {
        let findings = analyze("function run(input) { return eval(input); }");
        assert!(findings.iter().any(|f| f.signature_id == "eval-usage"));
    }

    #[test]
    fn test_analyze_detects_bare_exec() {
        let findings = analyze("export async function run() { exec(\"rm file\"); }");
        assert!(findings.iter().any(|f| f.signature_id == "command-injection" && f.severity == Severity::Critical));
    }

    #[test]
    fn test_analyze_detects_bare_spawn_family() {
        for call in ["spawn", "spawnSync", "execFile", "execFileSync"] {
            let findings = analyze(&format!("{call}(\"ls\", []);"));
            assert!(
                findings.iter().any(|f| f.signature_id == "process-spawn"),
                "expected a process-spawn finding for {call}"
            );
        }
    }

    #[test]
    fn test_analyze_detects_member_exec() {
        let findings = analyze("child_process.exec(\"rm file\");");
        assert!(findings.iter().any(|f| f.signature_id == "command-injection"));
    }

    #[test]
    fn test_analyze_runs_regardless_of_directive() {
        let findings = analyze("eval('1+1');");
        assert!(!findings.is_empty());
    }

    #[test]
    fn test_analyze_returns_empty_for_clean_code() {
        assert!(analyze("export async function save(data) { return data; }").is_empty());
    }

    #[test]
    fn test_analyze_env_return_is_critical() {
        let findings = analyze("export async function run() { return process.env; }");
        let finding = findings.iter().find(|f| f.signature_id == "env-exposure-return").unwrap();
        assert_eq!(finding.severity, Severity::Critical);
    }

    #[test]
    fn test_analyze_env_spread_is_critical() {
        let findings = analyze("export async function run() { return { ...process.env }; }");
        assert!(findings.iter().any(|f| f.signature_id == "env-exposure-spread" && f.severity == Severity::Critical));
    }

    #[test]
    fn test_analyze_env_stringify_is_high() {
        let findings = analyze("export async function run() { log(JSON.stringify(process.env)); }");
        let finding = findings.iter().find(|f| f.signature_id == "env-exposure-stringify").unwrap();
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_analyze_env_bare_access_is_medium() {
        let findings = analyze("export async function run() { process.env.UNKNOWN_SECRET; }");
        let finding = findings.iter().find(|f| f.signature_id == "env-exposure").unwrap();
        assert_eq!(finding.severity, Severity::Medium);
    }

    #[test]
    fn test_analyze_detects_child_process_import() {
        let findings = analyze("import { exec } from 'child_process';\nexec('ls');");
        assert!(findings.iter().any(|f| f.signature_id == "child-process-import" && f.severity == Severity::High));
    }

    #[test]
    fn test_analyze_detects_child_process_require() {
        let findings = analyze("const cp = require('child_process');\ncp.exec('ls');");
        assert!(findings.iter().any(|f| f.signature_id == "child-process-import"));
    }

    #[test]
    fn test_harden_neutralizes_eval_and_reports_finding() {
        let code = "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}";
        let result = harden(code, "actions.ts", 8, true);
        assert!(result.success);
        assert!(!result.code.contains("eval("));
        assert!(result.code.contains("console.error(\"[NEUROLINT-QUARANTINE]"));
        assert!(result.code.contains("'eval'"));
        assert_eq!(result.change_count, 1);
        assert_eq!(result.security_findings.len(), 1);
    }

    #[test]
    fn test_harden_neutralizes_bare_exec_call() {
        // A server action invoking exec() with no module-qualified prefix.
        let code = "\"use server\";\nexport async function run() {\n  exec(\"rm file\");\n}";
        let result = harden(code, "actions.ts", 8, true);
        assert!(result.success);
        assert!(!result.code.contains("exec(\"rm file\")"));
        assert!(result.code.contains("console.error(\"[NEUROLINT-QUARANTINE]"));
        assert!(result.code.contains("'exec'"));
        assert!(result.code.len() as f64 >= 0.5 * code.len() as f64);
    }

    #[test]
    fn test_harden_quarantine_false_never_mutates() {
        // With quarantine=false the fix is never applied, even though the
        // same finding would be neutralized under quarantine=true.
        let code = "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}";
        let result = harden(code, "actions.ts", 8, false);
        assert_eq!(result.code, code);
        assert_eq!(result.change_count, 0);
        assert_eq!(result.security_findings.len(), 1);
    }

    #[test]
    fn test_harden_leaves_medium_severity_findings_unfixed() {
        // env-exposure carries a manual PROTECT_ENV_VARS recommendation,
        // not an auto-fix, so it is reported but never rewritten.
        let code = "\"use server\";\nexport async function run() {\n  process.env.UNKNOWN_SECRET;\n}";
        let result = harden(code, "actions.ts", 8, true);
        assert_eq!(result.change_count, 0);
        assert_eq!(result.code, code);
        assert!(!result.security_findings.is_empty());
    }

    #[test]
    fn test_harden_leaves_child_process_import_unfixed() {
        // child-process-import carries a manual REMOVE_DANGEROUS_IMPORTS
        // recommendation; only the call sites it enables get neutralized.
        let code = "\"use server\";\nimport { exec } from 'child_process';\nexport async function run() {\n  exec(\"ls\");\n}";
        let result = harden(code, "actions.ts", 8, true);
        assert!(result.security_findings.iter().any(|f| f.signature_id == "child-process-import"));
        assert!(result.code.contains("import { exec } from 'child_process'"));
        assert!(!result.code.contains("exec(\"ls\")"));
    }

    #[test]
    fn test_harden_empty_input_boundary() {
        let result = harden("", "actions.ts", 8, true);
        assert_eq!(result.results, vec![ResultEvent::Empty]);
    }

    #[test]
    fn test_harden_unchanged_when_no_findings() {
        let result = harden("export async function save(data) { return data; }", "actions.ts", 8, true);
        assert_eq!(result.change_count, 0);
        assert!(result.security_findings.is_empty());
    }

    #[test]
    fn test_harden_failed_validation_rolls_back() {
        // A server-action file almost entirely composed of one dangerous
        // call: the quarantine diagnostic that replaces it dwarfs the
        // original text, so the size-check gate rejects the transform.
        let code = "\"use server\";\neval(\"x\");";
        let result = harden(code, "actions.ts", 8, true);
        assert!(!result.success);
        assert_eq!(result.code, code);
        assert!(!result.security_findings.is_empty());
    }

    #[test]
    fn test_size_check_rejects_large_delta() {
        assert!(!size_check_passes("short", "this text is drastically longer than the original by far"));
    }

    #[test]
    fn test_size_check_accepts_small_delta() {
        let original = "export async function run(input) {\n  return eval(input);\n}";
        let transformed = "export async function run(input) {\n  return /* SECURITY: eval() removed */;\n}";
        assert!(size_check_passes(original, transformed));
    }
}
