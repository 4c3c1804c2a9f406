//! Shared data model used across layers, the Rule Store, and the pipeline.

use serde::{Deserialize, Serialize};

/// Closed set of security severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// A structured report of a potential security issue at a specific source
/// location, emitted by analyzers (notably Layer 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub signature_id: String,
    pub description: String,
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

/// `{module, specifier}` describing an import a rule's replacement needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredImport {
    pub module: String,
    pub specifier: String,
}

/// One fine-grained event recorded by a layer: a backup, an applied rule,
/// a learned rule, a write, or the empty-input boundary case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultEvent {
    Backup { path: String },
    Apply { description: String },
    Learn { description: String },
    Write,
    Empty,
}

/// A single user-visible change log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Apply,
    Learn,
    Advisory,
}

/// Emitted by every layer for every file. `change_count` counts only real
/// text mutations, never advisory suggestions or learning events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerResult {
    pub success: bool,
    pub code: String,
    pub original_code: String,
    pub change_count: usize,
    pub results: Vec<ResultEvent>,
    pub changes: Vec<Change>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub layer_id: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_findings: Vec<Finding>,
}

impl LayerResult {
    /// The boundary case: empty input text always yields this shape.
    pub fn empty_input(layer_id: u32) -> Self {
        Self {
            success: false,
            code: String::new(),
            original_code: String::new(),
            change_count: 0,
            results: vec![ResultEvent::Empty],
            changes: Vec::new(),
            error: None,
            layer_id,
            security_findings: Vec::new(),
        }
    }

    /// A no-op success result: the layer ran but produced no mutation.
    pub fn unchanged(layer_id: u32, text: &str) -> Self {
        Self {
            success: true,
            code: text.to_string(),
            original_code: text.to_string(),
            change_count: 0,
            results: Vec::new(),
            changes: Vec::new(),
            error: None,
            layer_id,
            security_findings: Vec::new(),
        }
    }

    pub fn failure(layer_id: u32, original: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            code: original.to_string(),
            original_code: original.to_string(),
            change_count: 0,
            results: Vec::new(),
            changes: Vec::new(),
            error: Some(error.into()),
            layer_id,
            security_findings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_shape() {
        let result = LayerResult::empty_input(7);
        assert!(!result.success);
        assert_eq!(result.results, vec![ResultEvent::Empty]);
        assert_eq!(result.change_count, 0);
    }

    #[test]
    fn test_unchanged_preserves_original() {
        let result = LayerResult::unchanged(1, "const a = 1;");
        assert_eq!(result.original_code, result.code);
        assert_eq!(result.change_count, 0);
        assert!(result.success);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Info < Severity::Low);
    }
}
