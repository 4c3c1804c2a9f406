//! The `Rule` sum type and its JSON persistence shape.

use anyhow::{Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{RequiredImport, Severity};

/// Closed set of rule categories (§4.3 Pattern Classifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::enum_variant_names)]
pub enum Category {
    TsconfigStrict,
    TsconfigJsx,
    TsconfigTarget,
    TsconfigModule,
    NextjsTurbopack,
    NextjsImages,
    NextjsDeprecated,
    PackageScripts,
    PackageAddDep,
    PackageUpdateDep,
    ComponentConversion,
    JsxKeyProp,
    Accessibility,
    React19ForwardRef,
    React19Refs,
    ComponentProps,
    Import,
    Export,
    JsxComponent,
    Function,
    Expression,
    Security,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TsconfigStrict => "tsconfig-strict",
            Self::TsconfigJsx => "tsconfig-jsx",
            Self::TsconfigTarget => "tsconfig-target",
            Self::TsconfigModule => "tsconfig-module",
            Self::NextjsTurbopack => "nextjs-turbopack",
            Self::NextjsImages => "nextjs-images",
            Self::NextjsDeprecated => "nextjs-deprecated",
            Self::PackageScripts => "package-scripts",
            Self::PackageAddDep => "package-add-dep",
            Self::PackageUpdateDep => "package-update-dep",
            Self::ComponentConversion => "component-conversion",
            Self::JsxKeyProp => "jsx-key-prop",
            Self::Accessibility => "accessibility",
            Self::React19ForwardRef => "react19-forwardRef",
            Self::React19Refs => "react19-refs",
            Self::ComponentProps => "component-props",
            Self::Import => "import",
            Self::Export => "export",
            Self::JsxComponent => "jsx-component",
            Self::Function => "function",
            Self::Expression => "expression",
            Self::Security => "security",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "tsconfig-strict" => Self::TsconfigStrict,
            "tsconfig-jsx" => Self::TsconfigJsx,
            "tsconfig-target" => Self::TsconfigTarget,
            "tsconfig-module" => Self::TsconfigModule,
            "nextjs-turbopack" => Self::NextjsTurbopack,
            "nextjs-images" => Self::NextjsImages,
            "nextjs-deprecated" => Self::NextjsDeprecated,
            "package-scripts" => Self::PackageScripts,
            "package-add-dep" => Self::PackageAddDep,
            "package-update-dep" => Self::PackageUpdateDep,
            "component-conversion" => Self::ComponentConversion,
            "jsx-key-prop" => Self::JsxKeyProp,
            "accessibility" => Self::Accessibility,
            "react19-forwardRef" => Self::React19ForwardRef,
            "react19-refs" => Self::React19Refs,
            "component-props" => Self::ComponentProps,
            "import" => Self::Import,
            "export" => Self::Export,
            "jsx-component" => Self::JsxComponent,
            "function" => Self::Function,
            "expression" => Self::Expression,
            "security" => Self::Security,
            _ => return None,
        })
    }
}

/// Either a literal substitution string or a capture-reference template
/// (`$1`, `${1}`). Both are stored as plain strings; `regex::Regex`
/// resolves capture references identically for either kind at apply time
/// (see Design Notes on dynamic replacement values).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Literal(String),
    Template(String),
}

impl Replacement {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) | Self::Template(s) => s,
        }
    }
}

/// A compiled regex pattern plus its original `/body/flags` textual form,
/// which is what Rule Store invariants dedupe on.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    pub source: String,
    pub flags: String,
    pub compiled: Regex,
}

impl RegexPattern {
    pub fn new(source: &str, flags: &str) -> Result<Self> {
        let compiled = compile(source, flags)?;
        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            compiled,
        })
    }

    /// Canonical `/body/flags` textual form used for dedup and persistence.
    pub fn canonical(&self) -> String {
        format!("/{}/{}", self.source, self.flags)
    }
}

fn compile(source: &str, flags: &str) -> Result<Regex> {
    // The `g` (global) flag is JS-only bookkeeping; regex::Regex::replace_all
    // is always global, and `i`/`m`/`s` map directly to inline flags.
    let inline: String = flags.chars().filter(|c| *c != 'g').collect();
    let pattern = if inline.is_empty() {
        source.to_string()
    } else {
        format!("(?{inline}){source}")
    };
    Regex::new(&pattern).map_err(|e| anyhow!("invalid regex /{source}/{flags}: {e}"))
}

/// Structural (AST-matcher based) pattern. Rewriter and matcher are opaque
/// descriptor strings interpreted by the Generic/AST-diff extractor; the
/// Rule Store itself treats them as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralPattern {
    pub matcher: String,
    pub rewriter: String,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(RegexPattern),
    Structural(StructuralPattern),
}

impl Pattern {
    pub fn canonical(&self) -> String {
        match self {
            Self::Regex(r) => r.canonical(),
            Self::Structural(s) => format!("@structural:{}=>{}", s.matcher, s.rewriter),
        }
    }
}

/// Security metadata present only when `security_related` is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityMeta {
    pub severity: Severity,
    pub signature_id: String,
}

/// A persisted transformation rule (§3 Data Model).
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: u32,
    pub pattern: Pattern,
    pub replacement: Replacement,
    pub description: String,
    pub category: Category,
    pub layer: u32,
    pub confidence: f64,
    pub frequency: u32,
    pub required_import: Option<RequiredImport>,
    pub security: Option<SecurityMeta>,
}

impl Rule {
    pub fn is_security_related(&self) -> bool {
        self.security.is_some()
    }
}

/// JSON-on-disk shape. Regex patterns serialize as `/body/flags`;
/// structural patterns as `@structural:matcher=>rewriter`. Dropped
/// silently on load when the pattern cannot be reconstructed (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRule {
    pub description: String,
    pub pattern: String,
    pub replacement: String,
    pub confidence: f64,
    pub frequency: u32,
    pub layer: u32,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_import: Option<RequiredImport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_related: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_id: Option<String>,
}

impl Rule {
    pub fn to_stored(&self) -> StoredRule {
        let (severity, signature_id, security_related) = match &self.security {
            Some(meta) => (
                Some(severity_str(meta.severity).to_string()),
                Some(meta.signature_id.clone()),
                Some(true),
            ),
            None => (None, None, None),
        };
        StoredRule {
            description: self.description.clone(),
            pattern: self.pattern.canonical(),
            replacement: self.replacement.as_str().to_string(),
            confidence: self.confidence,
            frequency: self.frequency,
            layer: self.layer,
            category: self.category.as_str().to_string(),
            required_import: self.required_import.clone(),
            security_related,
            severity,
            signature_id,
        }
    }

    /// Reconstruct a `Rule` from its persisted form. Returns `Ok(None)`
    /// (rather than an error) when the pattern cannot be reconstructed as
    /// a valid regex/structural descriptor, so callers can drop the entry
    /// silently on load as the Rule Store invariant requires.
    pub fn from_stored(id: u32, stored: &StoredRule) -> Option<Rule> {
        let pattern = parse_pattern(&stored.pattern)?;
        let category = Category::parse(&stored.category)?;
        let security = if stored.security_related.unwrap_or(false) {
            let severity = stored.severity.as_deref().and_then(parse_severity)?;
            let signature_id = stored.signature_id.clone()?;
            Some(SecurityMeta {
                severity,
                signature_id,
            })
        } else {
            None
        };

        Some(Rule {
            id,
            pattern,
            replacement: Replacement::Template(stored.replacement.clone()),
            description: stored.description.clone(),
            category,
            layer: stored.layer,
            confidence: stored.confidence,
            frequency: stored.frequency,
            required_import: stored.required_import.clone(),
            security,
        })
    }
}

fn parse_pattern(text: &str) -> Option<Pattern> {
    if let Some(rest) = text.strip_prefix("@structural:") {
        let (matcher, rewriter) = rest.split_once("=>")?;
        return Some(Pattern::Structural(StructuralPattern {
            matcher: matcher.to_string(),
            rewriter: rewriter.to_string(),
        }));
    }
    // `/body/flags` — split on the last `/` so a `/`-containing body survives.
    if !text.starts_with('/') {
        return None;
    }
    let last_slash = text.rfind('/')?;
    if last_slash == 0 {
        return None;
    }
    let body = &text[1..last_slash];
    let flags = &text[last_slash + 1..];
    RegexPattern::new(body, flags).ok().map(Pattern::Regex)
}

fn severity_str(s: Severity) -> &'static str {
    match s {
        Severity::Info => "info",
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
        Severity::Critical => "critical",
    }
}

fn parse_severity(s: &str) -> Option<Severity> {
    Some(match s {
        "info" => Severity::Info,
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        "critical" => Severity::Critical,
        _ => return None,
    })
}
