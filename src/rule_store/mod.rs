//! Persistent catalogue of learned transformation rules (§4.2 Rule Store).

mod rule;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

pub use rule::{
    Category, Pattern, RegexPattern, Replacement, Rule, SecurityMeta, StoredRule, StructuralPattern,
};

/// `{rules: [...]}` — the well-known on-disk document shape from §6.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RuleDocument {
    rules: Vec<StoredRule>,
}

/// Candidate rule data before it has been assigned a store-local id.
pub struct RuleCandidate {
    pub pattern: Pattern,
    pub replacement: Replacement,
    pub description: String,
    pub category: Category,
    pub layer: u32,
    pub confidence: f64,
    pub security: Option<SecurityMeta>,
    pub required_import: Option<crate::types::RequiredImport>,
}

pub struct RuleStore {
    path: PathBuf,
    rules: Vec<Rule>,
    next_id: u32,
}

impl RuleStore {
    /// Load the store from `path`. A missing file is not an error — it
    /// simply yields an empty store, matching the lazy-create lifecycle
    /// described for the Rule Store as a process-level resource.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                rules: Vec::new(),
                next_id: 1,
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read rule store {}", path.display()))?;
        let doc: RuleDocument = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse rule store {}", path.display()))?;

        let mut rules = Vec::new();
        let mut next_id = 1;
        for stored in &doc.rules {
            if let Some(rule) = Rule::from_stored(next_id, stored) {
                rules.push(rule);
                next_id += 1;
            }
            // Invalid entries are dropped silently, per the Rule Store
            // load invariant; no diagnostic here (debug mode is handled
            // by callers that want it, e.g. the adaptive layer).
        }

        Ok(Self {
            path,
            rules,
            next_id,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let doc = RuleDocument {
            rules: self.rules.iter().map(Rule::to_stored).collect(),
        };
        let mut json =
            serde_json::to_string_pretty(&doc).context("failed to serialize rule store")?;
        json.push('\n');
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write rule store {}", self.path.display()))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Register a candidate rule. If a rule with the same canonical
    /// pattern text already exists, its frequency is bumped and its
    /// confidence raised by 0.05 (capped at 0.95) instead of inserting a
    /// duplicate. Returns the id of the (possibly pre-existing) rule.
    pub fn add(&mut self, candidate: RuleCandidate) -> u32 {
        let canonical = candidate.pattern.canonical();
        if let Some(existing) = self
            .rules
            .iter_mut()
            .find(|r| r.pattern.canonical() == canonical)
        {
            existing.frequency += 1;
            existing.confidence = (existing.confidence + 0.05).min(0.95);
            return existing.id;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.rules.push(Rule {
            id,
            pattern: candidate.pattern,
            replacement: candidate.replacement,
            description: candidate.description,
            category: candidate.category,
            layer: candidate.layer,
            confidence: candidate.confidence,
            frequency: 1,
            required_import: candidate.required_import,
            security: candidate.security,
        });
        id
    }

    pub fn delete(&mut self, id: u32) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.rules.len() != before
    }

    pub fn reset(&mut self) {
        self.rules.clear();
        self.next_id = 1;
    }

    pub fn export(&self, path: &std::path::Path) -> Result<()> {
        let doc = RuleDocument {
            rules: self.rules.iter().map(Rule::to_stored).collect(),
        };
        let json = serde_json::to_string_pretty(&doc).context("failed to serialize rules")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Import rules from `path`, merging via the same dedup rule as `add`.
    pub fn import(&mut self, path: &std::path::Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let doc: RuleDocument =
            serde_json::from_str(&content).context("failed to parse import file")?;

        let mut imported = 0;
        for stored in &doc.rules {
            // Re-parse through a throwaway id; add() reassigns the real one.
            if let Some(rule) = Rule::from_stored(0, stored) {
                self.add(RuleCandidate {
                    pattern: rule.pattern,
                    replacement: rule.replacement,
                    description: rule.description,
                    category: rule.category,
                    layer: rule.layer,
                    confidence: rule.confidence,
                    security: rule.security,
                    required_import: rule.required_import,
                });
                imported += 1;
            }
        }
        Ok(imported)
    }

    /// Apply all rules at or above `threshold`, in insertion order.
    /// Returns the transformed text and the descriptions of rules that
    /// actually matched and applied. A rule that panics during
    /// substitution is impossible by construction here (regex
    /// substitution cannot panic on a compiled pattern), but a rule whose
    /// replacement produces invalid output is still applied verbatim —
    /// reparse-based validation is the pipeline's job, not the store's.
    pub fn apply(&self, text: &str, threshold: f64) -> (String, Vec<String>) {
        let mut current = text.to_string();
        let mut applied = Vec::new();

        for rule in &self.rules {
            if rule.confidence < threshold {
                continue;
            }
            match &rule.pattern {
                Pattern::Regex(regex_pattern) => {
                    if !regex_pattern.compiled.is_match(&current) {
                        continue;
                    }
                    current = regex_pattern
                        .compiled
                        .replace_all(&current, rule.replacement.as_str())
                        .into_owned();
                    applied.push(rule.description.clone());
                }
                Pattern::Structural(_) => {
                    // Structural rules are applied by the extractor that
                    // produced them (AST-level rewrite); the Rule Store's
                    // own `apply` only performs textual regex rewrites.
                    continue;
                }
            }
        }

        (current, applied)
    }
}
