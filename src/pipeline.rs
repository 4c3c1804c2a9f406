//! Transformation Pipeline (§4.1): orchestrates Layer 8 (hardening) and
//! Layer 7 (adaptive apply + learn) over one or many files, with
//! backup-before-mutation, dry-run isolation, and `\n`-normalized writes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::adaptive;
use crate::backup::BackupStore;
use crate::config::Config;
use crate::errors::{ErrorAggregator, ErrorKind};
use crate::hardening;
use crate::rule_store::RuleStore;
use crate::types::LayerResult;
use crate::utils::normalize_line_endings;

pub struct PipelineOptions {
    pub dry_run: bool,
    pub verbose: bool,
    pub confidence_threshold: Option<f64>,
    /// Restrict the run to this subset of layer ids (`7`, `8`). `None` runs
    /// every layer, the default.
    pub layers: Option<Vec<u32>>,
    /// When `false` (the default), Layer 8 only reports findings and never
    /// mutates code. When `true`, it runs the full fail-safe quarantine
    /// sequence (Parse, Transform, Validate, Size-check,
    /// Contamination-check, Apply-or-Revert) and applies fixes that pass
    /// every gate.
    pub quarantine: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            verbose: false,
            confidence_threshold: None,
            layers: None,
            quarantine: false,
        }
    }
}

impl PipelineOptions {
    fn runs_layer(&self, layer_id: u32) -> bool {
        self.layers.as_ref().is_none_or(|ids| ids.contains(&layer_id))
    }
}

/// The per-file record of everything the pipeline did, in layer order
/// (Layer 8 hardening first, Layer 7 adaptive apply second).
pub struct FileOutcome {
    pub file_path: PathBuf,
    pub layer_results: Vec<LayerResult>,
    pub final_code: String,
    pub changed: bool,
    pub written: bool,
}

pub struct Pipeline {
    root: PathBuf,
    rule_store: RuleStore,
    backup_store: BackupStore,
    confidence_threshold: f64,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, config: &Config) -> Result<Self> {
        let root = root.into();
        let rule_store = RuleStore::load(root.join(&config.rule_store_path))
            .context("failed to load rule store")?;
        let backup_store = BackupStore::new(root.join(&config.backup_dir), config.backup_retention);
        Ok(Self {
            root,
            rule_store,
            backup_store,
            confidence_threshold: config.confidence_threshold,
        })
    }

    pub fn rule_store(&self) -> &RuleStore {
        &self.rule_store
    }

    pub fn rule_store_mut(&mut self) -> &mut RuleStore {
        &mut self.rule_store
    }

    /// Persist the Rule Store. Call once after a batch of files has run;
    /// the store is a process-level resource, not a per-file one.
    pub fn save_rule_store(&self) -> Result<()> {
        self.rule_store.save()
    }

    /// Run the pipeline over a single file already read into `original`.
    /// Does not touch disk; callers decide when to write `final_code`.
    pub fn run_text(&mut self, original: &str, file_path: &str, options: &PipelineOptions) -> Vec<LayerResult> {
        if original.is_empty() {
            return vec![LayerResult::empty_input(8), LayerResult::empty_input(7)];
        }

        let threshold = options.confidence_threshold.unwrap_or(self.confidence_threshold);

        let layer8 = if options.runs_layer(8) {
            hardening::harden(original, file_path, 8, options.quarantine)
        } else {
            crate::types::LayerResult::unchanged(8, original)
        };

        let layer7 = if options.runs_layer(7) {
            adaptive::apply(&self.rule_store, &layer8.code, threshold, 7)
        } else {
            crate::types::LayerResult::unchanged(7, &layer8.code)
        };

        let previous = vec![layer8.clone(), layer7.clone()];
        let learned = adaptive::learn(&mut self.rule_store, file_path, &previous, options.verbose);
        if options.verbose {
            for event in &learned {
                if let crate::types::ResultEvent::Learn { description } = event {
                    eprintln!("[neurolint:adaptive] {file_path}: learned rule \"{description}\"");
                }
            }
        }

        vec![layer8, layer7]
    }

    /// Run the pipeline against a file on disk, writing the result unless
    /// `options.dry_run` is set. Backs up the file before any mutation.
    pub fn run_file(&mut self, path: &Path, options: &PipelineOptions) -> Result<FileOutcome> {
        let original = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_path = path.to_string_lossy().to_string();

        let layer_results = self.run_text(&original, &file_path, options);
        let final_code = layer_results
            .last()
            .map(|r| r.code.clone())
            .unwrap_or_else(|| original.clone());
        let final_code = normalize_line_endings(&final_code);
        let changed = final_code != normalize_line_endings(&original);

        let mut written = false;
        if changed && !options.dry_run {
            let last_mutating_layer = layer_results
                .iter()
                .rev()
                .find(|r| r.change_count > 0)
                .map(|r| r.layer_id)
                .unwrap_or(7);
            self.backup_store
                .backup(path, last_mutating_layer)
                .with_context(|| format!("failed to back up {}", path.display()))?;
            fs::write(path, &final_code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            written = true;
        }

        Ok(FileOutcome {
            file_path: path.to_path_buf(),
            layer_results,
            final_code,
            changed,
            written,
        })
    }

    /// Run the pipeline over every path, collecting per-file errors rather
    /// than aborting the whole run. The Rule Store is saved once at the
    /// end, not after every file.
    pub fn run_paths(&mut self, paths: &[PathBuf], options: &PipelineOptions) -> (Vec<FileOutcome>, ErrorAggregator) {
        let mut outcomes = Vec::new();
        let mut errors = ErrorAggregator::default();

        for path in paths {
            match self.run_file(path, options) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => errors.record_error(path.to_string_lossy(), ErrorKind::Io, e.to_string()),
            }
        }

        if !options.dry_run
            && let Err(e) = self.save_rule_store()
        {
            errors.record_error(
                self.root.display().to_string(),
                ErrorKind::Io,
                format!("failed to save rule store: {e}"),
            );
        }

        (outcomes, errors)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_run_text_empty_input_boundary() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &config()).unwrap();
        let results = pipeline.run_text("", "a.ts", &PipelineOptions::default());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
    }

    #[test]
    fn test_run_text_hardens_server_action_under_quarantine() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &config()).unwrap();
        let code = "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}";
        let options = PipelineOptions {
            quarantine: true,
            ..PipelineOptions::default()
        };
        let results = pipeline.run_text(code, "actions.ts", &options);
        let layer8 = &results[0];
        assert!(!layer8.code.contains("eval("));
    }

    #[test]
    fn test_run_text_reports_without_mutating_by_default() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &config()).unwrap();
        let code = "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}";
        let results = pipeline.run_text(code, "actions.ts", &PipelineOptions::default());
        let layer8 = &results[0];
        assert_eq!(layer8.change_count, 0);
        assert!(layer8.code.contains("eval("));
        assert!(!layer8.security_findings.is_empty());
    }

    #[test]
    fn test_run_file_writes_and_backs_up_on_change() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &config()).unwrap();

        let file_path = dir.path().join("actions.ts");
        fs::write(
            &file_path,
            "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}",
        )
        .unwrap();

        let options = PipelineOptions {
            quarantine: true,
            ..PipelineOptions::default()
        };
        let outcome = pipeline.run_file(&file_path, &options).unwrap();
        assert!(outcome.changed);
        assert!(outcome.written);

        let on_disk = fs::read_to_string(&file_path).unwrap();
        assert!(!on_disk.contains("eval("));
    }

    #[test]
    fn test_run_file_dry_run_never_writes() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &config()).unwrap();

        let file_path = dir.path().join("actions.ts");
        let original = "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}";
        fs::write(&file_path, original).unwrap();

        let options = PipelineOptions {
            dry_run: true,
            quarantine: true,
            ..PipelineOptions::default()
        };
        let outcome = pipeline.run_file(&file_path, &options).unwrap();
        assert!(outcome.changed);
        assert!(!outcome.written);
        assert_eq!(fs::read_to_string(&file_path).unwrap(), original);
    }

    #[test]
    fn test_run_file_unchanged_when_nothing_to_do() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &config()).unwrap();

        let file_path = dir.path().join("clean.ts");
        fs::write(&file_path, "export const a = 1;\n").unwrap();

        let outcome = pipeline.run_file(&file_path, &PipelineOptions::default()).unwrap();
        assert!(!outcome.changed);
        assert!(!outcome.written);
    }

    #[test]
    fn test_run_text_layers_restricts_to_subset() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &config()).unwrap();
        let code = "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}";

        let options = PipelineOptions {
            layers: Some(vec![7]),
            ..PipelineOptions::default()
        };
        let results = pipeline.run_text(code, "actions.ts", &options);
        assert!(results[0].code.contains("eval("));
    }

    #[test]
    fn test_run_paths_saves_rule_store_once() {
        let dir = tempdir().unwrap();
        let cfg = config();
        let mut pipeline = Pipeline::new(dir.path(), &cfg).unwrap();

        let file_path = dir.path().join("tsconfig.json");
        fs::write(&file_path, r#"{"compilerOptions":{"strict":false}}"#).unwrap();

        let (outcomes, errors) = pipeline.run_paths(&[file_path], &PipelineOptions::default());
        assert_eq!(outcomes.len(), 1);
        assert!(!errors.has_errors());
        assert!(dir.path().join(&cfg.rule_store_path).exists());
    }
}
