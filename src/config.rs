//! Project configuration: discovery, parsing, and validation.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = ".neurolintrc.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,
    #[serde(default = "default_rule_store_path")]
    pub rule_store_path: String,
    #[serde(default = "default_baseline_exclude")]
    pub baseline_exclude: Vec<String>,
}

fn default_confidence_threshold() -> f64 {
    0.70
}

fn default_backup_dir() -> String {
    ".neurolint-backups".to_string()
}

fn default_backup_retention() -> usize {
    10
}

fn default_rule_store_path() -> String {
    ".neurolint/learned-rules.json".to_string()
}

fn default_baseline_exclude() -> Vec<String> {
    [
        "node_modules",
        ".git",
        "dist",
        "build",
        ".next",
        "target",
        ".neurolint-backups",
        ".neurolint",
    ]
    .map(String::from)
    .to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            backup_dir: default_backup_dir(),
            backup_retention: default_backup_retention(),
            rule_store_path: default_rule_store_path(),
            baseline_exclude: default_baseline_exclude(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(anyhow::anyhow!(
                "Invalid 'confidenceThreshold': {} (must be in [0.0, 1.0])",
                self.confidence_threshold
            ));
        }
        if self.backup_retention == 0 {
            return Err(anyhow::anyhow!(
                "Invalid 'backupRetention': must be at least 1"
            ));
        }
        Ok(())
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use tempfile::tempdir;

    use crate::config::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.confidence_threshold, 0.70);
        assert_eq!(config.backup_retention, 10);
        assert!(!config.baseline_exclude.is_empty());
    }

    #[test]
    fn test_parse_partial_config() {
        let json = r#"{ "confidenceThreshold": 0.9 }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.confidence_threshold, 0.9);
        assert_eq!(config.backup_dir, default_backup_dir());
    }

    #[test]
    fn test_find_config_file() {
        let dir = tempdir().unwrap();
        let sub_dir = dir.path().join("src").join("components");
        fs::create_dir_all(&sub_dir).unwrap();

        let config_path = dir.path().join(CONFIG_FILE_NAME);
        File::create(&config_path).unwrap();

        let found = find_config_file(&sub_dir);
        assert_eq!(found.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let found = find_config_file(dir.path());
        assert!(found.is_none());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        fs::write(&config_path, r#"{ "backupRetention": 5 }"#).unwrap();

        let result = load_config(dir.path()).unwrap();
        assert!(result.from_file);
        assert_eq!(result.config.backup_retention, 5);
    }

    #[test]
    fn test_load_config_default_when_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();

        let result = load_config(dir.path()).unwrap();
        assert!(!result.from_file);
        assert_eq!(result.config.confidence_threshold, 0.70);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = Config {
            confidence_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let config = Config {
            backup_retention: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }
}
