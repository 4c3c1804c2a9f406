//! Content-addressed hashing and directory snapshotting.

use std::{
    collections::BTreeMap,
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Hex-encoded sha256 digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// A mapping of project-relative path to sha256 digest, covering a tree
/// minus a configurable exclusion set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse snapshot JSON")
    }
}

/// Walk `root`, skipping any path component listed in `exclude`, and hash
/// every regular file's contents.
pub fn snapshot_dir(root: &Path, exclude: &[String]) -> Result<Snapshot> {
    let mut entries = BTreeMap::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded(e.path(), root, exclude))
    {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let bytes = fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        entries.insert(rel, sha256_hex(&bytes));
    }

    Ok(Snapshot { entries })
}

fn is_excluded(path: &Path, root: &Path, exclude: &[String]) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| exclude.iter().any(|ex| ex.as_str() == c.as_os_str()))
}

/// Result of comparing two snapshots of the same logical tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub has_changes: bool,
}

pub fn diff_snapshots(before: &Snapshot, after: &Snapshot) -> SnapshotDiff {
    let mut diff = SnapshotDiff::default();

    for (path, after_hash) in &after.entries {
        match before.entries.get(path) {
            None => diff.added.push(path.clone()),
            Some(before_hash) if before_hash == after_hash => diff.unchanged.push(path.clone()),
            Some(_) => diff.modified.push(path.clone()),
        }
    }
    for path in before.entries.keys() {
        if !after.entries.contains_key(path) {
            diff.removed.push(path.clone());
        }
    }

    diff.added.sort();
    diff.removed.sort();
    diff.modified.sort();
    diff.unchanged.sort();
    diff.has_changes = !diff.added.is_empty() || !diff.removed.is_empty() || !diff.modified.is_empty();
    diff
}
