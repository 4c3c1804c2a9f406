//! Scoped, reversible on-disk copies of files about to be mutated.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};

/// `{file_path, backup_path, layer_id, timestamp}` per §3 Data Model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub file_path: PathBuf,
    pub backup_path: PathBuf,
    pub layer_id: u32,
    pub timestamp: u64,
}

/// Append-only backup directory, one disjoint sub-path per origin file,
/// retained up to a per-file cap and then pruned oldest-first.
pub struct BackupStore {
    root: PathBuf,
    retention: usize,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            root: root.into(),
            retention: retention.max(1),
        }
    }

    /// Copy `file_path` into the backup directory under a stable name
    /// encoding the origin path and layer id, then prune this file's
    /// backups down to the retention cap.
    pub fn backup(&self, file_path: &Path, layer_id: u32) -> Result<BackupRecord> {
        let dir = self.dir_for(file_path);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create backup dir {}", dir.display()))?;

        let timestamp = now_secs();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let backup_path = dir.join(format!("{timestamp}-layer{layer_id}-{file_name}"));

        fs::copy(file_path, &backup_path).with_context(|| {
            format!(
                "failed to back up {} to {}",
                file_path.display(),
                backup_path.display()
            )
        })?;

        let record = BackupRecord {
            file_path: file_path.to_path_buf(),
            backup_path,
            layer_id,
            timestamp,
        };

        self.prune(file_path)?;
        Ok(record)
    }

    /// All backups for `file_path`, oldest first.
    pub fn list(&self, file_path: &Path) -> Result<Vec<PathBuf>> {
        let dir = self.dir_for(file_path);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        entries.sort();
        Ok(entries)
    }

    /// Restore the most recent backup for `file_path` onto disk.
    pub fn restore_latest(&self, file_path: &Path) -> Result<()> {
        let backups = self.list(file_path)?;
        let latest = backups
            .last()
            .context("no backup exists for this file")?;
        fs::copy(latest, file_path)
            .with_context(|| format!("failed to restore {}", file_path.display()))?;
        Ok(())
    }

    fn prune(&self, file_path: &Path) -> Result<()> {
        let mut entries = self.list(file_path)?;
        while entries.len() > self.retention {
            let oldest = entries.remove(0);
            match fs::remove_file(&oldest) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).context("failed to prune old backup"),
            }
        }
        Ok(())
    }

    fn dir_for(&self, file_path: &Path) -> PathBuf {
        // Encode the origin path as a flattened, disjoint sub-directory so
        // two different files never collide under the same backup folder.
        let encoded = file_path
            .to_string_lossy()
            .replace(['/', '\\'], "__")
            .replace(':', "_");
        self.root.join(encoded)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
