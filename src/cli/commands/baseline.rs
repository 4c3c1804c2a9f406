use anyhow::Result;
use colored::Colorize;

use super::super::{args::BaselineAction, exit_status::ExitStatus};
use crate::config::Config;
use crate::hash::{diff_snapshots, snapshot_dir, Snapshot};

pub fn baseline(action: BaselineAction, config: &Config) -> Result<ExitStatus> {
    match action {
        BaselineAction::Snapshot { path, baseline_file } => {
            let snapshot = snapshot_dir(&path, &config.baseline_exclude)?;
            snapshot.save(&baseline_file)?;
            println!(
                "{} wrote baseline for {} file(s) to {}",
                "\u{2713}".green(),
                snapshot.entries.len(),
                baseline_file.display()
            );
            Ok(ExitStatus::Success)
        }
        BaselineAction::Diff { path, baseline_file } => {
            let before = Snapshot::load(&baseline_file)?;
            let after = snapshot_dir(&path, &config.baseline_exclude)?;
            let diff = diff_snapshots(&before, &after);

            if !diff.has_changes {
                println!("{} no changes since baseline", "\u{2713}".green());
                return Ok(ExitStatus::Success);
            }

            for file in &diff.added {
                println!("{} {}", "added:".green().bold(), file);
            }
            for file in &diff.modified {
                println!("{} {}", "modified:".yellow().bold(), file);
            }
            for file in &diff.removed {
                println!("{} {}", "removed:".red().bold(), file);
            }
            println!(
                "\n{} {} added, {} modified, {} removed, {} unchanged",
                "\u{2718}".yellow(),
                diff.added.len(),
                diff.modified.len(),
                diff.removed.len(),
                diff.unchanged.len()
            );

            Ok(ExitStatus::Failure)
        }
    }
}
