use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use super::super::{args::RunCommand, exit_status::ExitStatus, report};
use crate::config::Config;
use crate::pipeline::{Pipeline, PipelineOptions};

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn collect_files(paths: &[PathBuf], exclude: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| {
                e.path()
                    .components()
                    .all(|c| !exclude.iter().any(|ex| ex.as_str() == c.as_os_str()))
            })
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && is_source_file(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }
    files
}

pub fn run(cmd: RunCommand, root: &Path, config: &Config) -> Result<ExitStatus> {
    let files = collect_files(&cmd.paths, &config.baseline_exclude);
    if files.is_empty() {
        println!("no source files found under the given paths");
        return Ok(ExitStatus::Success);
    }

    let options = PipelineOptions {
        dry_run: cmd.dry_run,
        verbose: cmd.verbose,
        confidence_threshold: cmd.confidence_threshold,
        layers: if cmd.layers.is_empty() { None } else { Some(cmd.layers) },
        quarantine: cmd.quarantine,
    };

    let mut pipeline = Pipeline::new(root, config)?;
    let (outcomes, errors) = pipeline.run_paths(&files, &options);

    report::print_run_report(&outcomes, &errors, cmd.verbose);

    if errors.has_errors() {
        Ok(ExitStatus::Failure)
    } else {
        Ok(ExitStatus::Success)
    }
}
