//! Terminal reporting for pipeline runs.
//!
//! Separate from pipeline logic so the library can be driven without any
//! of this printing.

use colored::Colorize;

use crate::errors::ErrorAggregator;
use crate::pipeline::FileOutcome;

pub const SUCCESS_MARK: &str = "\u{2713}";
pub const FAILURE_MARK: &str = "\u{2718}";

pub fn print_run_report(outcomes: &[FileOutcome], errors: &ErrorAggregator, verbose: bool) {
    let mut changed = 0;
    let mut total_changes = 0;
    let mut total_findings = 0;

    for outcome in outcomes {
        let file_changes: usize = outcome.layer_results.iter().map(|r| r.change_count).sum();
        let findings: usize = outcome.layer_results.iter().map(|r| r.security_findings.len()).sum();
        total_findings += findings;

        if file_changes == 0 && findings == 0 {
            continue;
        }

        changed += usize::from(outcome.changed);
        total_changes += file_changes;

        println!("{}", outcome.file_path.display().to_string().bold());
        for result in &outcome.layer_results {
            for description in result
                .results
                .iter()
                .filter_map(|event| match event {
                    crate::types::ResultEvent::Apply { description } => Some(description),
                    _ => None,
                })
            {
                println!("  {} layer {}: {}", "apply:".green(), result.layer_id, description);
            }
            for finding in &result.security_findings {
                println!(
                    "  {} {} ({:?}) at {}:{}",
                    "finding:".yellow(),
                    finding.description,
                    finding.severity,
                    finding.line,
                    finding.column
                );
            }
            if verbose {
                for change in result.changes.iter().filter(|c| c.kind == crate::types::ChangeKind::Advisory) {
                    println!("  {} {}", "advisory:".dimmed(), change.description);
                }
            }
        }
    }

    if changed == 0 && total_findings == 0 {
        println!("{} no changes needed across {} file(s)", SUCCESS_MARK.green(), outcomes.len());
    } else {
        println!(
            "\n{} {} change(s) across {} file(s), {} finding(s) reported",
            if errors.has_errors() { FAILURE_MARK.red() } else { SUCCESS_MARK.green() },
            total_changes,
            changed,
            total_findings
        );
    }

    for recorded in errors.errors() {
        eprintln!("{} {}: {}", "error:".bold().red(), recorded.file, recorded.message);
    }
    if errors.errors_truncated() {
        eprintln!("{} further errors were truncated", "warning:".bold().yellow());
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::config::Config;
    use crate::pipeline::{Pipeline, PipelineOptions};

    #[test]
    fn test_print_run_report_does_not_panic_on_clean_run() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &Config::default()).unwrap();
        let file_path = dir.path().join("clean.ts");
        std::fs::write(&file_path, "export const a = 1;\n").unwrap();

        let outcome = pipeline.run_file(&file_path, &PipelineOptions::default()).unwrap();
        let errors = ErrorAggregator::default();
        print_run_report(&[outcome], &errors, false);
    }

    #[test]
    fn test_print_run_report_does_not_panic_with_findings() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::new(dir.path(), &Config::default()).unwrap();
        let file_path = dir.path().join("actions.ts");
        std::fs::write(
            &file_path,
            "\"use server\";\nexport async function run(input) {\n  return eval(input);\n}",
        )
        .unwrap();

        let outcome = pipeline.run_file(&file_path, &PipelineOptions::default()).unwrap();
        let errors = ErrorAggregator::default();
        print_run_report(&[outcome], &errors, true);
    }
}
