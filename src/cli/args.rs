//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `run`: execute the transformation pipeline over files/directories
//! - `rules`: manage the Rule Store (list/add/delete/reset/export/import)
//! - `baseline`: snapshot or diff a tree's content-hash state
//! - `init`: write a default `.neurolintrc.json`

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    /// Get the verbose flag from the command's common args.
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Run(cmd)) => cmd.verbose,
            Some(Command::Rules(_)) | Some(Command::Baseline(_)) | Some(Command::Init) | None => false,
        }
    }
}

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Files or directories to run the pipeline over
    pub paths: Vec<PathBuf>,

    /// Restrict the run to these layer ids (default: all)
    #[arg(long)]
    pub layers: Vec<u32>,

    /// Report planned changes without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Run Layer 8's fail-safe quarantine sequence and apply fixes that
    /// pass every gate (default: report findings only, never mutate)
    #[arg(long)]
    pub quarantine: bool,

    /// Enable verbose diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Minimum confidence required for a rule to apply (overrides config)
    #[arg(long)]
    pub confidence_threshold: Option<f64>,
}

#[derive(Debug, Subcommand)]
pub enum RulesAction {
    /// List every rule currently in the store
    List,
    /// Delete a rule by id
    Delete { id: u32 },
    /// Clear the store
    Reset,
    /// Export the store to a file
    Export { path: PathBuf },
    /// Import rules from a file, merging by the store's dedup rule
    Import { path: PathBuf },
}

#[derive(Debug, Args)]
pub struct RulesCommand {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Debug, Subcommand)]
pub enum BaselineAction {
    /// Write a content-hash snapshot of the tree to a file
    Snapshot { path: PathBuf, baseline_file: PathBuf },
    /// Compare the tree's current state to a saved snapshot
    Diff { path: PathBuf, baseline_file: PathBuf },
}

#[derive(Debug, Args)]
pub struct BaselineCommand {
    #[command(subcommand)]
    pub action: BaselineAction,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the transformation pipeline over one or more paths
    Run(RunCommand),
    /// Manage the persistent Rule Store
    Rules(RulesCommand),
    /// Snapshot or diff a tree's content-hash baseline
    Baseline(BaselineCommand),
    /// Write a default .neurolintrc.json configuration file
    Init,
}
