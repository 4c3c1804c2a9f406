//! Top-level command dispatcher.

use std::env;

use anyhow::Result;

use super::{
    args::{Arguments, Command},
    commands::{baseline::baseline, init::init, rules::rules, run::run as run_pipeline},
    exit_status::ExitStatus,
};
use crate::config::load_config;

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Run(cmd)) => {
            let cwd = env::current_dir()?;
            let config = load_config(&cwd)?.config;
            run_pipeline(cmd, &cwd, &config)
        }
        Some(Command::Rules(cmd)) => {
            let cwd = env::current_dir()?;
            let config = load_config(&cwd)?.config;
            rules(cmd.action, &config)
        }
        Some(Command::Baseline(cmd)) => {
            let cwd = env::current_dir()?;
            let config = load_config(&cwd)?.config;
            baseline(cmd.action, &config)
        }
        Some(Command::Init) => init(),
        None => anyhow::bail!("No command provided. Use --help to see available commands."),
    }
}
