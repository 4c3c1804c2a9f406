use anyhow::Result;
use colored::Colorize;

use super::super::{args::RulesAction, exit_status::ExitStatus};
use crate::config::Config;
use crate::rule_store::RuleStore;

pub fn rules(action: RulesAction, config: &Config) -> Result<ExitStatus> {
    let mut store = RuleStore::load(&config.rule_store_path)?;

    match action {
        RulesAction::List => {
            if store.rules().is_empty() {
                println!("no rules learned yet");
                return Ok(ExitStatus::Success);
            }
            for rule in store.rules() {
                println!(
                    "{:>4}  {:<24}  layer {}  confidence {:.2}  freq {:<3}  {}",
                    rule.id.to_string().cyan(),
                    rule.category.as_str(),
                    rule.layer,
                    rule.confidence,
                    rule.frequency,
                    rule.description,
                );
            }
            Ok(ExitStatus::Success)
        }
        RulesAction::Delete { id } => {
            if store.delete(id) {
                store.save()?;
                println!("{} deleted rule {}", "\u{2713}".green(), id);
                Ok(ExitStatus::Success)
            } else {
                eprintln!("Error: no rule with id {}", id);
                Ok(ExitStatus::Failure)
            }
        }
        RulesAction::Reset => {
            store.reset();
            store.save()?;
            println!("{} rule store cleared", "\u{2713}".green());
            Ok(ExitStatus::Success)
        }
        RulesAction::Export { path } => {
            store.export(&path)?;
            println!(
                "{} exported {} rule(s) to {}",
                "\u{2713}".green(),
                store.rules().len(),
                path.display()
            );
            Ok(ExitStatus::Success)
        }
        RulesAction::Import { path } => {
            let imported = store.import(&path)?;
            store.save()?;
            println!("{} imported {} rule(s) from {}", "\u{2713}".green(), imported, path.display());
            Ok(ExitStatus::Success)
        }
    }
}
