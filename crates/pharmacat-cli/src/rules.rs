//! `rules` command handlers.

use anyhow::Context;
use clap::Subcommand;
use pharmacat_core::{AppConfig, RuleSet};

/// Sub-commands available under `rules`.
#[derive(Debug, Subcommand)]
pub enum RulesCommands {
    /// Load and validate the rule file, then print a summary
    Check,
}

/// Loads the configured rule file.
pub(crate) fn load_configured_rules(config: &AppConfig) -> anyhow::Result<RuleSet> {
    let rules = pharmacat_core::load_rules(&config.rules_path)
        .with_context(|| format!("invalid rule file {}", config.rules_path.display()))?;
    tracing::debug!(
        path = %config.rules_path.display(),
        version = %rules.version,
        rules = rules.rules.len(),
        "rule file loaded"
    );
    Ok(rules)
}

pub(crate) fn run_rules_check(config: &AppConfig) -> anyhow::Result<()> {
    let rules = load_configured_rules(config)?;

    println!(
        "{}: version {}, {} categories, {} subcategories, {} rules",
        config.rules_path.display(),
        rules.version,
        rules.taxonomy.categories().count(),
        rules.taxonomy.subcategory_count(),
        rules.rules.len()
    );
    for rule in &rules.rules {
        match &rule.then.subcategory {
            Some(sub) => println!("  {}\t{} / {sub}", rule.id, rule.then.category),
            None => println!("  {}\t{}", rule.id, rule.then.category),
        }
    }
    Ok(())
}
