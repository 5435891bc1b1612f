//! `cleanup` command handlers.

use clap::Subcommand;
use sqlx::SqlitePool;

/// Sub-commands available under `cleanup`.
#[derive(Debug, Subcommand)]
pub enum CleanupCommands {
    /// Delete exact duplicate products, keeping the oldest of each group
    Duplicates {
        /// List duplicate groups without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

pub(crate) async fn run_cleanup_duplicates(pool: &SqlitePool, dry_run: bool) -> anyhow::Result<()> {
    let outcome = pharmacat_reconcile::cleanup_duplicates(pool, dry_run).await?;

    for group in &outcome.groups {
        let removed: Vec<String> = group.remove.iter().map(ToString::to_string).collect();
        println!("  keep {}\t{}\tremove [{}]", group.keep, group.name, removed.join(", "));
    }
    let verb = if dry_run { "would remove" } else { "removed" };
    println!(
        "{verb} {} duplicate products in {} groups",
        outcome.removed.len(),
        outcome.groups.len()
    );

    crate::finish_batch("cleanup duplicates", &outcome.errors)
}
