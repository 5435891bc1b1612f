//! `reconcile` command handler.

use pharmacat_core::AppConfig;
use pharmacat_reconcile::ReconcileOptions;
use sqlx::SqlitePool;

use crate::rules::load_configured_rules;

/// Reclassify products and print the grouped transitions.
///
/// # Errors
///
/// Returns an error if the rule file is invalid, the products cannot be
/// read, or the run was cut short by a lost connection. Rows that fail
/// individually are printed and do not fail the command.
pub(crate) async fn run_reconcile(
    pool: &SqlitePool,
    config: &AppConfig,
    category: Option<&str>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let rules = load_configured_rules(config)?;
    let outcome =
        pharmacat_reconcile::reconcile(pool, &rules, ReconcileOptions { category, dry_run })
            .await?;

    let verb = if dry_run { "would change" } else { "changed" };
    println!(
        "{verb} {}, unchanged {}, failed {}",
        outcome.changed,
        outcome.unchanged,
        outcome.failed()
    );
    for transition in &outcome.transitions {
        println!(
            "  {}\t{} -> {}",
            transition.count, transition.from, transition.to
        );
    }

    crate::finish_batch("reconcile", &outcome.errors)
}
