//! `report` command handler.

use pharmacat_core::AppConfig;
use sqlx::SqlitePool;

use crate::rules::load_configured_rules;

pub(crate) async fn run_report(
    pool: &SqlitePool,
    config: &AppConfig,
    json: bool,
    sparse_threshold: Option<usize>,
) -> anyhow::Result<()> {
    let rules = load_configured_rules(config)?;
    let threshold = sparse_threshold.unwrap_or(config.sparse_threshold);
    let report = pharmacat_reconcile::consistency_report(pool, &rules.taxonomy, threshold).await?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }
    Ok(())
}
