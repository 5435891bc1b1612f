//! `db` command handlers.

use clap::Subcommand;
use sqlx::SqlitePool;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending schema migrations
    Migrate,
}

pub(crate) async fn run_db_ping(pool: &SqlitePool) -> anyhow::Result<()> {
    pharmacat_db::health_check(pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    let applied = pharmacat_db::run_migrations(pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}
