mod cleanup;
mod db;
mod images;
mod reconcile;
mod report;
mod rules;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pharmacat_reconcile::BatchErrors;
use tracing_subscriber::EnvFilter;

use crate::cleanup::CleanupCommands;
use crate::db::DbCommands;
use crate::images::ImagesCommands;
use crate::rules::RulesCommands;

#[derive(Debug, Parser)]
#[command(name = "pharmacat-cli")]
#[command(about = "Pharmacy catalog reclassification and consistency repair")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database connectivity and schema
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Classification rule file
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Move products into the category/subcategory the rules assign
    Reconcile {
        /// Only touch products whose stored category is exactly this value
        #[arg(long)]
        category: Option<String>,

        /// Print the plan without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Image reference repair
    Images {
        #[command(subcommand)]
        command: ImagesCommands,
    },
    /// Print category distribution and remaining anomalies
    Report {
        /// Emit JSON instead of tab-separated text
        #[arg(long)]
        json: bool,

        /// Flag subcategories with this many products or fewer
        #[arg(long)]
        sparse_threshold: Option<usize>,
    },
    /// Catalog cleanup
    Cleanup {
        #[command(subcommand)]
        command: CleanupCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pharmacat-cli: no command given; see --help");
        return Ok(());
    };

    let config = pharmacat_core::load_app_config().context("failed to load configuration")?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let name = command.name();
    tracing::info!(command = name, "command started");

    if let Commands::Rules { command } = &command {
        let result = match command {
            RulesCommands::Check => rules::run_rules_check(&config),
        };
        log_finish(name, &result);
        return result;
    }

    let pool_config = pharmacat_db::PoolConfig::from_app_config(&config);
    let pool = pharmacat_db::connect_pool(&config.database_url, pool_config)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let result = match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_db_ping(&pool).await,
            DbCommands::Migrate => db::run_db_migrate(&pool).await,
        },
        Commands::Reconcile { category, dry_run } => {
            reconcile::run_reconcile(&pool, &config, category.as_deref(), dry_run).await
        }
        Commands::Images { command } => match command {
            ImagesCommands::Repair { dry_run } => {
                images::run_images_repair(&pool, &config, dry_run).await
            }
            ImagesCommands::Placeholders { dry_run } => {
                images::run_images_placeholders(&pool, &config, dry_run).await
            }
            ImagesCommands::Normalize { dry_run } => {
                images::run_images_normalize(&pool, dry_run).await
            }
        },
        Commands::Report {
            json,
            sparse_threshold,
        } => report::run_report(&pool, &config, json, sparse_threshold).await,
        Commands::Cleanup { command } => match command {
            CleanupCommands::Duplicates { dry_run } => {
                cleanup::run_cleanup_duplicates(&pool, dry_run).await
            }
        },
        Commands::Rules { .. } => Ok(()),
    };

    pool.close().await;
    log_finish(name, &result);
    result
}

fn log_finish(name: &str, result: &anyhow::Result<()>) {
    match result {
        Ok(()) => tracing::info!(command = name, "command finished"),
        Err(err) => tracing::error!(command = name, error = %err, "command failed"),
    }
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Db { command } => match command {
                DbCommands::Ping => "db ping",
                DbCommands::Migrate => "db migrate",
            },
            Self::Rules { command } => match command {
                RulesCommands::Check => "rules check",
            },
            Self::Reconcile { .. } => "reconcile",
            Self::Images { command } => match command {
                ImagesCommands::Repair { .. } => "images repair",
                ImagesCommands::Placeholders { .. } => "images placeholders",
                ImagesCommands::Normalize { .. } => "images normalize",
            },
            Self::Report { .. } => "report",
            Self::Cleanup { command } => match command {
                CleanupCommands::Duplicates { .. } => "cleanup duplicates",
            },
        }
    }
}

/// Prints skipped rows and fails the command if the pass was cut short.
///
/// # Errors
///
/// Returns an error when the store was lost part way through, so the exit
/// status tells the operator to rerun.
pub(crate) fn finish_batch(pass: &str, errors: &BatchErrors) -> anyhow::Result<()> {
    if !errors.failures.is_empty() {
        println!("skipped rows ({}):", errors.failed());
        for failure in &errors.failures {
            println!("  {}\t{}\t{}", failure.id, failure.kind, failure.message);
        }
    }
    if errors.incomplete {
        anyhow::bail!(
            "{pass} stopped after losing the database; {} planned rows not confirmed, rerun to resume",
            errors.remaining.len()
        );
    }
    Ok(())
}
