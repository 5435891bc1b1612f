//! `images` command handlers.

use clap::Subcommand;
use pharmacat_core::AppConfig;
use sqlx::SqlitePool;

/// Sub-commands available under `images`.
#[derive(Debug, Subcommand)]
pub enum ImagesCommands {
    /// Delete image rows whose file is missing or empty
    Repair {
        /// Report what would be deleted without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Give every image-less product one placeholder image
    Placeholders {
        /// Report which products would get a placeholder without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Make exactly one image per product primary, at position 0
    Normalize {
        /// Report how many rows would change without writing
        #[arg(long)]
        dry_run: bool,
    },
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) async fn run_images_repair(
    pool: &SqlitePool,
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<()> {
    if !config.image_root.is_dir() {
        anyhow::bail!(
            "image root {} is not a directory; every local image would look missing",
            config.image_root.display()
        );
    }

    let outcome = pharmacat_reconcile::repair_broken_images(pool, &config.image_root, dry_run).await?;

    let verb = if dry_run { "would remove" } else { "removed" };
    println!(
        "{verb} {} broken and {} orphaned image rows; {} present, {} remote unchecked",
        outcome.removed.len(),
        outcome.orphans_removed.len(),
        outcome.present,
        outcome.unchecked
    );
    println!(
        "products without images ({}): [{}]",
        outcome.products_without_images.len(),
        join_ids(&outcome.products_without_images)
    );

    crate::finish_batch("images repair", &outcome.errors)
}

pub(crate) async fn run_images_placeholders(
    pool: &SqlitePool,
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<()> {
    let outcome = pharmacat_reconcile::assign_placeholders(
        pool,
        &config.image_root,
        &config.placeholder_image,
        dry_run,
    )
    .await?;

    let verb = if dry_run { "would assign" } else { "assigned" };
    println!(
        "{verb} {} to {} products: [{}]",
        config.placeholder_image,
        outcome.assigned.len(),
        join_ids(&outcome.assigned)
    );

    crate::finish_batch("images placeholders", &outcome.errors)
}

pub(crate) async fn run_images_normalize(pool: &SqlitePool, dry_run: bool) -> anyhow::Result<()> {
    let outcome = pharmacat_reconcile::normalize_primary_images(pool, dry_run).await?;

    let verb = if dry_run { "would update" } else { "updated" };
    println!(
        "{verb} {} image rows across {} products",
        outcome.updated, outcome.products
    );

    crate::finish_batch("images normalize", &outcome.errors)
}
