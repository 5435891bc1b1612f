//! Image reference repair: broken-file cleanup, placeholders, and the
//! primary-image convention.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;
use std::path::Path;

use pharmacat_core::ProductImage;
use pharmacat_db::{
    delete_product_image, insert_placeholder_image, list_orphaned_images, list_product_images,
    list_products_without_images, update_image_order,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::ReconcileError;
use crate::fs::{check_location, check_reference, ImageCheck};
use crate::types::{BatchErrors, FailureKind, RowFailure};

// ---------------------------------------------------------------------------
// Broken references
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageRepairOutcome {
    pub dry_run: bool,
    /// Local references whose file exists and is non-empty.
    pub present: usize,
    /// Remote references that were not inspected.
    pub unchecked: usize,
    /// Image ids deleted (or, in a dry run, that would be).
    pub removed: Vec<i64>,
    /// Image ids whose product no longer exists.
    pub orphans_removed: Vec<i64>,
    /// Products that have (or would have) no image once the pass is done.
    pub products_without_images: Vec<i64>,
    #[serde(flatten)]
    pub errors: BatchErrors,
}

/// Deletes image rows whose file is missing or empty, and rows whose product
/// is gone.
///
/// A file that cannot be statted is handled like a missing one; the row is
/// removed and a [`FailureKind::Filesystem`] entry is recorded for it.
///
/// # Errors
///
/// Returns [`ReconcileError::Db`] if the image or product lists cannot be read.
pub async fn repair_broken_images(
    pool: &SqlitePool,
    image_root: &Path,
    dry_run: bool,
) -> Result<ImageRepairOutcome, ReconcileError> {
    let images: Vec<ProductImage> = list_product_images(pool)
        .await?
        .into_iter()
        .map(ProductImage::from)
        .collect();
    let orphan_ids: BTreeSet<i64> = list_orphaned_images(pool)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    let mut outcome = ImageRepairOutcome {
        dry_run,
        ..ImageRepairOutcome::default()
    };

    // Orphans first, then broken files; both are plain deletes.
    let mut doomed: Vec<(i64, bool)> = orphan_ids.iter().map(|&id| (id, true)).collect();
    for image in images.iter().filter(|i| !orphan_ids.contains(&i.id)) {
        match check_reference(image_root, image) {
            ImageCheck::Present => outcome.present += 1,
            ImageCheck::Remote => outcome.unchecked += 1,
            ImageCheck::Missing(reason) => {
                tracing::debug!(
                    image_id = image.id,
                    product_id = image.product_id,
                    url = %image.image_url,
                    reason = %reason,
                    "broken image reference"
                );
                doomed.push((image.id, false));
            }
            ImageCheck::Unreadable(reason) => {
                outcome.errors.record(RowFailure::new(
                    image.id,
                    FailureKind::Filesystem,
                    format!("{reason}; reference treated as missing"),
                ));
                doomed.push((image.id, false));
            }
        }
    }

    tracing::info!(
        images = images.len(),
        orphans = orphan_ids.len(),
        broken = doomed.len() - orphan_ids.len(),
        unchecked = outcome.unchecked,
        dry_run,
        "image references checked"
    );

    for (index, &(image_id, orphan)) in doomed.iter().enumerate() {
        if !dry_run {
            match delete_product_image(pool, image_id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(image_id, "image row already gone");
                    continue;
                }
                Err(err) => {
                    let remaining = doomed[index..].iter().map(|&(id, _)| id);
                    match outcome.errors.store_error(image_id, &err, remaining) {
                        ControlFlow::Break(()) => break,
                        ControlFlow::Continue(()) => continue,
                    }
                }
            }
        }
        if orphan {
            outcome.orphans_removed.push(image_id);
        } else {
            outcome.removed.push(image_id);
        }
    }

    outcome.products_without_images = if dry_run {
        let removed: BTreeSet<i64> = outcome.removed.iter().copied().collect();
        let mut ids: BTreeSet<i64> = list_products_without_images(pool)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();
        let mut kept_per_product: BTreeMap<i64, usize> = BTreeMap::new();
        for image in images.iter().filter(|i| !orphan_ids.contains(&i.id)) {
            let kept = kept_per_product.entry(image.product_id).or_default();
            if !removed.contains(&image.id) {
                *kept += 1;
            }
        }
        ids.extend(
            kept_per_product
                .into_iter()
                .filter(|&(_, kept)| kept == 0)
                .map(|(product_id, _)| product_id),
        );
        ids.into_iter().collect()
    } else {
        list_products_without_images(pool)
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect()
    };

    tracing::info!(
        removed = outcome.removed.len(),
        orphans_removed = outcome.orphans_removed.len(),
        without_images = outcome.products_without_images.len(),
        failed = outcome.errors.failed(),
        incomplete = outcome.errors.incomplete,
        "image repair finished"
    );

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaceholderOutcome {
    pub dry_run: bool,
    /// Products that received (or would receive) the placeholder.
    pub assigned: Vec<i64>,
    #[serde(flatten)]
    pub errors: BatchErrors,
}

/// Gives every image-less product a single primary placeholder image.
///
/// Products that already have an image are never touched, and running the
/// pass twice adds nothing the second time.
///
/// The placeholder must itself survive [`repair_broken_images`]: a local
/// reference has to resolve to a non-empty file under `image_root`.
///
/// # Errors
///
/// Returns [`ReconcileError::PlaceholderUnavailable`] if the placeholder is
/// missing or unreadable, and [`ReconcileError::Db`] if the product list
/// cannot be read.
pub async fn assign_placeholders(
    pool: &SqlitePool,
    image_root: &Path,
    placeholder_url: &str,
    dry_run: bool,
) -> Result<PlaceholderOutcome, ReconcileError> {
    match check_location(image_root, placeholder_url) {
        ImageCheck::Present | ImageCheck::Remote => {}
        ImageCheck::Missing(reason) | ImageCheck::Unreadable(reason) => {
            return Err(ReconcileError::PlaceholderUnavailable {
                reference: placeholder_url.to_string(),
                reason,
            });
        }
    }

    let candidates: Vec<i64> = list_products_without_images(pool)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    tracing::info!(
        candidates = candidates.len(),
        placeholder = placeholder_url,
        dry_run,
        "assigning placeholder images"
    );

    let mut outcome = PlaceholderOutcome {
        dry_run,
        ..PlaceholderOutcome::default()
    };

    for (index, &product_id) in candidates.iter().enumerate() {
        if !dry_run {
            match insert_placeholder_image(pool, product_id, placeholder_url).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(product_id, "product gained an image or was removed; skipped");
                    continue;
                }
                Err(err) => {
                    match outcome
                        .errors
                        .store_error(product_id, &err, candidates[index..].iter().copied())
                    {
                        ControlFlow::Break(()) => break,
                        ControlFlow::Continue(()) => continue,
                    }
                }
            }
        }
        outcome.assigned.push(product_id);
    }

    tracing::info!(
        assigned = outcome.assigned.len(),
        failed = outcome.errors.failed(),
        incomplete = outcome.errors.incomplete,
        "placeholder assignment finished"
    );

    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Primary image normalization
// ---------------------------------------------------------------------------

/// New position for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageOrderChange {
    pub image_id: i64,
    pub product_id: i64,
    pub sort_order: i64,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeOutcome {
    pub dry_run: bool,
    /// Image rows rewritten (or that would be).
    pub updated: usize,
    /// Distinct products among the updated rows.
    pub products: usize,
    #[serde(flatten)]
    pub errors: BatchErrors,
}

/// Computes the rows that break the primary-image convention.
///
/// Per product the images are ranked by `is_primary` (primary first), then
/// `sort_order`, then `id`. The first becomes the primary at position 0 and
/// the others follow at 1, 2, ... Only rows whose values change are returned.
#[must_use]
pub fn plan_image_order(images: &[ProductImage]) -> Vec<ImageOrderChange> {
    let mut by_product: BTreeMap<i64, Vec<&ProductImage>> = BTreeMap::new();
    for image in images {
        by_product.entry(image.product_id).or_default().push(image);
    }

    let mut changes = Vec::new();
    for (product_id, mut group) in by_product {
        group.sort_by_key(|i| (!i.is_primary, i.sort_order, i.id));
        for (position, image) in (0_i64..).zip(group) {
            let is_primary = position == 0;
            if image.sort_order != position || image.is_primary != is_primary {
                changes.push(ImageOrderChange {
                    image_id: image.id,
                    product_id,
                    sort_order: position,
                    is_primary,
                });
            }
        }
    }
    changes
}

/// Rewrites image positions so each product has exactly one primary image
/// at position 0.
///
/// # Errors
///
/// Returns [`ReconcileError::Db`] if the images cannot be read.
pub async fn normalize_primary_images(
    pool: &SqlitePool,
    dry_run: bool,
) -> Result<NormalizeOutcome, ReconcileError> {
    let images: Vec<ProductImage> = list_product_images(pool)
        .await?
        .into_iter()
        .map(ProductImage::from)
        .collect();
    let changes = plan_image_order(&images);

    tracing::info!(
        images = images.len(),
        planned = changes.len(),
        dry_run,
        "image order planned"
    );

    let mut outcome = NormalizeOutcome {
        dry_run,
        ..NormalizeOutcome::default()
    };
    let mut touched: BTreeSet<i64> = BTreeSet::new();

    for (index, change) in changes.iter().enumerate() {
        if !dry_run {
            match update_image_order(pool, change.image_id, change.sort_order, change.is_primary)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(image_id = change.image_id, "image row already gone");
                    continue;
                }
                Err(err) => {
                    let remaining = changes[index..].iter().map(|c| c.image_id);
                    match outcome.errors.store_error(change.image_id, &err, remaining) {
                        ControlFlow::Break(()) => break,
                        ControlFlow::Continue(()) => continue,
                    }
                }
            }
        }
        outcome.updated += 1;
        touched.insert(change.product_id);
    }
    outcome.products = touched.len();

    tracing::info!(
        updated = outcome.updated,
        products = outcome.products,
        failed = outcome.errors.failed(),
        incomplete = outcome.errors.incomplete,
        "image order normalized"
    );

    Ok(outcome)
}

#[cfg(test)]
#[path = "images_test.rs"]
mod tests;
