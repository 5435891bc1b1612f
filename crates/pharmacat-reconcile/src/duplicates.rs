//! Exact-duplicate product cleanup.
//!
//! Two products are duplicates when their case-folded trimmed name and
//! brand, their category and subcategory, and their price are all equal. The
//! lowest id in each group survives; images of the removed rows cascade.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use pharmacat_core::Product;
use pharmacat_db::{delete_product, list_products};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::ReconcileError;
use crate::types::BatchErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub keep: i64,
    pub name: String,
    /// Ascending.
    pub remove: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateOutcome {
    pub dry_run: bool,
    pub groups: Vec<DuplicateGroup>,
    /// Product ids deleted (or, in a dry run, that would be).
    pub removed: Vec<i64>,
    #[serde(flatten)]
    pub errors: BatchErrors,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DuplicateKey {
    name: String,
    brand: Option<String>,
    category: String,
    subcategory: Option<String>,
    price_bits: u64,
}

impl DuplicateKey {
    fn of(product: &Product) -> Self {
        Self {
            name: product.name.trim().to_lowercase(),
            brand: product.brand_trimmed().map(str::to_lowercase),
            category: product.category.trim().to_string(),
            subcategory: product.subcategory_trimmed().map(str::to_string),
            // -0.0 and 0.0 are the same price.
            price_bits: (product.price + 0.0).to_bits(),
        }
    }
}

/// Groups duplicate products. Groups are ordered by the id they keep.
#[must_use]
pub fn plan_duplicates(products: &[Product]) -> Vec<DuplicateGroup> {
    let mut by_key: BTreeMap<DuplicateKey, Vec<&Product>> = BTreeMap::new();
    for product in products {
        by_key.entry(DuplicateKey::of(product)).or_default().push(product);
    }

    let mut groups: Vec<DuplicateGroup> = by_key
        .into_values()
        .filter(|members| members.len() > 1)
        .filter_map(|mut members| {
            members.sort_by_key(|p| p.id);
            let (first, rest) = members.split_first()?;
            Some(DuplicateGroup {
                keep: first.id,
                name: first.name.clone(),
                remove: rest.iter().map(|p| p.id).collect(),
            })
        })
        .collect();
    groups.sort_by_key(|g| g.keep);
    groups
}

/// Deletes every duplicate except the oldest row of each group.
///
/// # Errors
///
/// Returns [`ReconcileError::Db`] if the products cannot be read.
pub async fn cleanup_duplicates(
    pool: &SqlitePool,
    dry_run: bool,
) -> Result<DuplicateOutcome, ReconcileError> {
    let products: Vec<Product> = list_products(pool, None)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    let groups = plan_duplicates(&products);
    let doomed: Vec<i64> = groups.iter().flat_map(|g| g.remove.iter().copied()).collect();

    tracing::info!(
        products = products.len(),
        groups = groups.len(),
        duplicates = doomed.len(),
        dry_run,
        "duplicate products found"
    );

    let mut outcome = DuplicateOutcome {
        dry_run,
        ..DuplicateOutcome::default()
    };

    for (index, &product_id) in doomed.iter().enumerate() {
        if !dry_run {
            match delete_product(pool, product_id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(product_id, "duplicate already gone");
                    continue;
                }
                Err(err) => {
                    match outcome
                        .errors
                        .store_error(product_id, &err, doomed[index..].iter().copied())
                    {
                        ControlFlow::Break(()) => break,
                        ControlFlow::Continue(()) => continue,
                    }
                }
            }
        }
        outcome.removed.push(product_id);
    }
    outcome.groups = groups;

    tracing::info!(
        removed = outcome.removed.len(),
        failed = outcome.errors.failed(),
        incomplete = outcome.errors.incomplete,
        "duplicate cleanup finished"
    );

    Ok(outcome)
}
