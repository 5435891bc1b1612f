//! Reclassification: bring stored category/subcategory pairs into agreement
//! with the rule set.

use std::collections::BTreeMap;
use std::ops::ControlFlow;

use pharmacat_core::{Assignment, Classifier, Product, Resolution, RuleSet};
use pharmacat_db::{list_products, update_product_classification};
use sqlx::SqlitePool;

use crate::error::ReconcileError;
use crate::types::{BatchErrors, FailureKind, ReconcileOutcome, RowFailure, Transition, ROW_CHANGED};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions<'a> {
    /// Only consider products whose stored category equals this value.
    pub category: Option<&'a str>,
    /// Compute and report the plan without writing.
    pub dry_run: bool,
}

/// One write the engine intends to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub product_id: i64,
    /// The values as stored, used as the compare-and-set guard.
    pub from: Assignment,
    pub to: Assignment,
    /// Rules applied on the way to `to`; empty for whitespace-only fixes.
    pub rule_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclassificationPlan {
    pub moves: Vec<PlannedMove>,
    pub unchanged: usize,
    pub failures: Vec<RowFailure>,
}

/// Classifies every product in memory and lists the writes needed.
///
/// A product whose stored subcategory is blank or padded but otherwise valid
/// is planned as a move to the trimmed value, so the store ends up holding
/// exactly what classification reads.
#[must_use]
pub fn plan_reclassification(rules: &RuleSet, products: &[Product]) -> ReclassificationPlan {
    let classifier = Classifier::new(rules);
    let mut plan = ReclassificationPlan::default();

    for product in products {
        let stored = Assignment {
            category: product.category.clone(),
            subcategory: product.subcategory.clone(),
        };
        match classifier.resolve(product) {
            Ok(Resolution::Reassign { to, rule_ids }) => plan.moves.push(PlannedMove {
                product_id: product.id,
                from: stored,
                to,
                rule_ids,
            }),
            Ok(Resolution::Unchanged) => {
                let normalized = Assignment::of(product);
                if normalized == stored {
                    plan.unchanged += 1;
                } else {
                    plan.moves.push(PlannedMove {
                        product_id: product.id,
                        from: stored,
                        to: normalized,
                        rule_ids: Vec::new(),
                    });
                }
            }
            Err(err) => plan.failures.push(RowFailure::new(
                product.id,
                FailureKind::Validation,
                err.to_string(),
            )),
        }
    }

    plan
}

/// Runs one reclassification pass.
///
/// Writes are applied one at a time and guarded by the values read at plan
/// time. A row edited in between is reported as a store failure and left
/// alone. Running the pass again with the same rules writes nothing.
///
/// # Errors
///
/// Returns [`ReconcileError::Db`] if the products cannot be read. Failures
/// while writing are reported on the outcome instead.
pub async fn reconcile(
    pool: &SqlitePool,
    rules: &RuleSet,
    options: ReconcileOptions<'_>,
) -> Result<ReconcileOutcome, ReconcileError> {
    let products: Vec<Product> = list_products(pool, options.category)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let plan = plan_reclassification(rules, &products);
    tracing::info!(
        products = products.len(),
        planned = plan.moves.len(),
        unchanged = plan.unchanged,
        invalid = plan.failures.len(),
        category = options.category.unwrap_or("*"),
        dry_run = options.dry_run,
        "reclassification planned"
    );

    Ok(apply_reclassification(pool, plan, options.dry_run).await)
}

/// Writes a plan to the store, one compare-and-set update per move.
///
/// A move whose row no longer holds the planned `from` assignment is skipped
/// as a store failure. Losing the connection stops the pass with the
/// unconfirmed moves listed in `remaining`.
pub async fn apply_reclassification(
    pool: &SqlitePool,
    plan: ReclassificationPlan,
    dry_run: bool,
) -> ReconcileOutcome {
    let mut errors = BatchErrors::default();
    for failure in plan.failures {
        errors.record(failure);
    }

    let mut transitions: BTreeMap<(Assignment, Assignment), usize> = BTreeMap::new();
    let mut changed = 0;

    for (index, mv) in plan.moves.iter().enumerate() {
        if !dry_run {
            let result = update_product_classification(
                pool,
                mv.product_id,
                &mv.from.category,
                mv.from.subcategory.as_deref(),
                &mv.to.category,
                mv.to.subcategory.as_deref(),
            )
            .await;

            match result {
                Ok(true) => {}
                Ok(false) => {
                    errors.record(RowFailure::new(mv.product_id, FailureKind::Store, ROW_CHANGED));
                    continue;
                }
                Err(err) => {
                    let remaining = plan.moves[index..].iter().map(|m| m.product_id);
                    match errors.store_error(mv.product_id, &err, remaining) {
                        ControlFlow::Break(()) => break,
                        ControlFlow::Continue(()) => continue,
                    }
                }
            }
        }

        tracing::debug!(
            product_id = mv.product_id,
            from = %mv.from,
            to = %mv.to,
            rules = %mv.rule_ids.join(","),
            "product reclassified"
        );
        changed += 1;
        *transitions
            .entry((mv.from.clone(), mv.to.clone()))
            .or_default() += 1;
    }

    let outcome = ReconcileOutcome {
        dry_run,
        changed,
        unchanged: plan.unchanged,
        transitions: transitions
            .into_iter()
            .map(|((from, to), count)| Transition { from, to, count })
            .collect(),
        errors,
    };

    tracing::info!(
        changed = outcome.changed,
        unchanged = outcome.unchanged,
        failed = outcome.failed(),
        incomplete = outcome.errors.incomplete,
        "reclassification finished"
    );

    outcome
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
