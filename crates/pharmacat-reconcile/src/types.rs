use std::ops::ControlFlow;

use pharmacat_core::Assignment;
use pharmacat_db::DbError;
use serde::Serialize;

/// Why a single row was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The row breaks an invariant and no rule repairs it.
    Validation,
    /// The store rejected the write, or the row changed under us.
    Store,
    /// The image file could not be inspected.
    Filesystem,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Store => write!(f, "store"),
            Self::Filesystem => write!(f, "filesystem"),
        }
    }
}

/// A skipped row. `id` is a product id or an image id depending on the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub id: i64,
    pub kind: FailureKind,
    pub message: String,
}

impl RowFailure {
    #[must_use]
    pub fn new(id: i64, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            message: message.into(),
        }
    }
}

pub(crate) const ROW_CHANGED: &str = "row changed concurrently";

/// Row failures plus the abort state of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchErrors {
    pub failures: Vec<RowFailure>,
    /// Set when the store became unreachable part way through.
    pub incomplete: bool,
    /// Rows that were planned but not confirmed written when the pass stopped.
    pub remaining: Vec<i64>,
}

impl BatchErrors {
    pub(crate) fn record(&mut self, failure: RowFailure) {
        tracing::warn!(
            row_id = failure.id,
            kind = %failure.kind,
            error = %failure.message,
            "row skipped"
        );
        self.failures.push(failure);
    }

    /// Records a failed write for row `id`.
    ///
    /// Connection loss breaks the batch: `remaining` (which must start with
    /// `id`) is kept for the outcome. Any other error skips just this row.
    pub(crate) fn store_error(
        &mut self,
        id: i64,
        err: &DbError,
        remaining: impl IntoIterator<Item = i64>,
    ) -> ControlFlow<()> {
        if err.is_connection_loss() {
            self.incomplete = true;
            self.remaining = remaining.into_iter().collect();
            tracing::error!(
                row_id = id,
                remaining = self.remaining.len(),
                error = %err,
                "lost connection to the catalog store; stopping"
            );
            return ControlFlow::Break(());
        }
        self.record(RowFailure::new(id, FailureKind::Store, err.to_string()));
        ControlFlow::Continue(())
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Products that moved between the same pair of assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: Assignment,
    pub to: Assignment,
    pub count: usize,
}

/// Result of one reclassification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub dry_run: bool,
    /// Rows written, or in a dry run, rows that would be written.
    pub changed: usize,
    pub unchanged: usize,
    /// Sorted by `from`, then `to`.
    pub transitions: Vec<Transition>,
    #[serde(flatten)]
    pub errors: BatchErrors,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.errors.failed()
    }
}
