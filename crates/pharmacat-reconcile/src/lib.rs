//! Catalog maintenance passes: reclassification, image repair, duplicate
//! cleanup, and the read-only consistency report.
//!
//! Every pass reads the current state, plans its writes in memory, then
//! applies them one row at a time. Row-level problems are recorded and
//! skipped; losing the store stops the pass and marks it incomplete.

pub mod duplicates;
pub mod engine;
pub mod error;
pub mod fs;
pub mod images;
pub mod report;
pub mod types;

pub use duplicates::{cleanup_duplicates, plan_duplicates, DuplicateGroup, DuplicateOutcome};
pub use engine::{
    apply_reclassification, plan_reclassification, reconcile, PlannedMove, ReclassificationPlan,
    ReconcileOptions,
};
pub use error::ReconcileError;
pub use fs::{check_location, check_reference, resolve_reference, ImageCheck};
pub use images::{
    assign_placeholders, normalize_primary_images, plan_image_order, repair_broken_images,
    ImageOrderChange, ImageRepairOutcome, NormalizeOutcome, PlaceholderOutcome,
};
pub use report::{
    build_report, consistency_report, CategoryCounts, ConsistencyReport, InvalidAssignment,
    ProductRef, SubcategoryCount, SubcategoryRef, NO_SUBCATEGORY,
};
pub use types::{BatchErrors, FailureKind, ReconcileOutcome, RowFailure, Transition};
