use thiserror::Error;

/// Errors that stop a pass before it produces an outcome.
///
/// Per-row problems are not errors at this level; they are collected as
/// [`crate::RowFailure`] records on the outcome.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("database error: {0}")]
    Db(#[from] pharmacat_db::DbError),

    #[error("placeholder image {reference} is not usable: {reason}")]
    PlaceholderUnavailable { reference: String, reason: String },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

