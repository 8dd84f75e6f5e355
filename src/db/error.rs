//! Shared error taxonomy for store operations.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Domain failures surfaced by store operations.
///
/// Local CRUD callers map these onto transport-appropriate statuses;
/// the NM federation layer instead collapses them into domain booleans.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("record not found")]
    NotFound,
    /// A uniqueness rule rejected the write.
    #[error("record already exists")]
    Conflict,
    /// No enrollment exists for the student/course pair.
    #[error("not enrolled")]
    NotEnrolled,
    /// The enrollment's completion deadline has passed.
    #[error("enrollment expired")]
    Expired,
    /// Input failed a domain validation rule.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Certificate rendering failed before any row was written.
    #[error(transparent)]
    Render(#[from] crate::cert::RenderError),
    #[error(transparent)]
    Diesel(DieselError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl From<DieselError> for StoreError {
    /// Unique-constraint violations become [`StoreError::Conflict`]; all
    /// other database errors pass through unchanged.
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Self::Conflict,
            DieselError::NotFound => Self::NotFound,
            other => Self::Diesel(other),
        }
    }
}
