// THEORY:
// Every failure in the blob engine is a broken caller contract, never a transient
// fault. The taxonomy:
// - `InvalidInput`: empty or mismatched rasters, polygons that break an algorithm's
//   precondition.
// - `ArgumentOutOfRange`: numeric parameters outside their domain.
// - `DegenerateGeometry`: a shape with too few vertices or no area for the query.
// - `LabelOverflow`: more regions than the label representation can hold.
//
// All validation runs before any state is touched, so an `Err` always means the
// blob set or track set is exactly as it was before the call.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlobError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("argument out of range: {0}")]
    ArgumentOutOfRange(String),

    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("label overflow: more than {max} regions")]
    LabelOverflow { max: u64 },
}

pub type Result<T> = std::result::Result<T, BlobError>;
