//! Error types for mirrorcal.

use thiserror::Error;

/// Result alias for mirrorcal operations.
pub type MirrorCalResult<T> = std::result::Result<T, MirrorCalError>;

/// Errors that can occur while simulating, searching or calibrating.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MirrorCalError {
    /// The input data or parameters are invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Position and response buffers have different lengths.
    #[error("length mismatch: {positions} positions vs {responses} responses")]
    LengthMismatch { positions: usize, responses: usize },
    /// No simulated sample landed inside the scan domain.
    #[error("empty histogram: none of the {samples} samples fell inside the scan domain")]
    EmptyHistogram { samples: usize },
    /// Too few distinct samples to pick a step or fit a quadratic.
    #[error("degenerate search window: {points} usable points, at least 3 required")]
    DegenerateWindow { points: usize },
    /// The quadratic fit has no usable vertex.
    #[error("numerically degenerate quadratic fit (c2 = {c2})")]
    NumericDegeneracy { c2: f64 },
    /// The local minimizer failed.
    #[error("optimizer failure: {0}")]
    Optimizer(String),
    /// Image encoding or file output failed.
    #[error("image I/O failed: {reason}")]
    ImageIo { reason: String },
}
