//! Common data types shared across the transform estimators.

use thiserror::Error;

/// Error types for transform estimation.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// Invalid input data - the two point sets differ in length.
    #[error("Mismatched point counts: source has {src}, destination has {dst}")]
    MismatchedLengths {
        /// Number of points in the source set.
        src: usize,
        /// Number of points in the destination set.
        dst: usize,
    },

    /// Invalid input data - fewer correspondences than the fit requires.
    #[error("Estimation requires at least {required} point pairs, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of point pairs required (`ndim + 1`).
        required: usize,
        /// Actual number of point pairs provided.
        actual: usize,
    },

    /// Invalid input data - a point does not match the expected dimensionality.
    ///
    /// Zero-dimensional points are rejected with `expected = 1`.
    #[error("Point has dimension {got}, expected {expected}")]
    PointDimension {
        /// Dimensionality implied by the first source point.
        expected: usize,
        /// Dimensionality of the offending point.
        got: usize,
    },

    /// The point configuration does not span the space, so the fit is
    /// numerically unstable (e.g. collinear points in 2-D, coincident points).
    #[error("Degenerate point configuration: rank {rank}, need {required}")]
    DegenerateConfiguration {
        /// Numerical rank of the point configuration.
        rank: usize,
        /// Rank required for a stable fit.
        required: usize,
    },

    /// Singular value decomposition factors were unavailable.
    #[error("SVD computation failed")]
    SvdFailed,
}
