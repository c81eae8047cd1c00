#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

use nalgebra::{DMatrix, DVector};

mod affine;
mod ops;
mod types;
mod umeyama;

pub use crate::affine::fit_affine;
pub use crate::ops::transform_points;
pub use crate::types::EstimateError;
pub use crate::umeyama::{fit_euclidean, fit_similarity};

/// The family of transforms a fit is constrained to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelFamily {
    /// General linear map plus translation.
    #[default]
    Affine,
    /// Rotation plus translation.
    Euclidean,
    /// Rotation, uniform scale and translation.
    Similarity,
}

/// Estimate the transform of `family` that maps `dst` onto `src`.
///
/// Returns the (D + 1) x (D + 1) homogeneous matrix minimizing the
/// least-squares residual of the transformed `dst` points against `src`.
/// Applying the result to the destination cloud pulls it onto the source.
///
/// # Errors
///
/// Fails when the point sets disagree in length or dimension, or when the
/// correspondences are too few or too degenerate to pin the transform down.
pub fn estimate_transform(
    src: &[DVector<f64>],
    dst: &[DVector<f64>],
    family: ModelFamily,
) -> Result<DMatrix<f64>, EstimateError> {
    log::debug!(
        "estimating {family:?} transform from {} correspondences",
        src.len()
    );
    match family {
        ModelFamily::Affine => fit_affine(src, dst),
        ModelFamily::Euclidean => fit_euclidean(src, dst),
        ModelFamily::Similarity => fit_similarity(src, dst),
    }
}
