//! General D-dimensional affine least-squares fitting.

use nalgebra::{DMatrix, DVector};

use crate::ops::{
    demean, homogeneous_from_parts, points_matrix, rank_tolerance, validate_correspondences,
};
use crate::types::EstimateError;

/// Fit an affine transform mapping `dst` onto `src` by linear least squares.
///
/// The model has `d * (d + 1)` free parameters (a general linear part plus a
/// translation). Both point sets are centered first so the translation
/// decouples from the linear solve and the design matrix stays well
/// conditioned for coordinates far from the origin.
///
/// # Arguments
///
/// * `src` - Points the transform should map onto, shape `(n, d)`.
/// * `dst` - Points the transform maps from, shape `(n, d)` with `n > d`.
///
/// # Returns
///
/// A `(d+1) x (d+1)` homogeneous matrix `T` minimizing `sum ||T(dst_i) - src_i||^2`.
pub fn fit_affine(
    src: &[DVector<f64>],
    dst: &[DVector<f64>],
) -> Result<DMatrix<f64>, EstimateError> {
    let (n, d) = validate_correspondences(src, dst)?;

    let x = points_matrix(dst, n, d);
    let y = points_matrix(src, n, d);
    let (xc, x_centroid) = demean(&x);
    let (yc, y_centroid) = demean(&y);

    let svd = xc.svd(true, true);
    let tol = rank_tolerance(&svd.singular_values, n, d);
    let rank = svd.rank(tol);
    if rank < d {
        return Err(EstimateError::DegenerateConfiguration { rank, required: d });
    }

    // Solve Xc * P ~= Yc; rows are points, so the linear part is P^T.
    let params = svd
        .solve(&yc, tol)
        .map_err(|_| EstimateError::SvdFailed)?;
    let linear = params.transpose();
    let translation = y_centroid - &linear * x_centroid;

    Ok(homogeneous_from_parts(&linear, &translation))
}
