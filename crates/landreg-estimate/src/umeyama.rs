//! Rigid and similarity alignment (Kabsch / Umeyama) in D dimensions.

use nalgebra::{DMatrix, DVector};

use crate::ops::{
    demean, homogeneous_from_parts, points_matrix, rank_tolerance, validate_correspondences,
};
use crate::types::EstimateError;

/// Fit a rigid transform (rotation + translation) mapping `dst` onto `src`
/// via orthogonal Procrustes. No scale, no shear.
pub fn fit_euclidean(
    src: &[DVector<f64>],
    dst: &[DVector<f64>],
) -> Result<DMatrix<f64>, EstimateError> {
    fit_umeyama(src, dst, false)
}

/// Fit a similarity transform (rotation + uniform scale + translation)
/// mapping `dst` onto `src`.
pub fn fit_similarity(
    src: &[DVector<f64>],
    dst: &[DVector<f64>],
) -> Result<DMatrix<f64>, EstimateError> {
    fit_umeyama(src, dst, true)
}

/// Umeyama's closed-form solution to the least-squares alignment problem.
///
/// Computes the SVD of the covariance between the centered point clouds and
/// builds the rotation as `U * S * V^T`, where `S` flips the weakest axis
/// whenever `det(U * V^T) < 0` so the result is always a proper rotation.
fn fit_umeyama(
    src: &[DVector<f64>],
    dst: &[DVector<f64>],
    with_scale: bool,
) -> Result<DMatrix<f64>, EstimateError> {
    let (n, d) = validate_correspondences(src, dst)?;

    let x = points_matrix(dst, n, d);
    let y = points_matrix(src, n, d);
    let (xc, x_centroid) = demean(&x);
    let (yc, y_centroid) = demean(&y);

    // Covariance between the centered clouds, mapping dst-space to src-space.
    let cov = yc.transpose() * &xc;
    let svd = cov.svd(true, true);
    let tol = rank_tolerance(&svd.singular_values, d, d);
    let rank = svd.rank(tol);
    if rank < d {
        return Err(EstimateError::DegenerateConfiguration { rank, required: d });
    }

    let u = svd.u.ok_or(EstimateError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(EstimateError::SvdFailed)?;

    let mut reflection = DMatrix::identity(d, d);
    if (&u * &v_t).determinant() < 0.0 {
        reflection[(d - 1, d - 1)] = -1.0;
    }
    let rotation = &u * &reflection * &v_t;

    let scale = if with_scale {
        let mut trace = 0.0;
        for i in 0..d {
            trace += svd.singular_values[i] * reflection[(i, i)];
        }
        trace / xc.norm_squared()
    } else {
        1.0
    };

    let linear = rotation * scale;
    let translation = y_centroid - &linear * x_centroid;

    Ok(homogeneous_from_parts(&linear, &translation))
}
