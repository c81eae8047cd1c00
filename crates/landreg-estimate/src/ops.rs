use nalgebra::{DMatrix, DVector};

use crate::types::EstimateError;

/// Check that two point sets form a usable correspondence list.
///
/// Returns `(n, d)` where `n` is the number of point pairs and `d` the
/// dimensionality shared by every point. A well-posed fit needs `n > d`.
pub(crate) fn validate_correspondences(
    src: &[DVector<f64>],
    dst: &[DVector<f64>],
) -> Result<(usize, usize), EstimateError> {
    if src.len() != dst.len() {
        return Err(EstimateError::MismatchedLengths {
            src: src.len(),
            dst: dst.len(),
        });
    }
    if src.is_empty() {
        return Err(EstimateError::InsufficientCorrespondences {
            required: 1,
            actual: 0,
        });
    }

    let d = src[0].len();
    if d == 0 {
        return Err(EstimateError::PointDimension {
            expected: 1,
            got: 0,
        });
    }
    for p in src.iter().chain(dst.iter()) {
        if p.len() != d {
            return Err(EstimateError::PointDimension {
                expected: d,
                got: p.len(),
            });
        }
    }

    let n = src.len();
    if n <= d {
        return Err(EstimateError::InsufficientCorrespondences {
            required: d + 1,
            actual: n,
        });
    }

    Ok((n, d))
}

/// Stack points into an `n x d` matrix, one point per row.
pub(crate) fn points_matrix(points: &[DVector<f64>], n: usize, d: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, d, |i, j| points[i][j])
}

/// Subtract the centroid from every row.
///
/// Returns the centered matrix and the centroid as a column vector.
pub(crate) fn demean(m: &DMatrix<f64>) -> (DMatrix<f64>, DVector<f64>) {
    let mean = m.row_mean();
    let centered = DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)] - mean[j]);
    (centered, mean.transpose())
}

/// Tolerance below which a singular value is treated as zero when computing
/// the numerical rank of a matrix of the given shape.
pub(crate) fn rank_tolerance(singular_values: &DVector<f64>, nrows: usize, ncols: usize) -> f64 {
    singular_values.max() * nrows.max(ncols) as f64 * f64::EPSILON
}

/// Embed a linear map and a translation into a single homogeneous matrix.
pub(crate) fn homogeneous_from_parts(
    linear: &DMatrix<f64>,
    translation: &DVector<f64>,
) -> DMatrix<f64> {
    let d = translation.len();
    let mut h = DMatrix::identity(d + 1, d + 1);
    h.view_mut((0, 0), (d, d)).copy_from(linear);
    h.view_mut((0, d), (d, 1)).copy_from(translation);
    h
}

/// Apply a homogeneous transform to a set of points.
///
/// # Arguments
///
/// * `transform` - A `(d+1) x (d+1)` homogeneous matrix with an affine
///   bottom row (`0 ... 0 1`), as produced by the estimators.
/// * `points` - Points of dimension `d`.
///
/// # Panics
///
/// Panics if the transform is not square or a point does not have
/// dimension `d`.
pub fn transform_points(transform: &DMatrix<f64>, points: &[DVector<f64>]) -> Vec<DVector<f64>> {
    assert_eq!(
        transform.nrows(),
        transform.ncols(),
        "transform must be square"
    );
    let d = transform.nrows() - 1;

    points
        .iter()
        .map(|p| {
            assert_eq!(p.len(), d, "point dimension must match the transform");
            let mut out = DVector::zeros(d);
            for r in 0..d {
                let mut acc = transform[(r, d)];
                for c in 0..d {
                    acc += transform[(r, c)] * p[c];
                }
                out[r] = acc;
            }
            out
        })
        .collect()
}
