use crate::{Result, StitchError};
use nalgebra::{DMatrix, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Added to the homogeneous coordinate before dividing when scoring inliers.
pub const PROJECTION_EPSILON: f64 = 1e-10;

/// A point correspondence `from -> to`, both in pixel coordinates `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPair {
    pub from: [f64; 2],
    pub to: [f64; 2],
}

impl PointPair {
    pub fn new(from: [f64; 2], to: [f64; 2]) -> Self {
        Self { from, to }
    }
}

/// 3x3 projective transform with its bottom-right entry fixed to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Pure translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            matrix: Matrix3::new(1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0),
        }
    }

    /// Rescale `matrix` so its bottom-right entry is 1.
    ///
    /// Fails with `DegenerateHomography` when that entry is zero or any entry
    /// is not finite.
    pub fn from_matrix(matrix: Matrix3<f64>) -> Result<Self> {
        let scale = matrix[(2, 2)];
        if !scale.is_finite() || scale.abs() < 1e-12 {
            return Err(StitchError::DegenerateHomography);
        }
        let matrix = matrix / scale;
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(StitchError::DegenerateHomography);
        }
        Ok(Self { matrix })
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Result<Self> {
        Self::from_matrix(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn rows(&self) -> [[f64; 3]; 3] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    /// Homogeneous image of `(x, y)` before the perspective divide.
    pub fn apply(&self, x: f64, y: f64) -> Vector3<f64> {
        self.matrix * Vector3::new(x, y, 1.0)
    }

    /// Map `(x, y)` and divide by the third coordinate.
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.apply(x, y);
        (p.x / p.z, p.y / p.z)
    }

    /// Like [`Homography::project`] with `PROJECTION_EPSILON` added to the divisor.
    pub fn project_guarded(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.apply(x, y);
        let w = p.z + PROJECTION_EPSILON;
        (p.x / w, p.y / w)
    }

    /// `translation(dx, dy) * self`.
    pub fn then_translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            matrix: Homography::translation(dx, dy).matrix * self.matrix,
        }
    }

    pub fn inverse(&self) -> Option<Matrix3<f64>> {
        self.matrix.try_inverse()
    }

    /// Largest absolute entry-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &Homography) -> f64 {
        (self.matrix - other.matrix).amax()
    }
}

/// Direct linear transform: the homography whose entries span the null space
/// of the `2n x 9` constraint matrix, normalized so `h[2][2] == 1`.
///
/// With more than 4 pairs this is the algebraic least-squares fit.
pub fn fit_homography(pairs: &[PointPair]) -> Result<Homography> {
    if pairs.len() < 4 {
        return Err(StitchError::InsufficientCorrespondences { found: pairs.len() });
    }

    let rows = 2 * pairs.len();
    let mut data = Vec::with_capacity(rows * 9);
    for pair in pairs {
        let [x1, y1] = pair.from;
        let [x2, y2] = pair.to;
        data.extend_from_slice(&[-x1, -y1, -1.0, 0.0, 0.0, 0.0, x1 * x2, y1 * x2, x2]);
        data.extend_from_slice(&[0.0, 0.0, 0.0, -x1, -y1, -1.0, x1 * y2, y1 * y2, y2]);
    }
    let a = DMatrix::from_row_slice(rows, 9, &data);

    let h = null_space_vector(a).ok_or(StitchError::HomographyEstimationFailed)?;
    Homography::from_matrix(Matrix3::from_row_slice(&h))
}

/// Right singular vector of the smallest singular value.
fn null_space_vector(a: DMatrix<f64>) -> Option<[f64; 9]> {
    let ncols = a.ncols();
    // The thin SVD of a matrix with fewer rows than columns drops the
    // null-space vectors; zero rows leave the null space unchanged.
    let a = if a.nrows() < ncols {
        let mut padded = DMatrix::zeros(ncols, ncols);
        padded.view_mut((0, 0), (a.nrows(), ncols)).copy_from(&a);
        padded
    } else {
        a
    };

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let smallest = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)?;

    let mut h = [0.0; 9];
    for (dst, src) in h.iter_mut().zip(v_t.row(smallest).iter()) {
        *dst = *src;
    }
    Some(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_matrix_normalizes_bottom_right() {
        let h = Homography::from_rows([[2.0, 0.0, 4.0], [0.0, 2.0, 6.0], [0.0, 0.0, 2.0]]).unwrap();
        assert_eq!(h.rows(), [[1.0, 0.0, 2.0], [0.0, 1.0, 3.0], [0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_zero_bottom_right_is_degenerate() {
        let err = Homography::from_rows([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]);
        assert!(matches!(err, Err(StitchError::DegenerateHomography)));
    }

    #[test]
    fn test_then_translate_shifts_projection() {
        let h = Homography::translation(3.0, -2.0).then_translate(10.0, 20.0);
        assert_eq!(h.project(1.0, 1.0), (14.0, 19.0));
        assert_eq!(h.matrix()[(2, 2)], 1.0);
    }

    #[test]
    fn test_fewer_than_four_pairs_is_rejected() {
        let pairs = vec![PointPair::new([0.0, 0.0], [1.0, 1.0]); 3];
        assert!(matches!(
            fit_homography(&pairs),
            Err(StitchError::InsufficientCorrespondences { found: 3 })
        ));
    }
}
