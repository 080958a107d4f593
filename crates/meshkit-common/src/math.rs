//! 4x4 matrix and vector helpers built directly on `glam` storage types.
//!
//! `glam::Mat4` already has an `inverse()` method, but it assumes the matrix
//! is invertible; callers here need to know when it isn't (a degenerate
//! PRS, a zero-scale node), so the inverse is computed by hand via cofactor
//! expansion with an explicit determinant check instead.

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

const DET_EPSILON: f32 = 1.0e-12;

/// Builds a PRS matrix: `translation * rotation * scale`, matching the
/// composition order used throughout the format codecs (node local
/// matrices, 3DS/glTF TRS nodes).
pub fn prs(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_translation(translation) * Mat4::from_quat(rotation) * Mat4::from_scale(scale)
}

/// Transforms a point (applies translation).
pub fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    m.transform_point3(p)
}

/// Transforms a direction (normal/tangent): translation is ignored.
pub fn transform_dir(m: &Mat4, v: Vec3) -> Vec3 {
    m.transform_vector3(v)
}

/// The matrix used to transform normals/tangents under a general (possibly
/// non-uniform-scale) transform: the transpose of the inverse.
///
/// Returns `None` if `m` is singular.
pub fn dir_matrix(m: &Mat4) -> Option<Mat4> {
    inverse_checked(m).map(|inv| inv.transpose())
}

/// Cofactor-expansion 4x4 matrix inverse with a determinant check.
///
/// Returns `None` rather than a garbage matrix when `m` is singular (or
/// numerically indistinguishable from singular), unlike `Mat4::inverse`
/// which always returns a (possibly meaningless) result.
pub fn inverse_checked(m: &Mat4) -> Option<Mat4> {
    let a = m.to_cols_array();

    // a is column-major: a[col*4 + row]
    let get = |r: usize, c: usize| a[c * 4 + r];
    let cofactor = |row: usize, col: usize| {
        let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
        sign * minor3x3(&a, row, col)
    };

    let det = get(0, 0) * cofactor(0, 0)
        + get(0, 1) * cofactor(0, 1)
        + get(0, 2) * cofactor(0, 2)
        + get(0, 3) * cofactor(0, 3);
    if det.abs() < DET_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    // adjugate(row, col) = cofactor(col, row); stored column-major so
    // inv_array[col * 4 + row] = adjugate(row, col) / det.
    let mut inv = [0.0f32; 16];
    for row in 0..4 {
        for col in 0..4 {
            inv[col * 4 + row] = cofactor(col, row) * inv_det;
        }
    }
    Some(Mat4::from_cols_array(&inv))
}

/// Determinant of the 3x3 minor obtained by deleting `row` and `col` from
/// the column-major 4x4 array `a`.
fn minor3x3(a: &[f32; 16], row: usize, col: usize) -> f32 {
    let get = |r: usize, c: usize| a[c * 4 + r];
    let rows: Vec<usize> = (0..4).filter(|&r| r != row).collect();
    let cols: Vec<usize> = (0..4).filter(|&c| c != col).collect();

    let m = |ri: usize, ci: usize| get(rows[ri], cols[ci]);
    m(0, 0) * (m(1, 1) * m(2, 2) - m(1, 2) * m(2, 1))
        - m(0, 1) * (m(1, 0) * m(2, 2) - m(1, 2) * m(2, 0))
        + m(0, 2) * (m(1, 0) * m(2, 1) - m(1, 1) * m(2, 0))
}

/// Quaternion-to-matrix, exposed separately since some codecs (3DS) build
/// rotations directly from an angle/axis and need just the rotation part.
pub fn quat_matrix(q: Quat) -> Mat4 {
    Mat4::from_quat(q)
}
