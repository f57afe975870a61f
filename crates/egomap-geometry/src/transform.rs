//! SE(3) rigid transforms.
//!
//! A pose is the 4×4 homogeneous matrix
//!
//! ```text
//! T = | R  t |      R ∈ SO(3)  (orthonormal, det = +1)
//!     | 0  1 |      t ∈ ℝ³
//! ```
//!
//! expressing a child frame in its parent: a point `p` given in the child
//! frame lands at `R·p + t` in the parent. `T_wa · T_ab = T_wb`.
//!
//! Two layers are provided:
//!
//! - Free functions over raw [`Matrix4`] values ([`is_valid`], [`inverse`],
//!   [`relative_pose`], [`displacement`]). Each one validates its input and
//!   fails with [`SpatialError::InvalidTransform`] rather than operating on a
//!   malformed matrix.
//! - [`RigidPose`], a newtype whose constructors all validate, so holding one
//!   is proof the invariant was checked at the boundary.
//!
//! # Example
//!
//! ```rust
//! use egomap_geometry::transform::RigidPose;
//!
//! // Camera A at the origin, camera B one metre along +X.
//! let a = RigidPose::identity();
//! let b = RigidPose::from_translation(1.0, 0.0, 0.0);
//!
//! // B seen from A is one metre ahead on X; A seen from B is one metre behind.
//! assert!((a.relative(&b).translation().x - 1.0).abs() < 1e-12);
//! assert!((b.relative(&a).translation().x + 1.0).abs() < 1e-12);
//! ```

use egomap_types::SpatialError;
use nalgebra::{DMatrix, Matrix3, Matrix4, Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Absolute tolerance used for the orthonormality and determinant checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Row-major plain representation of a pose, used on the wire.
pub type PoseRows = [[f64; 4]; 4];

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

/// Check `m` against the SE(3) invariant with tolerance `tolerance`.
///
/// On failure the error message names the first violated condition.
pub fn check(m: &Matrix4<f64>, tolerance: f64) -> Result<(), SpatialError> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(reject("matrix contains non-finite entries"));
    }
    if m[(3, 0)] != 0.0 || m[(3, 1)] != 0.0 || m[(3, 2)] != 0.0 || m[(3, 3)] != 1.0 {
        return Err(reject(&format!(
            "bottom row is [{}, {}, {}, {}], expected [0, 0, 0, 1]",
            m[(3, 0)],
            m[(3, 1)],
            m[(3, 2)],
            m[(3, 3)]
        )));
    }
    let r = rotation_block(m);
    let ortho_error = (r.transpose() * r - Matrix3::identity()).norm();
    if ortho_error >= tolerance {
        return Err(reject(&format!(
            "rotation block is not orthonormal (‖RᵀR − I‖ = {ortho_error:e})"
        )));
    }
    let det = r.determinant();
    if (det - 1.0).abs() >= tolerance {
        return Err(reject(&format!("rotation determinant is {det}, expected +1")));
    }
    Ok(())
}

fn reject(reason: &str) -> SpatialError {
    debug!(reason, "rejected rigid transform");
    SpatialError::InvalidTransform(reason.to_string())
}

/// `true` when `m` is a rigid transform within [`DEFAULT_TOLERANCE`].
pub fn is_valid(m: &Matrix4<f64>) -> bool {
    check(m, DEFAULT_TOLERANCE).is_ok()
}

/// `true` when `m` is a rigid transform within `tolerance`.
pub fn is_valid_with_tolerance(m: &Matrix4<f64>, tolerance: f64) -> bool {
    check(m, tolerance).is_ok()
}

// ────────────────────────────────────────────────────────────────────────────
// Free functions over raw matrices
// ────────────────────────────────────────────────────────────────────────────

/// Invert a rigid transform: `[[Rᵀ, −Rᵀt], [0, 0, 0, 1]]`.
///
/// Never falls back to a general matrix inverse: a malformed input is an
/// error.
pub fn inverse(m: &Matrix4<f64>) -> Result<Matrix4<f64>, SpatialError> {
    check(m, DEFAULT_TOLERANCE)?;
    Ok(rigid_inverse(m))
}

/// Pose of `b` expressed in the frame of `a`, i.e. `a⁻¹ · b`.
///
/// Both inputs must be poses in the same parent frame (`T_wa`, `T_wb`); the
/// result is `T_ab`.
pub fn relative_pose(a: &Matrix4<f64>, b: &Matrix4<f64>) -> Result<Matrix4<f64>, SpatialError> {
    check(b, DEFAULT_TOLERANCE)?;
    Ok(inverse(a)? * b)
}

/// Translation component `(x, y, z)` of a rigid transform.
pub fn displacement(m: &Matrix4<f64>) -> Result<Vector3<f64>, SpatialError> {
    check(m, DEFAULT_TOLERANCE)?;
    Ok(translation_block(m))
}

/// Euclidean length of the `(x, y)` part of a displacement.
pub fn planar_distance(v: &Vector3<f64>) -> f64 {
    v.x.hypot(v.y)
}

fn rotation_block(m: &Matrix4<f64>) -> Matrix3<f64> {
    m.fixed_view::<3, 3>(0, 0).into_owned()
}

fn translation_block(m: &Matrix4<f64>) -> Vector3<f64> {
    Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

fn assemble(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut m = Matrix4::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    m
}

fn rigid_inverse(m: &Matrix4<f64>) -> Matrix4<f64> {
    let r_t = rotation_block(m).transpose();
    let t = translation_block(m);
    assemble(&r_t, &(-(r_t * t)))
}

// ────────────────────────────────────────────────────────────────────────────
// RigidPose
// ────────────────────────────────────────────────────────────────────────────

/// A validated SE(3) pose.
///
/// The wrapped matrix satisfies the rigid-transform invariant; the only way
/// to obtain a `RigidPose` from untrusted data is through a constructor that
/// runs [`check`]. On the wire it is four rows of four numbers, and
/// deserialization validates again.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseRows", into = "PoseRows")]
pub struct RigidPose(Matrix4<f64>);

impl Default for RigidPose {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidPose {
    /// The identity pose.
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Validate and wrap a homogeneous matrix.
    pub fn try_new(matrix: Matrix4<f64>) -> Result<Self, SpatialError> {
        check(&matrix, DEFAULT_TOLERANCE)?;
        Ok(Self(matrix))
    }

    /// Build from four row-major rows.
    pub fn from_rows(rows: PoseRows) -> Result<Self, SpatialError> {
        Self::try_new(Matrix4::from_fn(|i, j| rows[i][j]))
    }

    /// Build from a flat row-major slice, which must hold exactly 16 values.
    pub fn from_row_slice(values: &[f64]) -> Result<Self, SpatialError> {
        if values.len() != 16 {
            return Err(reject(&format!(
                "expected 16 matrix entries, got {}",
                values.len()
            )));
        }
        Self::try_new(Matrix4::from_row_slice(values))
    }

    /// Build from a dynamically sized matrix, which must be 4×4.
    pub fn from_dmatrix(matrix: &DMatrix<f64>) -> Result<Self, SpatialError> {
        if matrix.shape() != (4, 4) {
            return Err(reject(&format!(
                "expected a 4x4 matrix, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        Self::try_new(Matrix4::from_fn(|i, j| matrix[(i, j)]))
    }

    /// Build from a rotation matrix and a translation vector.
    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Result<Self, SpatialError> {
        Self::try_new(assemble(&rotation, &translation))
    }

    /// A pure translation.
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self(assemble(&Matrix3::identity(), &Vector3::new(x, y, z)))
    }

    /// Build from a translation and a Hamilton quaternion given scalar-last
    /// as `[qx, qy, qz, qw]`.
    ///
    /// The quaternion is normalized first, so it only needs to be non-zero
    /// and finite.
    pub fn from_translation_quaternion(
        translation: Vector3<f64>,
        quaternion: [f64; 4],
    ) -> Result<Self, SpatialError> {
        let [qx, qy, qz, qw] = quaternion;
        let q = Quaternion::new(qw, qx, qy, qz);
        let norm = q.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(reject(&format!("quaternion norm {norm} cannot be normalized")));
        }
        let rotation = UnitQuaternion::from_quaternion(q).to_rotation_matrix().into_inner();
        Self::from_parts(rotation, translation)
    }

    /// The underlying homogeneous matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// The 3×3 rotation block.
    pub fn rotation(&self) -> Matrix3<f64> {
        rotation_block(&self.0)
    }

    /// The translation column `(x, y, z)`.
    pub fn translation(&self) -> Vector3<f64> {
        translation_block(&self.0)
    }

    /// Row-major copy of the matrix.
    pub fn to_rows(&self) -> PoseRows {
        std::array::from_fn(|i| std::array::from_fn(|j| self.0[(i, j)]))
    }

    /// The inverse pose.
    ///
    /// SE(3) is closed under inversion, so this cannot fail for a valid
    /// pose.
    pub fn inverse(&self) -> Self {
        Self(rigid_inverse(&self.0))
    }

    /// `self · other`, validated.
    ///
    /// If `self` is `T_wa` and `other` is `T_ab`, the result is `T_wb`.
    /// The product is re-checked so accumulated rounding can never slip an
    /// invalid pose into stored state.
    pub fn compose(&self, other: &Self) -> Result<Self, SpatialError> {
        Self::try_new(self.0 * other.0)
    }

    /// Pose of `other` expressed in this pose's frame, `self⁻¹ · other`.
    pub fn relative(&self, other: &Self) -> Self {
        Self(rigid_inverse(&self.0) * other.0)
    }

    /// Approximate equality of every matrix entry.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.0 - other.0).amax() <= tolerance
    }
}

impl TryFrom<PoseRows> for RigidPose {
    type Error = SpatialError;

    fn try_from(rows: PoseRows) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<RigidPose> for PoseRows {
    fn from(pose: RigidPose) -> Self {
        pose.to_rows()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
