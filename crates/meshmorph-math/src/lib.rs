pub use glam::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::ops::{Mul, MulAssign};

/// Order in which the three Euler rotations are applied, e.g. `XYZ` rotates
/// around X first and around Z last.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum EulerOrder {
    XYZ = 0,
    XZY = 1,
    YZX = 2,
    YXZ = 3,
    ZXY = 4,
    ZYX = 5,
}

impl Default for EulerOrder {
    fn default() -> Self {
        EulerOrder::XYZ
    }
}

impl EulerOrder {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::XYZ),
            1 => Some(Self::XZY),
            2 => Some(Self::YZX),
            3 => Some(Self::YXZ),
            4 => Some(Self::ZXY),
            5 => Some(Self::ZYX),
            _ => None,
        }
    }

    /// Axes in application order, 0 = X, 1 = Y, 2 = Z.
    pub fn axes(self) -> [usize; 3] {
        match self {
            Self::XYZ => [0, 1, 2],
            Self::XZY => [0, 2, 1],
            Self::YZX => [1, 2, 0],
            Self::YXZ => [1, 0, 2],
            Self::ZXY => [2, 0, 1],
            Self::ZYX => [2, 1, 0],
        }
    }

    /// Rotation matrix for Euler angles given in degrees.
    pub fn rotation(self, degrees: DVec3) -> DMat4 {
        let angles = [
            degrees.x.to_radians(),
            degrees.y.to_radians(),
            degrees.z.to_radians(),
        ];

        self.axes().iter().fold(DMat4::IDENTITY, |acc, axis| {
            let r = match axis {
                0 => DMat4::from_rotation_x(angles[0]),
                1 => DMat4::from_rotation_y(angles[1]),
                _ => DMat4::from_rotation_z(angles[2]),
            };
            r * acc
        })
    }
}

/// Affine transform in double precision.
///
/// Matrices follow the column-vector convention: `a * b` applies `b` first.
/// The element layout matches the 16-value matrices stored in FBX files, so
/// [AffineMatrix::from_cols_array] accepts them without transposing.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(transparent)]
pub struct AffineMatrix(DMat4);

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<DMat4> for AffineMatrix {
    fn from(m: DMat4) -> Self {
        Self(m)
    }
}

impl From<AffineMatrix> for DMat4 {
    fn from(m: AffineMatrix) -> Self {
        m.0
    }
}

impl AffineMatrix {
    pub const IDENTITY: Self = Self(DMat4::IDENTITY);

    pub fn from_cols_array(values: &[f64; 16]) -> Self {
        Self(DMat4::from_cols_array(values))
    }

    pub fn to_cols_array(&self) -> [f64; 16] {
        self.0.to_cols_array()
    }

    pub fn from_translation(t: DVec3) -> Self {
        Self(DMat4::from_translation(t))
    }

    /// Rotation from Euler angles in degrees, applied in XYZ order.
    pub fn from_rotation(degrees: DVec3) -> Self {
        Self::from_rotation_ordered(EulerOrder::XYZ, degrees)
    }

    pub fn from_rotation_ordered(order: EulerOrder, degrees: DVec3) -> Self {
        Self(order.rotation(degrees))
    }

    pub fn from_scale(s: DVec3) -> Self {
        Self(DMat4::from_scale(s))
    }

    /// `T * R * S` with `R` given as XYZ Euler angles in degrees.
    pub fn from_trs(translation: DVec3, rotation: DVec3, scale: DVec3) -> Self {
        Self::from_translation(translation)
            * Self::from_rotation(rotation)
            * Self::from_scale(scale)
    }

    pub fn matrix(&self) -> &DMat4 {
        &self.0
    }

    #[inline]
    pub fn element(&self, row: usize, col: usize) -> f64 {
        self.0.col(col)[row]
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    pub fn translation(&self) -> DVec3 {
        self.0.w_axis.truncate()
    }

    /// Per-axis scale. A negative determinant is attributed to the X axis.
    pub fn scale(&self) -> DVec3 {
        let det = self.0.determinant();
        let s = DVec3::new(
            self.0.x_axis.truncate().length(),
            self.0.y_axis.truncate().length(),
            self.0.z_axis.truncate().length(),
        );
        if det < 0.0 {
            DVec3::new(-s.x, s.y, s.z)
        } else {
            s
        }
    }

    /// Pure rotation part, without translation and scale.
    pub fn rotation(&self) -> Self {
        let s = self.scale();
        let safe = |v: f64| if v.abs() > f64::EPSILON { v } else { 1.0 };
        Self(DMat4::from_cols(
            (self.0.x_axis.truncate() / safe(s.x)).extend(0.0),
            (self.0.y_axis.truncate() / safe(s.y)).extend(0.0),
            (self.0.z_axis.truncate() / safe(s.z)).extend(0.0),
            DVec4::W,
        ))
    }

    /// Euler angles in degrees of the rotation part for the given order.
    pub fn euler_degrees_ordered(&self, order: EulerOrder) -> DVec3 {
        let r = self.rotation();
        let [a, b, c] = order.axes();
        let parity = if (b + 3 - a) % 3 == 1 { 1.0 } else { -1.0 };

        let sin_b = (-parity * r.element(c, a)).max(-1.0).min(1.0);
        let beta = sin_b.asin();

        let (alpha, gamma) = if sin_b.abs() < 1.0 - 1e-12 {
            let alpha = (parity * r.element(c, b)).atan2(r.element(c, c));
            let gamma = (parity * r.element(b, a)).atan2(r.element(a, a));
            (alpha, gamma)
        } else {
            // Gimbal lock, fold the last rotation into the first.
            let alpha = (-parity * r.element(c, a) * r.element(a, b)).atan2(r.element(b, b));
            (alpha, 0.0)
        };

        let mut angles = [0.0; 3];
        angles[a] = alpha.to_degrees();
        angles[b] = beta.to_degrees();
        angles[c] = gamma.to_degrees();
        DVec3::from(angles)
    }

    /// Splits the matrix into translation, Euler degrees in `order` and scale.
    pub fn decompose_ordered(&self, order: EulerOrder) -> (DVec3, DVec3, DVec3) {
        (
            self.translation(),
            self.euler_degrees_ordered(order),
            self.scale(),
        )
    }

    /// Multiplies every element, including the homogeneous row.
    pub fn scaled(&self, value: f64) -> Self {
        Self(self.0 * value)
    }

    /// Element-wise sum.
    pub fn added(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    /// Adds `value` to all four diagonal elements.
    pub fn add_to_diagonal(&self, value: f64) -> Self {
        let mut m = self.0;
        m.x_axis.x += value;
        m.y_axis.y += value;
        m.z_axis.z += value;
        m.w_axis.w += value;
        Self(m)
    }

    #[inline]
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.0.transform_point3(p)
    }

    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f64) -> bool {
        self.0.abs_diff_eq(other.0, max_abs_diff)
    }

    pub fn is_identity(&self) -> bool {
        self.abs_diff_eq(&Self::IDENTITY, 1e-9)
    }
}

impl Mul for AffineMatrix {
    type Output = AffineMatrix;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl Mul<&AffineMatrix> for &AffineMatrix {
    type Output = AffineMatrix;

    fn mul(self, rhs: &AffineMatrix) -> Self::Output {
        AffineMatrix(self.0 * rhs.0)
    }
}

impl MulAssign for AffineMatrix {
    fn mul_assign(&mut self, rhs: Self) {
        self.0 = self.0 * rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_order_xyz_applies_x_first() {
        let degrees = DVec3::new(90.0, 0.0, 90.0);
        let m = AffineMatrix::from_rotation(degrees);
        // X then Z: +Y -> +Z -> +Z
        let p = m.transform_point(DVec3::Y);
        assert!(p.abs_diff_eq(DVec3::Z, 1e-9));

        let m = AffineMatrix::from_rotation_ordered(EulerOrder::ZYX, degrees);
        // Z then X: +Y -> -X -> -X
        let p = m.transform_point(DVec3::Y);
        assert!(p.abs_diff_eq(-DVec3::X, 1e-9));
    }

    #[test]
    fn decompose_restores_trs() {
        let t = DVec3::new(1.0, -2.0, 3.5);
        let r = DVec3::new(10.0, -35.0, 120.0);
        let s = DVec3::new(2.0, 0.5, 3.0);
        let m = AffineMatrix::from_trs(t, r, s);

        let (t2, r2, s2) = m.decompose_ordered(EulerOrder::XYZ);
        assert!(t2.abs_diff_eq(t, 1e-9));
        assert!(r2.abs_diff_eq(r, 1e-9));
        assert!(s2.abs_diff_eq(s, 1e-9));
        assert!(AffineMatrix::from_trs(t2, r2, s2).abs_diff_eq(&m, 1e-9));
    }

    #[test]
    fn decompose_handles_gimbal_lock() {
        let m = AffineMatrix::from_rotation(DVec3::new(30.0, 90.0, 0.0));
        let r = m.euler_degrees_ordered(EulerOrder::XYZ);
        assert!(AffineMatrix::from_rotation(r).abs_diff_eq(&m, 1e-9));

        let m = AffineMatrix::from_rotation(DVec3::new(-20.0, -90.0, 0.0));
        let r = m.euler_degrees_ordered(EulerOrder::XYZ);
        assert!(AffineMatrix::from_rotation(r).abs_diff_eq(&m, 1e-9));
    }

    #[test]
    fn decompose_supports_every_order() {
        let r = DVec3::new(-25.0, 40.0, 75.0);
        for index in 0..6 {
            let order = EulerOrder::from_index(index).unwrap();
            let m = AffineMatrix::from_rotation_ordered(order, r);
            let angles = m.euler_degrees_ordered(order);
            assert!(angles.abs_diff_eq(r, 1e-9), "{:?}: {:?}", order, angles);
        }
    }

    #[test]
    fn negative_scale_is_kept_on_x() {
        let m = AffineMatrix::from_scale(DVec3::new(-2.0, 1.0, 1.0));
        assert!(m.scale().abs_diff_eq(DVec3::new(-2.0, 1.0, 1.0), 1e-12));
        assert!(m.rotation().is_identity());
    }

    #[test]
    fn element_wise_operations() {
        let m = AffineMatrix::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let doubled = m.scaled(2.0);
        assert_eq!(doubled.element(0, 3), 2.0);
        assert_eq!(doubled.element(3, 3), 2.0);

        let sum = m.added(&AffineMatrix::IDENTITY);
        assert_eq!(sum.element(0, 0), 2.0);
        assert_eq!(sum.element(2, 3), 3.0);

        let diag = AffineMatrix::IDENTITY.scaled(0.0).add_to_diagonal(0.25);
        assert_eq!(diag.element(1, 1), 0.25);
        assert_eq!(diag.element(3, 3), 0.25);
        assert_eq!(diag.element(1, 0), 0.0);
    }

    #[test]
    fn composition_applies_right_operand_first() {
        let t = AffineMatrix::from_translation(DVec3::new(5.0, 0.0, 0.0));
        let s = AffineMatrix::from_scale(DVec3::splat(2.0));
        let p = (t * s).transform_point(DVec3::ONE);
        assert!(p.abs_diff_eq(DVec3::new(7.0, 2.0, 2.0), 1e-12));
        assert!((t * t.inverse()).is_identity());
    }
}
