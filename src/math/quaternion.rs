//! 旋转四元数

use std::f64::consts::PI;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};

use glam::{DQuat, DVec3};

use super::{hash_f64, Matrix3d, EPSILON};
use crate::{EngineError, Result};

/// 四元数 (x, y, z, w)
///
/// 归一化时表示旋转，否则是一般的四元数代数元素。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    pub fn xyz(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    pub fn add(&self, q: &Quaternion) -> Self {
        Self::new(self.x + q.x, self.y + q.y, self.z + q.z, self.w + q.w)
    }

    pub fn sub(&self, q: &Quaternion) -> Self {
        Self::new(self.x - q.x, self.y - q.y, self.z - q.z, self.w - q.w)
    }

    pub fn mul_scalar(&self, a: f64) -> Self {
        Self::new(self.x * a, self.y * a, self.z * a, self.w * a)
    }

    pub fn div_scalar(&self, a: f64) -> Self {
        Self::new(self.x / a, self.y / a, self.z / a, self.w / a)
    }

    /// Hamilton 积：`(self * q).rotate(v) == self.rotate(q.rotate(v))`
    pub fn mul(&self, q: &Quaternion) -> Self {
        Self::new(
            self.w * q.x + self.x * q.w + self.y * q.z - self.z * q.y,
            self.w * q.y + self.y * q.w + self.z * q.x - self.x * q.z,
            self.w * q.z + self.z * q.w + self.x * q.y - self.y * q.x,
            self.w * q.w - self.x * q.x - self.y * q.y - self.z * q.z,
        )
    }

    /// `self * q⁻¹`
    pub fn div(&self, q: &Quaternion) -> Result<Self> {
        Ok(self.mul(&q.invert()?))
    }

    #[inline]
    pub fn dot(&self, q: Quaternion) -> f64 {
        self.x * q.x + self.y * q.y + self.z * q.z + self.w * q.w
    }

    #[inline]
    pub fn length_squared(&self) -> f64 {
        self.dot(*self)
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn normalize(&self) -> Result<Self> {
        let length = self.length();
        if length.abs() < EPSILON {
            return Err(EngineError::arithmetic("Cannot normalize the zero quaternion"));
        }
        Ok(self.div_scalar(length))
    }

    #[inline]
    pub fn conjugate(&self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// `a⁻¹ = conjugate(a) / |a|²`
    pub fn invert(&self) -> Result<Self> {
        let length_squared = self.length_squared();
        if length_squared.abs() < EPSILON {
            return Err(EngineError::arithmetic("Cannot invert a quaternion of length zero"));
        }
        Ok(self.conjugate().div_scalar(length_squared))
    }

    /// 夹心积旋转向量（先归一化）
    pub fn rotate(&self, v: DVec3) -> Result<DVec3> {
        let length = self.length();
        if length.abs() < EPSILON {
            return Err(EngineError::arithmetic("Cannot rotate by the zero quaternion"));
        }
        let n = self.div_scalar(length);
        let u = n.xyz();
        let t = 2.0 * u.cross(v);
        Ok(v + n.w * t + u.cross(t))
    }

    /// +Z 轴旋转后的方向
    pub fn direction(&self) -> Result<DVec3> {
        self.rotate(DVec3::Z)
    }

    /// 旋转轴与角度（弧度，[0, 2π)）
    ///
    /// 角度接近零时轴无定义，返回 +X。
    pub fn axis_angle_rad(&self) -> Result<(DVec3, f64)> {
        let n = self.normalize()?;
        let angle = 2.0 * n.w.clamp(-1.0, 1.0).acos();
        let s = (1.0 - n.w * n.w).max(0.0).sqrt();
        let axis = if s < EPSILON { DVec3::X } else { n.xyz() / s };
        Ok((axis, angle))
    }

    pub fn axis(&self) -> Result<DVec3> {
        Ok(self.axis_angle_rad()?.0)
    }

    pub fn angle_rad(&self) -> Result<f64> {
        Ok(self.axis_angle_rad()?.1)
    }

    pub fn angle_deg(&self) -> Result<f64> {
        Ok(self.angle_rad()?.to_degrees())
    }

    /// 欧拉角 (pitch, yaw, roll)，弧度
    ///
    /// 与 [`Quaternion::from_axes_angles_rad`] 的组合顺序互逆，接近万向锁时 roll 记为 0。
    pub fn axes_angles_rad(&self) -> DVec3 {
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);
        let test = w * x - y * z;
        if test.abs() < 0.4999 {
            let roll = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (x * x + z * z));
            let pitch = (2.0 * test).asin();
            let yaw = (2.0 * (w * y + z * x)).atan2(1.0 - 2.0 * (x * x + y * y));
            DVec3::new(pitch, yaw, roll)
        } else {
            let sign = if test < 0.0 { -1.0 } else { 1.0 };
            DVec3::new(sign * PI / 2.0, -sign * 2.0 * z.atan2(w), 0.0)
        }
    }

    pub fn axes_angles_deg(&self) -> DVec3 {
        self.axes_angles_rad() * (180.0 / PI)
    }

    // ========================================
    // 构造
    // ========================================

    /// 绕轴旋转（轴无需归一化，零长度轴视为不旋转）
    pub fn from_angle_rad_axis(angle: f64, axis: DVec3) -> Self {
        let length = axis.length();
        if length < EPSILON {
            return Self::IDENTITY;
        }
        let half = angle / 2.0;
        let q = half.sin() / length;
        Self::new(axis.x * q, axis.y * q, axis.z * q, half.cos())
    }

    pub fn from_angle_deg_axis(angle: f64, axis: DVec3) -> Self {
        Self::from_angle_rad_axis(angle.to_radians(), axis)
    }

    /// 固定组合顺序：yaw(Y) * pitch(X) * roll(Z)
    pub fn from_axes_angles_rad(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self::from_angle_rad_axis(yaw, DVec3::Y)
            * Self::from_angle_rad_axis(pitch, DVec3::X)
            * Self::from_angle_rad_axis(roll, DVec3::Z)
    }

    pub fn from_axes_angles_deg(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self::from_axes_angles_rad(pitch.to_radians(), yaw.to_radians(), roll.to_radians())
    }

    /// 把 from 方向转到 to 方向的最短旋转
    pub fn from_rotation_to(from: DVec3, to: DVec3) -> Result<Self> {
        let lengths = from.length() * to.length();
        if lengths < EPSILON {
            return Err(EngineError::arithmetic("Cannot rotate from or to a zero vector"));
        }
        let cos = (from.dot(to) / lengths).clamp(-1.0, 1.0);
        let axis = from.cross(to);
        if axis.length() < EPSILON * lengths {
            if cos > 0.0 {
                return Ok(Self::IDENTITY);
            }
            // 反向：绕任一垂直轴转 180 度
            return Ok(Self::from_angle_rad_axis(PI, from.any_orthogonal_vector()));
        }
        Ok(Self::from_angle_rad_axis(cos.acos(), axis))
    }

    /// 从旋转矩阵提取（按迹与最大对角元素分 4 支，避免 180 度附近的数值不稳定）
    pub fn from_rotation_matrix(m: &Matrix3d) -> Self {
        let m = &m.m;
        let trace = m[0][0] + m[1][1] + m[2][2];
        if trace > 0.0 {
            let r = (trace + 1.0).sqrt();
            let s = 0.5 / r;
            Self::new(
                (m[2][1] - m[1][2]) * s,
                (m[0][2] - m[2][0]) * s,
                (m[1][0] - m[0][1]) * s,
                0.5 * r,
            )
        } else if m[0][0] >= m[1][1] && m[0][0] >= m[2][2] {
            let r = (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt();
            let s = 0.5 / r;
            Self::new(
                0.5 * r,
                (m[0][1] + m[1][0]) * s,
                (m[0][2] + m[2][0]) * s,
                (m[2][1] - m[1][2]) * s,
            )
        } else if m[1][1] >= m[2][2] {
            let r = (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt();
            let s = 0.5 / r;
            Self::new(
                (m[0][1] + m[1][0]) * s,
                0.5 * r,
                (m[1][2] + m[2][1]) * s,
                (m[0][2] - m[2][0]) * s,
            )
        } else {
            let r = (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt();
            let s = 0.5 / r;
            Self::new(
                (m[0][2] + m[2][0]) * s,
                (m[1][2] + m[2][1]) * s,
                0.5 * r,
                (m[1][0] - m[0][1]) * s,
            )
        }
    }

    /// 旋转矩阵（先归一化）
    pub fn to_rotation_matrix(&self) -> Result<Matrix3d> {
        let q = self.normalize()?;
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        Ok(Matrix3d::new(
            1.0 - 2.0 * (y * y + z * z), 2.0 * (x * y - z * w), 2.0 * (x * z + y * w),
            2.0 * (x * y + z * w), 1.0 - 2.0 * (x * x + z * z), 2.0 * (y * z - x * w),
            2.0 * (x * z - y * w), 2.0 * (y * z + x * w), 1.0 - 2.0 * (x * x + y * y),
        ))
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Hash for Quaternion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_f64(self.x, state);
        hash_f64(self.y, state);
        hash_f64(self.z, state);
        hash_f64(self.w, state);
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: Quaternion) -> Quaternion {
        Quaternion::mul(&self, &rhs)
    }
}

impl Mul<f64> for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: f64) -> Quaternion {
        self.mul_scalar(rhs)
    }
}

impl Add for Quaternion {
    type Output = Quaternion;

    fn add(self, rhs: Quaternion) -> Quaternion {
        Quaternion::add(&self, &rhs)
    }
}

impl Sub for Quaternion {
    type Output = Quaternion;

    fn sub(self, rhs: Quaternion) -> Quaternion {
        Quaternion::sub(&self, &rhs)
    }
}

impl Neg for Quaternion {
    type Output = Quaternion;

    fn neg(self) -> Quaternion {
        Quaternion::new(-self.x, -self.y, -self.z, -self.w)
    }
}

impl From<DQuat> for Quaternion {
    fn from(q: DQuat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

impl From<Quaternion> for DQuat {
    fn from(q: Quaternion) -> Self {
        DQuat::from_xyzw(q.x, q.y, q.z, q.w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::test_util::{approx, approx_rotation, approx_vec};

    fn samples() -> Vec<Quaternion> {
        vec![
            Quaternion::from_angle_deg_axis(30.0, DVec3::new(1.0, 1.0, 0.0)),
            Quaternion::from_angle_deg_axis(179.0, DVec3::new(0.2, -1.0, 0.4)),
            Quaternion::from_axes_angles_deg(10.0, 80.0, -45.0),
            Quaternion::new(0.1, -0.4, 0.3, 2.0),
        ]
    }

    #[test]
    fn test_rotation_preserves_length() {
        let v = DVec3::new(1.5, -2.0, 0.75);
        for q in samples() {
            let r = q.rotate(v).unwrap();
            assert!(approx(r.length(), v.length()));
        }
    }

    #[test]
    fn test_composition_order() {
        let v = DVec3::new(0.3, 1.0, -2.0);
        let qs = samples();
        for p in &qs {
            for q in &qs {
                let p = p.normalize().unwrap();
                let q = q.normalize().unwrap();
                let combined = (p * q).rotate(v).unwrap();
                let nested = p.rotate(q.rotate(v).unwrap()).unwrap();
                assert!(approx_vec(combined, nested));
            }
        }
    }

    #[test]
    fn test_rotate_matches_nalgebra() {
        let axis = DVec3::new(0.2, -1.0, 0.4);
        let q = Quaternion::from_angle_rad_axis(1.3, axis);
        let reference = nalgebra::UnitQuaternion::from_axis_angle(
            &nalgebra::Unit::new_normalize(nalgebra::Vector3::new(axis.x, axis.y, axis.z)),
            1.3,
        );
        let v = DVec3::new(1.0, 2.0, 3.0);
        let expected = reference * nalgebra::Vector3::new(v.x, v.y, v.z);
        let actual = q.rotate(v).unwrap();
        assert!(approx_vec(actual, DVec3::new(expected.x, expected.y, expected.z)));
    }

    #[test]
    fn test_zero_quaternion_errors() {
        assert!(matches!(Quaternion::ZERO.normalize(), Err(EngineError::Arithmetic(_))));
        assert!(matches!(Quaternion::ZERO.invert(), Err(EngineError::Arithmetic(_))));
        assert!(matches!(Quaternion::ZERO.rotate(DVec3::X), Err(EngineError::Arithmetic(_))));
    }

    #[test]
    fn test_invert_identity() {
        for q in samples() {
            let product = q * q.invert().unwrap();
            assert!(approx_rotation(product, Quaternion::IDENTITY));
            assert!(approx(product.length(), 1.0));
        }
    }

    #[test]
    fn test_axis_angle_roundtrip() {
        let axis = DVec3::new(1.0, -2.0, 0.5).normalize();
        for angle in [0.1, 1.0, 2.5, PI - 0.01] {
            let q = Quaternion::from_angle_rad_axis(angle, axis);
            let (read_axis, read_angle) = q.axis_angle_rad().unwrap();
            assert!(approx(read_angle, angle));
            assert!(approx_vec(read_axis, axis));
        }
    }

    #[test]
    fn test_axes_angles_roundtrip() {
        let q = Quaternion::from_axes_angles_rad(0.3, -0.7, 1.1);
        let angles = q.axes_angles_rad();
        assert!(approx_vec(angles, DVec3::new(0.3, -0.7, 1.1)));
    }

    #[test]
    fn test_axes_angles_gimbal_lock() {
        for pitch in [PI / 2.0, -PI / 2.0] {
            let q = Quaternion::from_axes_angles_rad(pitch, 0.3, 0.2);
            let angles = q.axes_angles_rad();
            assert!(approx(angles.x, pitch));
            // 万向锁时 roll 并入 yaw
            assert_eq!(angles.z, 0.0);
            let rebuilt = Quaternion::from_axes_angles_rad(angles.x, angles.y, angles.z);
            assert!(approx_rotation(rebuilt, q), "{} -> {}", q, rebuilt);
        }
        let up = Quaternion::from_axes_angles_rad(PI / 2.0, 0.3, 0.2).axes_angles_rad();
        assert!(approx(up.y, 0.1));
        let down = Quaternion::from_axes_angles_rad(-PI / 2.0, 0.3, 0.2).axes_angles_rad();
        assert!(approx(down.y, 0.5));
    }

    #[test]
    fn test_rotation_matrix_roundtrip() {
        // 覆盖迹为负的各分支
        let cases = [
            Quaternion::from_angle_deg_axis(170.0, DVec3::X),
            Quaternion::from_angle_deg_axis(175.0, DVec3::Y),
            Quaternion::from_angle_deg_axis(179.5, DVec3::Z),
            Quaternion::from_angle_deg_axis(40.0, DVec3::new(1.0, 2.0, 3.0)),
            Quaternion::from_angle_deg_axis(180.0, DVec3::new(1.0, 1.0, 0.0)),
        ];
        for q in cases {
            let m = q.to_rotation_matrix().unwrap();
            let back = Quaternion::from_rotation_matrix(&m);
            assert!(approx_rotation(back, q), "{} -> {}", q, back);
        }
    }

    #[test]
    fn test_rotation_matrix_matches_rotate() {
        let q = samples()[2];
        let m = q.to_rotation_matrix().unwrap();
        let v = DVec3::new(-1.0, 0.5, 2.0);
        assert!(approx_vec(m.transform(v), q.rotate(v).unwrap()));
    }

    #[test]
    fn test_from_rotation_to() {
        let from = DVec3::new(1.0, 0.0, 0.0);
        let to = DVec3::new(0.0, 3.0, 0.0);
        let q = Quaternion::from_rotation_to(from, to).unwrap();
        assert!(approx_vec(q.rotate(from).unwrap(), DVec3::Y));

        let back = Quaternion::from_rotation_to(from, -from).unwrap();
        assert!(approx_vec(back.rotate(from).unwrap(), -from));
        assert!(Quaternion::from_rotation_to(DVec3::ZERO, to).is_err());
    }

    #[test]
    fn test_direction() {
        let q = Quaternion::from_angle_deg_axis(90.0, DVec3::Y);
        assert!(approx_vec(q.direction().unwrap(), DVec3::X));
    }
}
