//! 3x3 双精度矩阵

use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, MulAssign, Neg, Sub};

use glam::{DMat3, DVec2, DVec3};

use super::{hash_f64, Quaternion, EPSILON};
use crate::{EngineError, Result};

/// 不可变 3x3 矩阵（行主序）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix3d {
    pub(crate) m: [[f64; 3]; 3],
}

impl Matrix3d {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub const ZERO: Self = Self { m: [[0.0; 3]; 3] };

    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        m00: f64, m01: f64, m02: f64,
        m10: f64, m11: f64, m12: f64,
        m20: f64, m21: f64, m22: f64,
    ) -> Self {
        Self { m: [[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]] }
    }

    #[inline]
    pub const fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self { m: rows }
    }

    /// 由三个列向量创建
    pub fn from_cols(x: DVec3, y: DVec3, z: DVec3) -> Self {
        Self::new(
            x.x, y.x, z.x,
            x.y, y.y, z.y,
            x.z, y.z, z.z,
        )
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row][col]
    }

    #[inline]
    pub fn col(&self, col: usize) -> DVec3 {
        DVec3::new(self.m[0][col], self.m[1][col], self.m[2][col])
    }

    #[inline]
    pub fn row(&self, row: usize) -> DVec3 {
        DVec3::from_array(self.m[row])
    }

    pub fn add(&self, other: &Matrix3d) -> Self {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix3d) -> Self {
        self.zip_map(other, |a, b| a - b)
    }

    pub fn mul_scalar(&self, a: f64) -> Self {
        self.map(|v| v * a)
    }

    pub fn div_scalar(&self, a: f64) -> Self {
        self.map(|v| v / a)
    }

    pub fn negate(&self) -> Self {
        self.map(|v| -v)
    }

    /// `self * other⁻¹`，other 不可逆时失败
    pub fn div(&self, other: &Matrix3d) -> Result<Self> {
        Ok(self.mul(&other.invert()?))
    }

    /// 逐元素乘方
    pub fn pow(&self, exponent: f64) -> Self {
        self.map(|v| v.powf(exponent))
    }

    pub fn abs(&self) -> Self {
        self.map(f64::abs)
    }

    pub fn floor(&self) -> Self {
        self.map(f64::floor)
    }

    pub fn ceil(&self) -> Self {
        self.map(f64::ceil)
    }

    pub fn round(&self) -> Self {
        self.map(f64::round)
    }

    /// 矩阵乘法：结果先应用 other 再应用 self
    pub fn mul(&self, other: &Matrix3d) -> Self {
        let a = &self.m;
        let b = &other.m;
        let mut out = [[0.0; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c];
            }
        }
        Self { m: out }
    }

    pub fn transpose(&self) -> Self {
        let m = &self.m;
        Self::new(
            m[0][0], m[1][0], m[2][0],
            m[0][1], m[1][1], m[2][1],
            m[0][2], m[1][2], m[2][2],
        )
    }

    #[inline]
    pub fn trace(&self) -> f64 {
        self.m[0][0] + self.m[1][1] + self.m[2][2]
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// 伴随矩阵法求逆，行列式接近零时失败
    pub fn invert(&self) -> Result<Self> {
        let det = self.determinant();
        if det.abs() < EPSILON {
            return Err(EngineError::arithmetic("Cannot invert a matrix with a zero determinant"));
        }
        Ok(self.cofactor_inverse(det))
    }

    /// 伴随矩阵 / det，不检查行列式
    pub(crate) fn cofactor_inverse(&self, det: f64) -> Self {
        let m = &self.m;
        Self::new(
            (m[1][1] * m[2][2] - m[2][1] * m[1][2]) / det,
            -(m[0][1] * m[2][2] - m[2][1] * m[0][2]) / det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
            -(m[1][0] * m[2][2] - m[2][0] * m[1][2]) / det,
            (m[0][0] * m[2][2] - m[2][0] * m[0][2]) / det,
            -(m[0][0] * m[1][2] - m[1][0] * m[0][2]) / det,
            (m[1][0] * m[2][1] - m[2][0] * m[1][1]) / det,
            -(m[0][0] * m[2][1] - m[2][0] * m[0][1]) / det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
        )
    }

    /// 列向量逐轴伪逆：长度小于 EPSILON 的轴求逆为零，不会失败
    ///
    /// 仅当各列互相正交（旋转 * 缩放）时与真逆一致。
    pub fn invert_axes(&self) -> Self {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            let axis = self.col(i);
            let len_sq = axis.length_squared();
            if len_sq >= EPSILON * EPSILON {
                *row = (axis / len_sq).to_array();
            }
        }
        Self { m: out }
    }

    #[inline]
    pub fn transform(&self, v: DVec3) -> DVec3 {
        let m = &self.m;
        DVec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// 追加缩放（先缩放再应用 self）
    pub fn scale(&self, s: DVec3) -> Self {
        self.mul(&Self::create_scaling(s))
    }

    /// 追加旋转（先旋转再应用 self）
    pub fn rotate(&self, rotation: Quaternion) -> Result<Self> {
        Ok(self.mul(&Self::create_rotation(rotation)?))
    }

    // ========== 2D 仿射（增广矩阵） ==========

    pub fn create_translation_2d(v: DVec2) -> Self {
        Self::new(
            1.0, 0.0, v.x,
            0.0, 1.0, v.y,
            0.0, 0.0, 1.0,
        )
    }

    /// 追加 2D 平移：`self * T(v)`
    pub fn translate_2d(&self, v: DVec2) -> Self {
        self.mul(&Self::create_translation_2d(v))
    }

    /// 把 2D 点作为 (x, y, 1) 变换
    #[inline]
    pub fn transform_2d(&self, p: DVec2) -> DVec2 {
        let m = &self.m;
        DVec2::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2],
        )
    }

    pub fn create_scaling(s: DVec3) -> Self {
        Self::new(
            s.x, 0.0, 0.0,
            0.0, s.y, 0.0,
            0.0, 0.0, s.z,
        )
    }

    /// 旋转矩阵（四元数先归一化，零四元数失败）
    pub fn create_rotation(rotation: Quaternion) -> Result<Self> {
        rotation.to_rotation_matrix()
    }

    pub fn to_array(&self, column_major: bool) -> [f64; 9] {
        let m = if column_major { self.transpose().m } else { self.m };
        [
            m[0][0], m[0][1], m[0][2],
            m[1][0], m[1][1], m[1][2],
            m[2][0], m[2][1], m[2][2],
        ]
    }

    #[inline]
    pub fn to_mutable(&self) -> MutableMatrix3d {
        MutableMatrix3d { m: self.m }
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let mut out = self.m;
        out.iter_mut().flatten().for_each(|v| *v = f(*v));
        Self { m: out }
    }

    fn zip_map(&self, other: &Matrix3d, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut out = self.m;
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = f(*cell, other.m[r][c]);
            }
        }
        Self { m: out }
    }
}

impl Default for Matrix3d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Hash for Matrix3d {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.m.iter().flatten().for_each(|v| hash_f64(*v, state));
    }
}

impl Mul for Matrix3d {
    type Output = Matrix3d;

    fn mul(self, rhs: Matrix3d) -> Matrix3d {
        Matrix3d::mul(&self, &rhs)
    }
}

impl Mul<DVec3> for Matrix3d {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> DVec3 {
        self.transform(rhs)
    }
}

impl Mul<f64> for Matrix3d {
    type Output = Matrix3d;

    fn mul(self, rhs: f64) -> Matrix3d {
        self.mul_scalar(rhs)
    }
}

impl Add for Matrix3d {
    type Output = Matrix3d;

    fn add(self, rhs: Matrix3d) -> Matrix3d {
        Matrix3d::add(&self, &rhs)
    }
}

impl Sub for Matrix3d {
    type Output = Matrix3d;

    fn sub(self, rhs: Matrix3d) -> Matrix3d {
        Matrix3d::sub(&self, &rhs)
    }
}

impl Neg for Matrix3d {
    type Output = Matrix3d;

    fn neg(self) -> Matrix3d {
        self.negate()
    }
}

impl From<DMat3> for Matrix3d {
    fn from(m: DMat3) -> Self {
        Self::from_cols(m.x_axis, m.y_axis, m.z_axis)
    }
}

impl From<Matrix3d> for DMat3 {
    fn from(m: Matrix3d) -> Self {
        DMat3::from_cols_array(&m.to_array(true))
    }
}

// ============================================================================
// 可变矩阵
// ============================================================================

/// 可变 3x3 矩阵，原地组合避免分配
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MutableMatrix3d {
    m: [[f64; 3]; 3],
}

impl MutableMatrix3d {
    pub fn new() -> Self {
        Self { m: Matrix3d::IDENTITY.m }
    }

    #[inline]
    pub fn set(&mut self, other: &Matrix3d) -> &mut Self {
        self.m = other.m;
        self
    }

    #[inline]
    pub fn set_identity(&mut self) -> &mut Self {
        self.m = Matrix3d::IDENTITY.m;
        self
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row][col]
    }

    #[inline]
    pub fn set_element(&mut self, row: usize, col: usize, value: f64) -> &mut Self {
        self.m[row][col] = value;
        self
    }

    /// self = self * other
    pub fn mul_assign(&mut self, other: &Matrix3d) -> &mut Self {
        self.m = Matrix3d::mul(&Matrix3d { m: self.m }, other).m;
        self
    }

    /// self = other * self
    pub fn pre_mul(&mut self, other: &Matrix3d) -> &mut Self {
        self.m = other.mul(&Matrix3d { m: self.m }).m;
        self
    }

    pub fn scale(&mut self, s: DVec3) -> &mut Self {
        for row in self.m.iter_mut() {
            row[0] *= s.x;
            row[1] *= s.y;
            row[2] *= s.z;
        }
        self
    }

    pub fn rotate(&mut self, rotation: Quaternion) -> Result<&mut Self> {
        let r = rotation.to_rotation_matrix()?;
        Ok(self.mul_assign(&r))
    }

    #[inline]
    pub fn to_immutable(&self) -> Matrix3d {
        Matrix3d { m: self.m }
    }
}

impl Default for MutableMatrix3d {
    fn default() -> Self {
        Self::new()
    }
}

impl MulAssign<Matrix3d> for MutableMatrix3d {
    fn mul_assign(&mut self, rhs: Matrix3d) {
        MutableMatrix3d::mul_assign(self, &rhs);
    }
}
