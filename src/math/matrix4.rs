//! 4x4 双精度矩阵

use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, MulAssign, Neg, Sub};

use glam::{DMat4, DVec3, DVec4};

use super::{hash_f64, Matrix3d, Quaternion, EPSILON};
use crate::{EngineError, Result};

/// 不可变 4x4 矩阵（行主序）
///
/// 仿射矩阵的平移位于第 3 列，变换点时隐含 w = 1。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4d {
    pub(crate) m: [[f64; 4]; 4],
}

impl Matrix4d {
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const ZERO: Self = Self { m: [[0.0; 4]; 4] };

    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        m00: f64, m01: f64, m02: f64, m03: f64,
        m10: f64, m11: f64, m12: f64, m13: f64,
        m20: f64, m21: f64, m22: f64, m23: f64,
        m30: f64, m31: f64, m32: f64, m33: f64,
    ) -> Self {
        Self {
            m: [
                [m00, m01, m02, m03],
                [m10, m11, m12, m13],
                [m20, m21, m22, m23],
                [m30, m31, m32, m33],
            ],
        }
    }

    #[inline]
    pub const fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self { m: rows }
    }

    /// 由线性部分和平移组装仿射矩阵
    pub fn from_linear_translation(linear: &Matrix3d, translation: DVec3) -> Self {
        let l = &linear.m;
        Self::new(
            l[0][0], l[0][1], l[0][2], translation.x,
            l[1][0], l[1][1], l[1][2], translation.y,
            l[2][0], l[2][1], l[2][2], translation.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row][col]
    }

    #[inline]
    pub fn col(&self, col: usize) -> DVec4 {
        DVec4::new(self.m[0][col], self.m[1][col], self.m[2][col], self.m[3][col])
    }

    #[inline]
    pub fn row(&self, row: usize) -> DVec4 {
        DVec4::from_array(self.m[row])
    }

    /// 平移分量
    #[inline]
    pub fn translation(&self) -> DVec3 {
        DVec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    /// 左上 3x3 线性部分
    pub fn linear(&self) -> Matrix3d {
        let m = &self.m;
        Matrix3d::new(
            m[0][0], m[0][1], m[0][2],
            m[1][0], m[1][1], m[1][2],
            m[2][0], m[2][1], m[2][2],
        )
    }

    /// 最后一行为 (0, 0, 0, 1)
    #[inline]
    pub fn is_affine(&self) -> bool {
        self.m[3] == [0.0, 0.0, 0.0, 1.0]
    }

    pub fn add(&self, other: &Matrix4d) -> Self {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Matrix4d) -> Self {
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

    /// 矩阵乘法：结果先应用 other 再应用 self
    pub fn mul(&self, other: &Matrix4d) -> Self {
        Self { m: mul_rows(&self.m, &other.m) }
    }

    pub fn transpose(&self) -> Self {
        let mut out = [[0.0; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = self.m[c][r];
            }
        }
        Self { m: out }
    }

    #[inline]
    pub fn trace(&self) -> f64 {
        self.m[0][0] + self.m[1][1] + self.m[2][2] + self.m[3][3]
    }

    pub fn determinant(&self) -> f64 {
        let f = Factors::new(&self.m);
        f.determinant()
    }

    /// 求逆
    ///
    /// 仿射矩阵单独求逆线性部分并反向应用平移。有轴长度接近零时按轴伪逆，
    /// 零缩放轴求逆为零而不是报错；各轴非零但线性相关时失败。
    /// 非仿射矩阵走完整伴随矩阵，行列式接近零时失败。
    pub fn invert(&self) -> Result<Self> {
        if self.is_affine() {
            return self.invert_affine();
        }

        let f = Factors::new(&self.m);
        let det = f.determinant();
        if det.abs() < EPSILON {
            return Err(EngineError::arithmetic("Cannot invert a matrix with a zero determinant"));
        }
        Ok(Self { m: f.inverse(&self.m, det) })
    }

    fn invert_affine(&self) -> Result<Self> {
        let linear = self.linear();
        let lengths = [linear.col(0).length(), linear.col(1).length(), linear.col(2).length()];

        let inverse_linear = if lengths.iter().any(|&l| l < EPSILON) {
            linear.invert_axes()
        } else {
            // 相对于轴长乘积判断退化，与整体缩放无关
            let det = linear.determinant();
            if det.abs() < EPSILON * lengths[0] * lengths[1] * lengths[2] {
                return Err(EngineError::arithmetic("Cannot invert a matrix with a zero determinant"));
            }
            linear.cofactor_inverse(det)
        };
        let translation = -inverse_linear.transform(self.translation());
        Ok(Self::from_linear_translation(&inverse_linear, translation))
    }

    /// 变换点（w = 1）
    #[inline]
    pub fn transform(&self, p: DVec3) -> DVec3 {
        let m = &self.m;
        DVec3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z + m[0][3],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z + m[1][3],
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z + m[2][3],
        )
    }

    /// 变换方向（w = 0，忽略平移）
    #[inline]
    pub fn transform_vector(&self, v: DVec3) -> DVec3 {
        let m = &self.m;
        DVec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }

    /// 追加平移：`self * T(v)`
    pub fn translate(&self, v: DVec3) -> Self {
        let mut out = self.to_mutable();
        out.translate(v);
        out.to_immutable()
    }

    /// 追加缩放：`self * S(v)`
    pub fn scale(&self, v: DVec3) -> Self {
        let mut out = self.to_mutable();
        out.scale(v);
        out.to_immutable()
    }

    /// 追加旋转：`self * R(q)`
    pub fn rotate(&self, rotation: Quaternion) -> Result<Self> {
        let mut out = self.to_mutable();
        out.rotate(rotation)?;
        Ok(out.to_immutable())
    }

    pub fn create_translation(v: DVec3) -> Self {
        Self::new(
            1.0, 0.0, 0.0, v.x,
            0.0, 1.0, 0.0, v.y,
            0.0, 0.0, 1.0, v.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn create_scaling(v: DVec3) -> Self {
        Self::new(
            v.x, 0.0, 0.0, 0.0,
            0.0, v.y, 0.0, 0.0,
            0.0, 0.0, v.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn create_rotation(rotation: Quaternion) -> Result<Self> {
        let r = rotation.to_rotation_matrix()?;
        Ok(Self::from_linear_translation(&r, DVec3::ZERO))
    }

    /// 观察矩阵：把世界坐标转换到以 eye 为原点、朝向 target 的坐标系（-Z 朝前）
    pub fn create_look_at(eye: DVec3, target: DVec3, up: DVec3) -> Result<Self> {
        let forward = normalize_checked(target - eye, "Cannot look at a target at the eye position")?;
        let side = normalize_checked(forward.cross(up), "Up vector is parallel to the view direction")?;
        let up = side.cross(forward);
        Ok(Self::new(
            side.x, side.y, side.z, -side.dot(eye),
            up.x, up.y, up.z, -up.dot(eye),
            -forward.x, -forward.y, -forward.z, forward.dot(eye),
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// 分解为 (平移, 旋转, 缩放)
    ///
    /// 行列式为负时 x 缩放取负；零缩放轴的旋转按单位轴处理。
    pub fn decompose(&self) -> (DVec3, Quaternion, DVec3) {
        let linear = self.linear();
        let axes = [linear.col(0), linear.col(1), linear.col(2)];
        let mut scale = DVec3::new(axes[0].length(), axes[1].length(), axes[2].length());
        if linear.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let units = [DVec3::X, DVec3::Y, DVec3::Z];
        let mut cols = [DVec3::ZERO; 3];
        for i in 0..3 {
            let s = scale[i];
            cols[i] = if s.abs() < EPSILON { units[i] } else { axes[i] / s };
        }
        let rotation = Quaternion::from_rotation_matrix(&Matrix3d::from_cols(cols[0], cols[1], cols[2]))
            .normalize()
            .unwrap_or(Quaternion::IDENTITY);

        (self.translation(), rotation, scale)
    }

    pub fn to_array(&self, column_major: bool) -> [f64; 16] {
        let m = if column_major { self.transpose().m } else { self.m };
        let mut out = [0.0; 16];
        for (i, v) in m.iter().flatten().enumerate() {
            out[i] = *v;
        }
        out
    }

    #[inline]
    pub fn to_mutable(&self) -> MutableMatrix4d {
        MutableMatrix4d { m: self.m }
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let mut out = self.m;
        out.iter_mut().flatten().for_each(|v| *v = f(*v));
        Self { m: out }
    }

    fn zip_map(&self, other: &Matrix4d, f: impl Fn(f64, f64) -> f64) -> Self {
        let mut out = self.m;
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = f(*cell, other.m[r][c]);
            }
        }
        Self { m: out }
    }
}

fn normalize_checked(v: DVec3, message: &str) -> Result<DVec3> {
    let len = v.length();
    if len < EPSILON {
        return Err(EngineError::arithmetic(message));
    }
    Ok(v / len)
}

#[inline]
fn mul_rows(a: &[[f64; 4]; 4], b: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c] + a[r][3] * b[3][c];
        }
    }
    out
}

/// 2x2 子式（拉普拉斯展开）
struct Factors {
    s: [f64; 6],
    c: [f64; 6],
}

impl Factors {
    fn new(a: &[[f64; 4]; 4]) -> Self {
        Self {
            s: [
                a[0][0] * a[1][1] - a[1][0] * a[0][1],
                a[0][0] * a[1][2] - a[1][0] * a[0][2],
                a[0][0] * a[1][3] - a[1][0] * a[0][3],
                a[0][1] * a[1][2] - a[1][1] * a[0][2],
                a[0][1] * a[1][3] - a[1][1] * a[0][3],
                a[0][2] * a[1][3] - a[1][2] * a[0][3],
            ],
            c: [
                a[2][0] * a[3][1] - a[3][0] * a[2][1],
                a[2][0] * a[3][2] - a[3][0] * a[2][2],
                a[2][0] * a[3][3] - a[3][0] * a[2][3],
                a[2][1] * a[3][2] - a[3][1] * a[2][2],
                a[2][1] * a[3][3] - a[3][1] * a[2][3],
                a[2][2] * a[3][3] - a[3][2] * a[2][3],
            ],
        }
    }

    fn determinant(&self) -> f64 {
        let (s, c) = (&self.s, &self.c);
        s[0] * c[5] - s[1] * c[4] + s[2] * c[3] + s[3] * c[2] - s[4] * c[1] + s[5] * c[0]
    }

    fn inverse(&self, a: &[[f64; 4]; 4], det: f64) -> [[f64; 4]; 4] {
        let (s, c) = (&self.s, &self.c);
        let inv = 1.0 / det;
        [
            [
                (a[1][1] * c[5] - a[1][2] * c[4] + a[1][3] * c[3]) * inv,
                (-a[0][1] * c[5] + a[0][2] * c[4] - a[0][3] * c[3]) * inv,
                (a[3][1] * s[5] - a[3][2] * s[4] + a[3][3] * s[3]) * inv,
                (-a[2][1] * s[5] + a[2][2] * s[4] - a[2][3] * s[3]) * inv,
            ],
            [
                (-a[1][0] * c[5] + a[1][2] * c[2] - a[1][3] * c[1]) * inv,
                (a[0][0] * c[5] - a[0][2] * c[2] + a[0][3] * c[1]) * inv,
                (-a[3][0] * s[5] + a[3][2] * s[2] - a[3][3] * s[1]) * inv,
                (a[2][0] * s[5] - a[2][2] * s[2] + a[2][3] * s[1]) * inv,
            ],
            [
                (a[1][0] * c[4] - a[1][1] * c[2] + a[1][3] * c[0]) * inv,
                (-a[0][0] * c[4] + a[0][1] * c[2] - a[0][3] * c[0]) * inv,
                (a[3][0] * s[4] - a[3][1] * s[2] + a[3][3] * s[0]) * inv,
                (-a[2][0] * s[4] + a[2][1] * s[2] - a[2][3] * s[0]) * inv,
            ],
            [
                (-a[1][0] * c[3] + a[1][1] * c[1] - a[1][2] * c[0]) * inv,
                (a[0][0] * c[3] - a[0][1] * c[1] + a[0][2] * c[0]) * inv,
                (-a[3][0] * s[3] + a[3][1] * s[1] - a[3][2] * s[0]) * inv,
                (a[2][0] * s[3] - a[2][1] * s[1] + a[2][2] * s[0]) * inv,
            ],
        ]
    }
}

impl Default for Matrix4d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Hash for Matrix4d {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.m.iter().flatten().for_each(|v| hash_f64(*v, state));
    }
}

impl Mul for Matrix4d {
    type Output = Matrix4d;

    fn mul(self, rhs: Matrix4d) -> Matrix4d {
        Matrix4d::mul(&self, &rhs)
    }
}

impl Mul<DVec3> for Matrix4d {
    type Output = DVec3;

    fn mul(self, rhs: DVec3) -> DVec3 {
        self.transform(rhs)
    }
}

impl Mul<f64> for Matrix4d {
    type Output = Matrix4d;

    fn mul(self, rhs: f64) -> Matrix4d {
        self.mul_scalar(rhs)
    }
}

impl Add for Matrix4d {
    type Output = Matrix4d;

    fn add(self, rhs: Matrix4d) -> Matrix4d {
        Matrix4d::add(&self, &rhs)
    }
}

impl Sub for Matrix4d {
    type Output = Matrix4d;

    fn sub(self, rhs: Matrix4d) -> Matrix4d {
        Matrix4d::sub(&self, &rhs)
    }
}

impl Neg for Matrix4d {
    type Output = Matrix4d;

    fn neg(self) -> Matrix4d {
        self.negate()
    }
}

impl From<DMat4> for Matrix4d {
    fn from(m: DMat4) -> Self {
        Self { m: DMat4::transpose(&m).to_cols_array_2d() }
    }
}

impl From<Matrix4d> for DMat4 {
    fn from(m: Matrix4d) -> Self {
        DMat4::from_cols_array_2d(&m.m).transpose()
    }
}

// ============================================================================
// 可变矩阵
// ============================================================================

/// 可变 4x4 矩阵
///
/// 每帧骨骼链组合的零分配暂存区，由调用方显式持有并传入。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MutableMatrix4d {
    m: [[f64; 4]; 4],
}

impl MutableMatrix4d {
    pub fn new() -> Self {
        Self { m: Matrix4d::IDENTITY.m }
    }

    #[inline]
    pub fn set(&mut self, other: &Matrix4d) -> &mut Self {
        self.m = other.m;
        self
    }

    #[inline]
    pub fn set_identity(&mut self) -> &mut Self {
        self.m = Matrix4d::IDENTITY.m;
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
    #[inline]
    pub fn mul_assign(&mut self, other: &Matrix4d) -> &mut Self {
        self.m = mul_rows(&self.m, &other.m);
        self
    }

    /// self = other * self
    #[inline]
    pub fn pre_mul(&mut self, other: &Matrix4d) -> &mut Self {
        self.m = mul_rows(&other.m, &self.m);
        self
    }

    /// self = self * T(v)
    pub fn translate(&mut self, v: DVec3) -> &mut Self {
        for row in self.m.iter_mut() {
            row[3] += row[0] * v.x + row[1] * v.y + row[2] * v.z;
        }
        self
    }

    /// self = self * S(v)
    pub fn scale(&mut self, v: DVec3) -> &mut Self {
        for row in self.m.iter_mut() {
            row[0] *= v.x;
            row[1] *= v.y;
            row[2] *= v.z;
        }
        self
    }

    /// self = self * R(q)
    pub fn rotate(&mut self, rotation: Quaternion) -> Result<&mut Self> {
        let r = rotation.to_rotation_matrix()?;
        for row in self.m.iter_mut() {
            let (a, b, c) = (row[0], row[1], row[2]);
            for (col, cell) in row.iter_mut().take(3).enumerate() {
                *cell = a * r.m[0][col] + b * r.m[1][col] + c * r.m[2][col];
            }
        }
        Ok(self)
    }

    #[inline]
    pub fn transform(&self, p: DVec3) -> DVec3 {
        Matrix4d { m: self.m }.transform(p)
    }

    #[inline]
    pub fn to_immutable(&self) -> Matrix4d {
        Matrix4d { m: self.m }
    }
}

impl Default for MutableMatrix4d {
    fn default() -> Self {
        Self::new()
    }
}

impl MulAssign<Matrix4d> for MutableMatrix4d {
    fn mul_assign(&mut self, rhs: Matrix4d) {
        MutableMatrix4d::mul_assign(self, &rhs);
    }
}

impl MulAssign<&Matrix4d> for MutableMatrix4d {
    fn mul_assign(&mut self, rhs: &Matrix4d) {
        MutableMatrix4d::mul_assign(self, rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::test_util::{approx, approx_mat, approx_rotation, approx_vec};

    fn sample_affine() -> Matrix4d {
        Matrix4d::IDENTITY
            .translate(DVec3::new(1.0, -2.0, 3.5))
            .rotate(Quaternion::from_angle_deg_axis(37.0, DVec3::new(1.0, 2.0, 0.5)))
            .unwrap()
            .scale(DVec3::new(2.0, 0.5, 3.0))
    }

    fn sample_projective() -> Matrix4d {
        Matrix4d::new(
            2.0, 0.0, 1.0, 0.5,
            0.0, 3.0, -1.0, 0.0,
            1.0, 0.5, 4.0, 2.0,
            0.0, 0.25, 0.5, 1.0,
        )
    }

    #[test]
    fn test_affine_invert_product_is_identity() {
        let m = sample_affine();
        let inv = m.invert().unwrap();
        assert!(approx_mat(&(m * inv), &Matrix4d::IDENTITY));
        assert!(approx_mat(&(inv * m), &Matrix4d::IDENTITY));
        assert!(approx_mat(&inv.invert().unwrap(), &m));
    }

    #[test]
    fn test_general_invert_matches_nalgebra() {
        let m = sample_projective();
        let inv = m.invert().unwrap();
        let reference = nalgebra::Matrix4::from_row_slice(&m.to_array(false));
        let reference_inv = reference.try_inverse().unwrap();
        for r in 0..4 {
            for c in 0..4 {
                assert!(approx(inv.get(r, c), reference_inv[(r, c)]));
            }
        }
        assert!(approx(m.determinant(), reference.determinant()));
        assert!(approx_mat(&(m * inv), &Matrix4d::IDENTITY));
    }

    #[test]
    fn test_zero_scale_inverts_to_zero() {
        let m = Matrix4d::create_translation(DVec3::new(1.0, 2.0, 3.0))
            .scale(DVec3::new(2.0, 0.0, 1.0));
        let inv = m.invert().unwrap();
        // 被压扁的 y 轴求逆为零
        assert!(approx(inv.get(1, 1), 0.0));
        assert!(approx(inv.get(0, 0), 0.5));
        let p = DVec3::new(5.0, 2.0, 7.0);
        let back = inv.transform(p);
        assert!(approx_vec(back, DVec3::new(2.0, 0.0, 4.0)));
    }

    #[test]
    fn test_small_sheared_affine_inverts_exactly() {
        let m = Matrix4d::new(
            1e-6, 1e-6, 0.0, 1.0,
            0.0, 1e-6, 0.0, 2.0,
            0.0, 0.0, 1e-6, 3.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let inv = m.invert().unwrap();
        let product = m * inv;
        for r in 0..4 {
            for c in 0..4 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((product.get(r, c) - expected).abs() < 1e-9, "({}, {})", r, c);
            }
        }

        let tiny = Matrix4d::create_scaling(DVec3::splat(1e-9)).invert().unwrap();
        assert!((tiny.get(0, 0) - 1e9).abs() < 1e-3);
    }

    #[test]
    fn test_collinear_affine_fails() {
        // 各轴非零但 x、y 轴重合
        let m = Matrix4d::new(
            1.0, 1.0, 0.0, 5.0,
            2.0, 2.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        assert!(matches!(m.invert(), Err(EngineError::Arithmetic(_))));
    }

    #[test]
    fn test_singular_projective_fails() {
        let mut m = sample_projective();
        m.m[3] = m.m[2];
        assert!(matches!(m.invert(), Err(EngineError::Arithmetic(_))));
    }

    #[test]
    fn test_translate_applies_in_local_frame() {
        // 先平移再旋转：平移量被旋转
        let m = Matrix4d::create_rotation(Quaternion::from_angle_deg_axis(90.0, DVec3::Y))
            .unwrap()
            .translate(DVec3::X);
        assert!(approx_vec(m.transform(DVec3::ZERO), DVec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_transform_vector_ignores_translation() {
        let m = Matrix4d::create_translation(DVec3::splat(10.0));
        assert_eq!(m.transform_vector(DVec3::X), DVec3::X);
        assert_eq!(m * DVec3::X, DVec3::new(11.0, 10.0, 10.0));
    }

    #[test]
    fn test_decompose() {
        let q = Quaternion::from_angle_deg_axis(60.0, DVec3::new(0.0, 1.0, 1.0));
        let m = Matrix4d::create_translation(DVec3::new(4.0, 5.0, 6.0))
            .rotate(q)
            .unwrap()
            .scale(DVec3::new(1.5, 2.0, 0.5));
        let (t, r, s) = m.decompose();
        assert!(approx_vec(t, DVec3::new(4.0, 5.0, 6.0)));
        assert!(approx_rotation(r, q.normalize().unwrap()));
        assert!(approx_vec(s, DVec3::new(1.5, 2.0, 0.5)));
    }

    #[test]
    fn test_look_at() {
        let eye = DVec3::new(0.0, 0.0, 5.0);
        let view = Matrix4d::create_look_at(eye, DVec3::ZERO, DVec3::Y).unwrap();
        assert!(approx_vec(view.transform(eye), DVec3::ZERO));
        // 目标在 -Z 方向
        assert!(approx_vec(view.transform(DVec3::ZERO), DVec3::new(0.0, 0.0, -5.0)));
        assert!(Matrix4d::create_look_at(eye, eye, DVec3::Y).is_err());
        assert!(Matrix4d::create_look_at(DVec3::ZERO, DVec3::Y, DVec3::Y).is_err());
    }

    #[test]
    fn test_mutable_chain_matches_immutable() {
        let a = sample_affine();
        let b = sample_projective();
        let mut m = MutableMatrix4d::new();
        m *= a;
        m *= &b;
        assert!(approx_mat(&m.to_immutable(), &(a * b)));

        let mut p = MutableMatrix4d::new();
        p.set(&b).pre_mul(&a);
        assert!(approx_mat(&p.to_immutable(), &(a * b)));
    }

    #[test]
    fn test_glam_interop() {
        let m = sample_affine();
        let g: DMat4 = m.into();
        let p = DVec3::new(0.3, -1.0, 2.0);
        assert!(approx_vec(g.transform_point3(p), m.transform(p)));
        assert!(approx_mat(&Matrix4d::from(g), &m));
    }
}
