//! 轴对齐包围盒

use glam::DVec3;

/// 轴对齐包围盒
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    /// 由两个角点创建（自动排序各分量）
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// 包围所有点的最小盒，空输入返回 None
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// 8 个角点
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(b.x, b.y, b.z),
            DVec3::new(b.x, a.y, b.z),
        ]
    }

    #[inline]
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// 是否完全包含另一个盒
    #[inline]
    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    #[inline]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points([
            DVec3::new(1.0, -2.0, 3.0),
            DVec3::new(-1.0, 4.0, 0.5),
        ]).unwrap();
        assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, 0.5));
        assert_eq!(aabb.max, DVec3::new(1.0, 4.0, 3.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_corners_contained() {
        let aabb = Aabb::new(DVec3::ONE, DVec3::ZERO);
        assert!(aabb.corners().iter().all(|c| aabb.contains(*c)));
        assert!(!aabb.contains(DVec3::splat(1.5)));
    }
}
