//! Axis-aligned bounding boxes.

use crate::math::vec3::Vec3;

/// Axis-aligned bounding box spanning `from` (minimum corner) to `to`
/// (maximum corner).
///
/// Every component of `from` is expected to be less than or equal to the
/// matching component of `to`. This is not checked at use sites.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub from: Vec3,
    pub to: Vec3,
}

impl Aabb {
    pub const fn new(from: Vec3, to: Vec3) -> Self {
        Self { from, to }
    }

    /// A zero-volume box around a single point.
    pub const fn point(p: Vec3) -> Self {
        Self { from: p, to: p }
    }

    /// The tight box around a triangle.
    pub fn from_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            from: a.min(b).min(c),
            to: a.max(b).max(c),
        }
    }

    /// Grow this box to contain `other`.
    pub fn merge(&mut self, other: &Aabb) {
        self.from = self.from.min(other.from);
        self.to = self.to.max(other.to);
    }

    /// The smallest box containing both boxes.
    pub fn union(mut self, other: &Aabb) -> Self {
        self.merge(other);
        self
    }

    pub fn center(&self) -> Vec3 {
        (self.from + self.to) / 2.0
    }

    pub fn size(&self) -> Vec3 {
        self.to - self.from
    }

    /// Index of the longest axis (0=X, 1=Y, 2=Z). Ties favour the lower axis.
    pub fn longest_axis(&self) -> usize {
        let d = self.size();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// True when `other` lies entirely inside this box (boundaries included).
    pub fn contains(&self, other: &Aabb) -> bool {
        self.from.x <= other.from.x
            && self.from.y <= other.from.y
            && self.from.z <= other.from.z
            && other.to.x <= self.to.x
            && other.to.y <= self.to.y
            && other.to.z <= self.to.z
    }

    /// The eight corners, `from` first and `to` last.
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.from, self.to);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}
