//! Look-at camera
//!
//! # Coordinate System
//!
//! Uses a **right-handed** coordinate system, matching [`Projection`]:
//! - X: positive right
//! - Y: positive up
//! - Z: positive toward the viewer (the camera looks down -Z)
//!
//! [`Projection`]: crate::projection::Projection

use crate::aabb::Aabb;
use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;

/// A camera placed at `position`, aimed at `target`, with `up` fixing roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Camera {
    /// Creates a camera at `position` looking toward `target`.
    ///
    /// `up` need not be perpendicular to the view direction, only not
    /// parallel to it.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            position,
            target,
            up,
        }
    }

    /// A camera looking at the center of `bbox` from the (+X, +Y, +Z)
    /// diagonal, one box diagonal away, with +Y up.
    ///
    /// A box with no extent (a single point) is viewed from unit distance.
    pub fn framing(bbox: &Aabb) -> Self {
        let center = bbox.center();
        let distance = match bbox.size().magnitude() {
            d if d > 0.0 => d,
            _ => 1.0,
        };
        let offset = Vec3::ONE.normalize() * distance;
        Self::look_at(center + offset, center, Vec3::UP)
    }

    /// Unit vector from the camera toward its target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Distance from the camera to its target.
    pub fn distance(&self) -> f32 {
        (self.target - self.position).magnitude()
    }

    /// The world-to-view matrix.
    ///
    /// Rows are the camera's right, up and backward axes, so the target ends
    /// up on the -Z axis of view space.
    pub fn view_matrix(&self) -> Mat4 {
        let f = self.forward();
        let s = f.cross(self.up).normalize();
        let u = s.cross(f);
        let eye = self.position;

        Mat4::new([
            [s.x, s.y, s.z, -s.dot(eye)],
            [u.x, u.y, u.z, -u.dot(eye)],
            [-f.x, -f.y, -f.z, f.dot(eye)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}
