//! Projection matrices.
//!
//! All projections follow the OpenGL clip-space convention: a right-handed
//! view space looking down -Z, mapped to NDC with x, y and z in [-1, 1] and
//! z = -1 at the near plane. The rasterizer's depth test and near/far
//! rejection rely on that range.

use crate::math::mat4::Mat4;

/// Projection parameters. [`Projection::matrix`] builds the clip transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Symmetric perspective frustum.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Width divided by height.
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    },
    /// Perspective frustum with explicit near-plane extents, possibly off-axis.
    Frustum {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        z_near: f32,
        z_far: f32,
    },
    /// Parallel projection of an axis-aligned view box.
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        z_near: f32,
        z_far: f32,
    },
}

impl Projection {
    /// Perspective projection.
    ///
    /// # Arguments
    /// * `fov_y` - Vertical field of view in radians
    /// * `aspect_ratio` - Width divided by height
    /// * `z_near` - Near plane distance (must be > 0)
    /// * `z_far` - Far plane distance (must be > z_near)
    pub fn perspective(fov_y: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Projection::Perspective {
            fov_y,
            aspect_ratio,
            z_near,
            z_far,
        }
    }

    /// Perspective projection with the field of view in degrees.
    pub fn from_degrees(fov_y_degrees: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Self::perspective(fov_y_degrees.to_radians(), aspect_ratio, z_near, z_far)
    }

    pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, z_near: f32, z_far: f32) -> Self {
        Projection::Frustum {
            left,
            right,
            bottom,
            top,
            z_near,
            z_far,
        }
    }

    pub fn orthographic(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            z_near,
            z_far,
        }
    }

    /// Returns the near plane distance.
    pub fn z_near(&self) -> f32 {
        match *self {
            Projection::Perspective { z_near, .. }
            | Projection::Frustum { z_near, .. }
            | Projection::Orthographic { z_near, .. } => z_near,
        }
    }

    /// Returns the far plane distance.
    pub fn z_far(&self) -> f32 {
        match *self {
            Projection::Perspective { z_far, .. }
            | Projection::Frustum { z_far, .. }
            | Projection::Orthographic { z_far, .. } => z_far,
        }
    }

    /// Returns the horizontal field of view in radians, for perspective
    /// projections.
    pub fn fov_x(&self) -> Option<f32> {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect_ratio,
                ..
            } => Some(2.0 * (aspect_ratio * (fov_y / 2.0).tan()).atan()),
            _ => None,
        }
    }

    /// Updates the aspect ratio, keeping the vertical extent. Frustum and
    /// orthographic extents are widened or narrowed about their center.
    pub fn set_aspect_ratio(&mut self, new_aspect: f32) {
        match self {
            Projection::Perspective { aspect_ratio, .. } => *aspect_ratio = new_aspect,
            Projection::Frustum {
                left,
                right,
                bottom,
                top,
                ..
            }
            | Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                ..
            } => {
                let center = (*left + *right) * 0.5;
                let half = (*top - *bottom) * 0.5 * new_aspect;
                *left = center - half;
                *right = center + half;
            }
        }
    }

    /// The view-to-clip matrix.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect_ratio,
                z_near,
                z_far,
            } => {
                let top = z_near * (fov_y / 2.0).tan();
                let right = top * aspect_ratio;
                frustum_matrix(-right, right, -top, top, z_near, z_far)
            }
            Projection::Frustum {
                left,
                right,
                bottom,
                top,
                z_near,
                z_far,
            } => frustum_matrix(left, right, bottom, top, z_near, z_far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                z_near,
                z_far,
            } => {
                let (w, h, d) = (right - left, top - bottom, z_far - z_near);
                Mat4::new([
                    [2.0 / w, 0.0, 0.0, -(right + left) / w],
                    [0.0, 2.0 / h, 0.0, -(top + bottom) / h],
                    [0.0, 0.0, -2.0 / d, -(z_far + z_near) / d],
                    [0.0, 0.0, 0.0, 1.0],
                ])
            }
        }
    }
}

fn frustum_matrix(left: f32, right: f32, bottom: f32, top: f32, z_near: f32, z_far: f32) -> Mat4 {
    let (w, h, d) = (right - left, top - bottom, z_far - z_near);
    Mat4::new([
        [2.0 * z_near / w, 0.0, (right + left) / w, 0.0],
        [0.0, 2.0 * z_near / h, (top + bottom) / h, 0.0],
        [0.0, 0.0, -(z_far + z_near) / d, -2.0 * z_far * z_near / d],
        [0.0, 0.0, -1.0, 0.0],
    ])
}
