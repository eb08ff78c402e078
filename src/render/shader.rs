//! Fragment shading.
//!
//! The rasterizer owns coverage, interpolation and the depth test; a
//! [`Shader`] only turns one surviving fragment into a color. Any closure
//! `Fn(Vec3, Vec3, Vec3) -> Color` is a shader, so ad-hoc shading needs no
//! wrapper type.
//!
//! The [`shaders`] module holds a few ready-made ones, mostly useful for
//! inspecting a model.

use crate::colors::Color;
use crate::math::vec3::Vec3;

/// Per-fragment color computation.
///
/// Called once for every fragment that passes the depth test, in no
/// particular order across faces. Implementations should be pure.
pub trait Shader {
    /// * `frag` - sample position in normalized device coordinates: x and y
    ///   of the pixel center, z the interpolated depth, all in [-1, 1]
    /// * `position` - interpolated object-space position
    /// * `normal` - the face normal (flat across the face)
    fn shade(&self, frag: Vec3, position: Vec3, normal: Vec3) -> Color;
}

impl<F> Shader for F
where
    F: Fn(Vec3, Vec3, Vec3) -> Color,
{
    #[inline]
    fn shade(&self, frag: Vec3, position: Vec3, normal: Vec3) -> Color {
        self(frag, position, normal)
    }
}

pub mod shaders {
    use super::*;
    use crate::aabb::Aabb;

    /// Grayscale depth, mapping [-1, 1] to [0, 255].
    pub fn depth(frag: Vec3, _position: Vec3, _normal: Vec3) -> Color {
        let d = (frag.z * 0.5 + 0.5) * 255.0;
        Color::from_f32(d, d, d, 255.0)
    }

    /// Normal components mapped from [-1, 1] to [0, 255].
    pub fn normal(_frag: Vec3, _position: Vec3, normal: Vec3) -> Color {
        let c = (normal * 0.5 + Vec3::splat(0.5)) * 255.0;
        Color::from_f32(c.x, c.y, c.z, 255.0)
    }

    /// Object-space position mapped to a color cube: black at `bbox.from`,
    /// white at `bbox.to`.
    ///
    /// A flat axis of the box divides by zero on that channel, which
    /// saturates to 0 or 255.
    pub fn position(bbox: Aabb) -> impl Fn(Vec3, Vec3, Vec3) -> Color + Copy {
        let origin = bbox.from;
        let extent = bbox.size();
        move |_frag, position, _normal| {
            let c = (position - origin).div_elem(extent) * 255.0;
            Color::from_f32(c.x, c.y, c.z, 255.0)
        }
    }

    /// Lambertian shading under a directional light.
    ///
    /// `direction` is where the light travels, not where it comes from, so
    /// faces whose normal opposes it are lit. Every channel, alpha included,
    /// is `ambient + max(-n.d, 0) * diffuse`, clamped to [0, 255].
    pub fn diffuse_directional(
        direction: Vec3,
        ambient: Color,
        diffuse: Color,
    ) -> impl Fn(Vec3, Vec3, Vec3) -> Color + Copy {
        let direction = direction.normalize();
        move |_frag, _position, normal| {
            let intensity = (-normal.dot(direction)).max(0.0);
            let channel = |a: u8, d: u8| a as f32 + intensity * d as f32;
            Color::from_f32(
                channel(ambient.r, diffuse.r),
                channel(ambient.g, diffuse.g),
                channel(ambient.b, diffuse.b),
                channel(ambient.a, diffuse.a),
            )
        }
    }
}
