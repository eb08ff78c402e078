use crate::math::vec3::Vec3;

// This struct represents a triangle defined by three vertices.
// The vertices are indices into the vertex array of the owning model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Face {
    pub vertices: [u32; 3],
    pub normal: Vec3,
}

impl Face {
    pub const fn new(vertices: [u32; 3], normal: Vec3) -> Self {
        Self { vertices, normal }
    }
}

/// Unit normal of a counter-clockwise triangle: `normalize((b - a) × (c - a))`.
///
/// Degenerate triangles yield NaN components, as with any zero-length
/// normalization.
pub fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize()
}
