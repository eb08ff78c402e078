//! Minimal linear algebra for the geometry pipeline.
//!
//! Only what the loader, BVH builder and rasterizer need: 3D points and
//! directions, homogeneous 4D vectors and column-vector 4x4 matrices.

pub mod mat4;
pub mod vec3;
pub mod vec4;

pub use mat4::Mat4;
pub use vec3::Vec3;
pub use vec4::Vec4;
