//! A CPU software renderer for STL triangle meshes.
//!
//! The crate has three parts:
//! - an STL loader (text and binary, with format detection) that builds an
//!   indexed [`Model`] with duplicate vertices merged,
//! - a bounding volume hierarchy over the model's faces,
//! - a tiled rasterizer that draws a model into caller-owned color and depth
//!   [`Image`]s through a user-supplied [`Shader`].
//!
//! Nothing here opens windows or encodes images; the `stlrast` binary pairs
//! the library with the `image` crate to write PNGs.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use stlrast::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut model = Model::from_stl(BufReader::new(File::open("part.stl")?))?;
//! model.rebuild_bvh(8);
//!
//! let (width, height) = (640, 480);
//! let camera = Camera::framing(model.bounding_box());
//! let far = 2.0 * camera.distance();
//! let projection = Projection::from_degrees(60.0, width as f32 / height as f32, 0.1, far);
//! let mvp = projection.matrix() * camera.view_matrix();
//!
//! let mut color = vec![Color::BLACK; width * height];
//! let mut depth = vec![1.0f32; width * height];
//! let faces = render(
//!     &mut Image::new(&mut color, width, height),
//!     &mut Image::new(&mut depth, width, height),
//!     &model,
//!     &mvp,
//!     &shaders::normal,
//!     CullingMode::BACK,
//! );
//! # let _ = faces;
//! # Ok(())
//! # }
//! ```

pub mod aabb;
pub mod bvh;
pub mod camera;
pub mod colors;
pub mod math;
pub mod model;
pub mod projection;
pub mod render;
pub mod stl;
pub mod triangle;

// Re-export commonly needed types at crate root for convenience
pub use aabb::Aabb;
pub use camera::Camera;
pub use colors::Color;
pub use model::Model;
pub use projection::Projection;
pub use render::{render, CullingMode, Image, Shader};
pub use stl::{LoadError, LoadMode, LoadResult};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use stlrast::prelude::*;
/// ```
pub mod prelude {
    // Geometry
    pub use crate::aabb::Aabb;
    pub use crate::bvh::{BvhKind, BvhNode};
    pub use crate::model::Model;
    pub use crate::triangle::Face;

    // Loading
    pub use crate::stl::{LoadError, LoadMode};

    // Math
    pub use crate::math::{Mat4, Vec3, Vec4};

    // Viewing
    pub use crate::camera::Camera;
    pub use crate::projection::Projection;

    // Rendering
    pub use crate::colors::Color;
    pub use crate::render::{render, render_with_stats, shaders, CullingMode, Image, Shader};
}
