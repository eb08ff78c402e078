//! Rendering into caller-owned color and depth targets.

pub mod image;
pub mod rasterizer;
pub mod shader;

pub use self::image::Image;
pub use rasterizer::{render, render_with_stats, CullingMode, RenderStats, TILE_SIZE};
pub use shader::{shaders, Shader};
