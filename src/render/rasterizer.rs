//! Tiled triangle rasterizer with depth testing.
//!
//! # Pipeline
//!
//! For each face of a [`Model`]:
//!
//! 1. Project the vertices by the model-view-projection matrix and divide by
//!    w to get normalized device coordinates (NDC).
//! 2. Classify the winding from the signed double area and cull per
//!    [`CullingMode`].
//! 3. Clamp the NDC bounding box to the unit cube. Faces whose clamped box is
//!    empty, or lies entirely in front of the near plane or behind the far
//!    plane, are rejected. There is no polygon clipping: a face crossing the
//!    frustum is rasterized inside its clamped rectangle.
//! 4. Walk the covered pixels in [`TILE_SIZE`] tiles, stepping barycentric
//!    coordinates, object-space position and depth incrementally.
//! 5. A sample is covered when all barycentric coordinates are non-negative.
//!    Covered samples with depth in `(-1, depth[pixel])` overwrite the depth
//!    and color targets.
//!
//! Neither target is cleared here. Clear depth to `1.0` first for a fresh
//! frame; leave it as is to composite several models.
//!
//! # Winding
//!
//! A positive double area means counter-clockwise in NDC (y up). Culling
//! clockwise faces therefore keeps counter-clockwise ones, which is the
//! usual front-face convention.
//!
//! # Hierarchy
//!
//! When the model carries a BVH, subtrees whose box projects entirely
//! outside one face of the NDC cube are skipped. A face inside such a box
//! would be rejected in step 3 anyway, so the output is unchanged.

use std::fmt;
use std::ops::{Add, Mul, Range};

use log::trace;

use super::image::Image;
use super::shader::Shader;
use crate::aabb::Aabb;
use crate::bvh::{BvhKind, BvhNode};
use crate::colors::Color;
use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;
use crate::model::Model;
use crate::triangle::Face;

/// Edge length of the square screen tiles the pixel walk is split into.
pub const TILE_SIZE: usize = 32;

/// Slack on the hierarchy's frustum test so rounding differences between a
/// box corner and a face vertex never skip a face the per-face test keeps.
const FRUSTUM_MARGIN: f32 = 1e-4;

/// Which winding, as seen in NDC, is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullingMode {
    /// Keep every face.
    None,
    /// Discard clockwise and degenerate faces.
    #[default]
    Clockwise,
    /// Discard counter-clockwise faces.
    CounterClockwise,
}

impl CullingMode {
    /// Back faces are the clockwise ones.
    pub const BACK: Self = Self::Clockwise;
    pub const FRONT: Self = Self::CounterClockwise;

    #[inline]
    fn culls(self, double_area: f32) -> bool {
        match self {
            CullingMode::None => false,
            CullingMode::Clockwise => double_area <= 0.0,
            CullingMode::CounterClockwise => double_area > 0.0,
        }
    }
}

impl fmt::Display for CullingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CullingMode::None => write!(f, "none"),
            CullingMode::Clockwise => write!(f, "clockwise"),
            CullingMode::CounterClockwise => write!(f, "counter-clockwise"),
        }
    }
}

/// Face counts from one [`render_with_stats`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Faces that were rasterized.
    pub rendered: usize,
    /// Faces discarded by winding.
    pub culled: usize,
    /// Faces discarded by the bounding-box frustum test.
    pub clipped: usize,
    /// Faces never visited because their BVH subtree was outside the frustum.
    pub skipped: usize,
}

/// Interpolated per-sample state. Every field is affine in screen position,
/// so stepping one pixel or one row is a single add.
#[derive(Debug, Clone, Copy)]
struct Fragment {
    sample_x: f32,
    sample_y: f32,
    depth: f32,
    lambda: Vec3,
    position: Vec3,
}

impl Fragment {
    #[inline]
    fn covered(&self) -> bool {
        self.lambda.x >= 0.0 && self.lambda.y >= 0.0 && self.lambda.z >= 0.0
    }
}

impl Add for Fragment {
    type Output = Fragment;

    #[inline]
    fn add(self, rhs: Fragment) -> Fragment {
        Fragment {
            sample_x: self.sample_x + rhs.sample_x,
            sample_y: self.sample_y + rhs.sample_y,
            depth: self.depth + rhs.depth,
            lambda: self.lambda + rhs.lambda,
            position: self.position + rhs.position,
        }
    }
}

impl Mul<f32> for Fragment {
    type Output = Fragment;

    #[inline]
    fn mul(self, s: f32) -> Fragment {
        Fragment {
            sample_x: self.sample_x * s,
            sample_y: self.sample_y * s,
            depth: self.depth * s,
            lambda: self.lambda * s,
            position: self.position * s,
        }
    }
}

/// A face that survived culling and rejection, ready to walk.
struct FaceSetup {
    columns: Range<usize>,
    rows: Range<usize>,
    /// Fragment at the center of the first pixel of the rectangle.
    origin: Fragment,
    dx: Fragment,
    dy: Fragment,
}

impl FaceSetup {
    /// Fragment at pixel `(columns.start + i, rows.start + j)`.
    #[inline]
    fn at(&self, i: usize, j: usize) -> Fragment {
        self.origin + self.dx * i as f32 + self.dy * j as f32
    }
}

enum Rejected {
    Culled,
    Clipped,
}

/// Sample position of a pixel center along one axis, in NDC.
#[inline]
fn sample(pixel: usize, extent: f32) -> f32 {
    ((pixel as f32 + 0.5) / extent - 0.5) * 2.0
}

/// NDC coordinate to a pixel boundary, clamped to the image.
#[inline]
fn to_pixel(ndc: f32, extent: f32, round: fn(f32) -> f32) -> usize {
    round((ndc * 0.5 + 0.5) * extent).clamp(0.0, extent) as usize
}

fn setup(
    vertices: [Vec3; 3],
    mvp: &Mat4,
    culling: CullingMode,
    width: usize,
    height: usize,
) -> Result<FaceSetup, Rejected> {
    // ─────────────────────────────────────────────────────────────────────
    // Step 1: Project
    // ─────────────────────────────────────────────────────────────────────
    let [p0, p1, p2] = vertices.map(|v| (*mvp * Vec4::from(v)).perspective_divide());

    // ─────────────────────────────────────────────────────────────────────
    // Step 2: Winding
    // ─────────────────────────────────────────────────────────────────────
    let double_area =
        (p0.y - p1.y) * p2.x + (p1.x - p0.x) * p2.y + (p0.x * p1.y - p0.y * p1.x);
    if culling.culls(double_area) {
        return Err(Rejected::Culled);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Step 3: Bounding-box rejection
    // ─────────────────────────────────────────────────────────────────────
    let from = p0.min(p1).min(p2).max(Vec3::splat(-1.0));
    let to = p0.max(p1).max(p2).min(Vec3::splat(1.0));
    if to.x <= from.x || to.y <= from.y || from.z >= 1.0 || to.z <= -1.0 {
        return Err(Rejected::Clipped);
    }

    let (w, h) = (width as f32, height as f32);
    let columns = to_pixel(from.x, w, f32::floor)..to_pixel(to.x, w, f32::ceil);
    // Image rows run top to bottom, NDC y runs bottom to top.
    let rows = to_pixel(-to.y, h, f32::floor)..to_pixel(-from.y, h, f32::ceil);

    // ─────────────────────────────────────────────────────────────────────
    // Step 4: Linear maps from sample position to barycentrics
    // ─────────────────────────────────────────────────────────────────────
    // lambda = a * x + b * y + c, normalized to sum to one.
    let inv = 1.0 / double_area;
    let a = Vec3::new(p1.y - p2.y, p2.y - p0.y, p0.y - p1.y) * inv;
    let b = Vec3::new(p2.x - p1.x, p0.x - p2.x, p1.x - p0.x) * inv;
    let c = Vec3::new(
        p1.x * p2.y - p1.y * p2.x,
        p2.x * p0.y - p2.y * p0.x,
        p0.x * p1.y - p0.y * p1.x,
    ) * inv;

    let [v0, v1, v2] = vertices;
    let (e1, e2) = (v1 - v0, v2 - v0);
    let (dz1, dz2) = (p1.z - p0.z, p2.z - p0.z);

    // Linear part only; the origin adds v0 and p0.z back in.
    let step = |sx: f32, sy: f32| {
        let lambda = a * sx + b * sy;
        Fragment {
            sample_x: sx,
            sample_y: sy,
            depth: dz1 * lambda.y + dz2 * lambda.z,
            lambda,
            position: e1 * lambda.y + e2 * lambda.z,
        }
    };

    let (sx, sy) = (sample(columns.start, w), -sample(rows.start, h));
    let mut origin = step(sx, sy);
    origin.lambda += c;
    origin.position = v0 + e1 * origin.lambda.y + e2 * origin.lambda.z;
    origin.depth = p0.z + dz1 * origin.lambda.y + dz2 * origin.lambda.z;

    Ok(FaceSetup {
        columns,
        rows,
        origin,
        dx: step(2.0 / w, 0.0),
        dy: step(0.0, -2.0 / h),
    })
}

/// Steps 5 and 6: walk the rectangle tile by tile.
fn rasterize<S: Shader + ?Sized>(
    face: &FaceSetup,
    normal: Vec3,
    color: &mut Image<'_, Color>,
    depth: &mut Image<'_, f32>,
    shader: &S,
) {
    let (columns, rows) = (face.columns.clone(), face.rows.clone());

    for tile_y in rows.clone().step_by(TILE_SIZE) {
        let tile_rows = tile_y..(tile_y + TILE_SIZE).min(rows.end);

        for tile_x in columns.clone().step_by(TILE_SIZE) {
            let tile_columns = tile_x..(tile_x + TILE_SIZE).min(columns.end);
            let mut row = face.at(tile_x - columns.start, tile_y - rows.start);

            for y in tile_rows.clone() {
                let colors = color.row_mut(y);
                let depths = depth.row_mut(y);
                let mut frag = row;

                for x in tile_columns.clone() {
                    if frag.covered() && frag.depth > -1.0 && frag.depth < depths[x] {
                        depths[x] = frag.depth;
                        colors[x] = shader.shade(
                            Vec3::new(frag.sample_x, frag.sample_y, frag.depth),
                            frag.position,
                            normal,
                        );
                    }
                    frag = frag + face.dx;
                }

                row = row + face.dy;
            }
        }
    }
}

/// True when the projected box lies strictly outside one face of the NDC
/// cube. Boxes reaching behind the eye are never rejected.
fn outside_frustum(bbox: &Aabb, mvp: &Mat4) -> bool {
    let clip = bbox.corners().map(|c| *mvp * Vec4::from(c));
    if !clip.iter().all(|c| c.w > 0.0) {
        return false;
    }

    let ndc = clip.map(Vec4::perspective_divide);
    let limit = 1.0 + FRUSTUM_MARGIN;
    let beyond = |axis: usize, sign: f32| ndc.iter().all(|p| p[axis] * sign > limit);

    (0..3).any(|axis| beyond(axis, 1.0) || beyond(axis, -1.0))
}

struct Target<'r, 'c, 'd, S: ?Sized> {
    color: &'r mut Image<'c, Color>,
    depth: &'r mut Image<'d, f32>,
    mvp: &'r Mat4,
    shader: &'r S,
    culling: CullingMode,
    stats: RenderStats,
}

impl<S: Shader + ?Sized> Target<'_, '_, '_, S> {
    fn draw(&mut self, model: &Model, face: &Face) {
        let (width, height) = (self.color.width(), self.color.height());
        match setup(
            model.face_vertices(face),
            self.mvp,
            self.culling,
            width,
            height,
        ) {
            Ok(setup) => {
                self.stats.rendered += 1;
                rasterize(&setup, face.normal, self.color, self.depth, self.shader);
            }
            Err(Rejected::Culled) => self.stats.culled += 1,
            Err(Rejected::Clipped) => self.stats.clipped += 1,
        }
    }
}

/// Render `model` into the color and depth targets and return how many
/// faces were rasterized (passed culling and rejection), regardless of
/// how many of their fragments survived the depth test.
///
/// `mvp` maps object space to clip space. `depth` must be the same size as
/// `color`; clear it to `1.0` for a fresh frame.
pub fn render<S: Shader + ?Sized>(
    color: &mut Image<'_, Color>,
    depth: &mut Image<'_, f32>,
    model: &Model,
    mvp: &Mat4,
    shader: &S,
    culling: CullingMode,
) -> usize {
    render_with_stats(color, depth, model, mvp, shader, culling).rendered
}

/// [`render`], also reporting why faces were dropped.
pub fn render_with_stats<S: Shader + ?Sized>(
    color: &mut Image<'_, Color>,
    depth: &mut Image<'_, f32>,
    model: &Model,
    mvp: &Mat4,
    shader: &S,
    culling: CullingMode,
) -> RenderStats {
    debug_assert_eq!(color.width(), depth.width(), "color and depth widths differ");
    debug_assert_eq!(color.height(), depth.height(), "color and depth heights differ");

    let mut target = Target {
        color,
        depth,
        mvp,
        shader,
        culling,
        stats: RenderStats::default(),
    };

    match model.bvh() {
        Some(nodes) => {
            let mut stack = vec![0];
            while let Some(index) = stack.pop() {
                let node = &nodes[index];
                if outside_frustum(&node.bbox, mvp) {
                    target.stats.skipped += subtree_face_count(nodes, index);
                    continue;
                }
                match node.kind {
                    BvhKind::Leaf { first, last } => {
                        for face in &model.faces()[first..last] {
                            target.draw(model, face);
                        }
                    }
                    BvhKind::Internal { left, right } => {
                        stack.push(right);
                        stack.push(left);
                    }
                }
            }
        }
        None => {
            for face in model.faces() {
                target.draw(model, face);
            }
        }
    }

    let stats = target.stats;
    trace!(
        "rendered {} faces ({} culled, {} clipped, {} skipped by bvh)",
        stats.rendered,
        stats.culled,
        stats.clipped,
        stats.skipped
    );
    stats
}

/// Faces under a node: from its leftmost leaf's first face to its
/// rightmost leaf's last.
fn subtree_face_count(nodes: &[BvhNode], index: usize) -> usize {
    let mut first = index;
    while let BvhKind::Internal { left, .. } = nodes[first].kind {
        first = left;
    }
    let mut last = index;
    while let BvhKind::Internal { right, .. } = nodes[last].kind {
        last = right;
    }
    match (nodes[first].kind, nodes[last].kind) {
        (BvhKind::Leaf { first, .. }, BvhKind::Leaf { last, .. }) => last - first,
        _ => 0,
    }
}
