//! Bounding volume hierarchy over a model's faces.
//!
//! The tree is stored as a flat array laid out depth-first (pre-order) with
//! the root at index 0. Leaves reference a half-open range of faces; after a
//! build the model's faces are reordered so that every leaf's faces are
//! contiguous, and the vertex array is compacted into first-use order.
//!
//! # Build
//!
//! Each node splits along the longest axis of its box. Faces are sorted by
//! centroid along that axis and the split falls at the first centroid past
//! the box center. When every centroid lies on the low side the node falls
//! back to a median split by position, so each level makes progress even on
//! degenerate input.

use std::io::{self, Write};
use std::ops::Range;

use log::debug;

use crate::aabb::Aabb;
use crate::math::vec3::Vec3;
use crate::model::Model;
use crate::stl;
use crate::triangle::triangle_normal;

/// Outward counter-clockwise triangles of a box, as indices into
/// [`Aabb::corners`].
const BOX_TRIANGLES: [[usize; 3]; 12] = [
    [0, 2, 3],
    [0, 3, 1],
    [4, 5, 7],
    [4, 7, 6],
    [0, 1, 5],
    [0, 5, 4],
    [2, 6, 7],
    [2, 7, 3],
    [0, 4, 6],
    [0, 6, 2],
    [1, 3, 7],
    [1, 7, 5],
];

/// Node payload: a face range for leaves, child indices for internal nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhKind {
    /// Faces `first..last` of the model.
    Leaf { first: usize, last: usize },
    /// Indices of the two children in the node array.
    Internal { left: usize, right: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bbox: Aabb,
    pub kind: BvhKind,
}

impl BvhNode {
    fn leaf(bbox: Aabb, faces: Range<usize>) -> Self {
        Self {
            bbox,
            kind: BvhKind::Leaf {
                first: faces.start,
                last: faces.end,
            },
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, BvhKind::Leaf { .. })
    }

    /// The face range of a leaf.
    pub fn faces(&self) -> Option<Range<usize>> {
        match self.kind {
            BvhKind::Leaf { first, last } => Some(first..last),
            BvhKind::Internal { .. } => None,
        }
    }

    /// The child indices of an internal node.
    pub fn children(&self) -> Option<(usize, usize)> {
        match self.kind {
            BvhKind::Internal { left, right } => Some((left, right)),
            BvhKind::Leaf { .. } => None,
        }
    }
}

/// One face as seen by the builder.
#[derive(Debug, Clone, Copy)]
struct BvhObject {
    face: u32,
    bbox: Aabb,
    centroid: Vec3,
}

/// A pending subtree. `parent` is set for right children, whose index is
/// only known once the left subtree has been emitted.
struct Task {
    range: Range<usize>,
    bbox: Aabb,
    parent: Option<usize>,
}

fn fold_bounds(objects: &[BvhObject]) -> Aabb {
    objects[1..]
        .iter()
        .fold(objects[0].bbox, |bbox, o| bbox.union(&o.bbox))
}

/// Sort `objects` along the longest axis of `bbox` and pick the split.
///
/// Returns the split position (in `1..objects.len()`) and the box of
/// everything before it. `prefix` is scratch space for running boxes.
fn split(objects: &mut [BvhObject], bbox: &Aabb, prefix: &mut Vec<Aabb>) -> (usize, Aabb) {
    let axis = bbox.longest_axis();
    let center = bbox.center()[axis];

    objects.sort_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

    prefix.clear();
    let mut running = objects[0].bbox;
    prefix.push(running);

    let mut at = 1;
    while at < objects.len() && objects[at].centroid[axis] <= center {
        running.merge(&objects[at].bbox);
        prefix.push(running);
        at += 1;
    }

    if at == objects.len() {
        let median = objects.len() / 2;
        return (median, prefix[median - 1]);
    }

    (at, running)
}

fn build(objects: &mut [BvhObject], leaf_load: usize) -> Vec<BvhNode> {
    let mut nodes: Vec<BvhNode> = Vec::with_capacity(2 * objects.len() / leaf_load.max(1));
    let mut prefix = Vec::new();
    let mut stack = vec![Task {
        range: 0..objects.len(),
        bbox: fold_bounds(objects),
        parent: None,
    }];

    while let Some(Task { range, bbox, parent }) = stack.pop() {
        let index = nodes.len();
        if let Some(parent) = parent {
            if let BvhKind::Internal { right, .. } = &mut nodes[parent].kind {
                *right = index;
            }
        }

        nodes.push(BvhNode::leaf(bbox, range.clone()));
        if range.len() <= leaf_load {
            continue;
        }

        let (at, left_box) = split(&mut objects[range.clone()], &bbox, &mut prefix);
        let mid = range.start + at;
        let right_box = fold_bounds(&objects[mid..range.end]);

        nodes[index].kind = BvhKind::Internal {
            left: index + 1,
            right: usize::MAX,
        };

        stack.push(Task {
            range: mid..range.end,
            bbox: right_box,
            parent: Some(index),
        });
        stack.push(Task {
            range: range.start..mid,
            bbox: left_box,
            parent: None,
        });
    }

    nodes
}

impl Model {
    /// Build a hierarchy with at most `target_leaf_load + 1` faces per leaf,
    /// replacing any previous one.
    ///
    /// Faces are reordered so each leaf's range is contiguous, and vertices
    /// are compacted into the order the new face sequence first uses them.
    /// Does nothing on an empty model.
    pub fn rebuild_bvh(&mut self, target_leaf_load: usize) {
        self.bvh = None;
        if self.faces.is_empty() {
            return;
        }

        let mut objects: Vec<BvhObject> = self
            .faces
            .iter()
            .enumerate()
            .map(|(i, face)| {
                let [a, b, c] = self.face_vertices(face);
                let bbox = Aabb::from_triangle(a, b, c);
                BvhObject {
                    face: i as u32,
                    bbox,
                    centroid: bbox.center(),
                }
            })
            .collect();

        let nodes = build(&mut objects, target_leaf_load.saturating_add(1));

        let mut faces: Vec<_> = objects.iter().map(|o| self.faces[o.face as usize]).collect();
        let mut remap = vec![u32::MAX; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.vertices.len());
        for face in &mut faces {
            for v in &mut face.vertices {
                let slot = &mut remap[*v as usize];
                if *slot == u32::MAX {
                    *slot = vertices.len() as u32;
                    vertices.push(self.vertices[*v as usize]);
                }
                *v = *slot;
            }
        }

        debug!(
            "built bvh: {} nodes, {} leaves over {} faces",
            nodes.len(),
            nodes.iter().filter(|n| n.is_leaf()).count(),
            faces.len()
        );

        self.faces = faces;
        self.vertices = vertices;
        self.bvh = Some(nodes);
    }

    /// Dump every hierarchy node's box as 12 triangles of a binary STL, in
    /// node order, for inspection in a mesh viewer.
    ///
    /// Writes an empty STL when no hierarchy is built. Flat boxes get zero
    /// normals.
    pub fn write_bvh_stl<W: Write>(&self, writer: W) -> io::Result<()> {
        let nodes = self.bvh().unwrap_or_default();
        let triangles = nodes.iter().flat_map(|node| {
            let corners = node.bbox.corners();
            BOX_TRIANGLES.iter().map(move |&[a, b, c]| {
                let vertices = [corners[a], corners[b], corners[c]];
                let normal = triangle_normal(corners[a], corners[b], corners[c]);
                let normal = if normal.x.is_finite() { normal } else { Vec3::ZERO };
                (normal, vertices)
            })
        });
        stl::write_triangles(writer, b"bvh", nodes.len() * BOX_TRIANGLES.len(), triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic scatter of small triangles in a 10x10x10 cube.
    fn scattered(count: usize) -> Vec<[Vec3; 3]> {
        let mut state = 0x2545_f491_u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 10_000) as f32 / 1000.0
        };

        (0..count)
            .map(|_| {
                let base = Vec3::new(next(), next(), next());
                [
                    base,
                    base + Vec3::new(next() * 0.1, 0.0, 0.0),
                    base + Vec3::new(0.0, next() * 0.1, next() * 0.1),
                ]
            })
            .collect()
    }

    fn sorted_triangles(model: &Model) -> Vec<[[u32; 3]; 3]> {
        let mut tris: Vec<_> = model
            .triangles()
            .map(|t| t.map(|v| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]))
            .collect();
        tris.sort();
        tris
    }

    /// Leaf containment, internal unions and exact face coverage.
    fn check_soundness(model: &Model, max_leaf: usize) {
        let nodes = model.bvh().expect("bvh built");
        let mut covered = vec![0u32; model.face_count()];

        for node in nodes {
            match node.kind {
                BvhKind::Leaf { first, last } => {
                    assert!(first < last, "empty leaf");
                    assert!(last - first <= max_leaf, "leaf holds {} faces", last - first);
                    for (i, face) in model.faces()[first..last].iter().enumerate() {
                        let [a, b, c] = model.face_vertices(face);
                        assert!(node.bbox.contains(&Aabb::from_triangle(a, b, c)));
                        covered[first + i] += 1;
                    }
                }
                BvhKind::Internal { left, right } => {
                    assert!(left < nodes.len() && right < nodes.len());
                    assert_eq!(node.bbox, nodes[left].bbox.union(&nodes[right].bbox));
                }
            }
        }

        assert!(covered.iter().all(|&c| c == 1), "faces missed or duplicated");
    }

    #[test]
    fn hierarchy_is_sound() {
        let mut model = Model::from_triangles(scattered(500));
        model.rebuild_bvh(4);
        check_soundness(&model, 5);
        assert_eq!(model.bvh().unwrap()[0].bbox, *model.bounding_box());
    }

    #[test]
    fn zero_target_load_yields_single_face_leaves() {
        let mut model = Model::from_triangles(scattered(64));
        model.rebuild_bvh(0);
        check_soundness(&model, 1);
    }

    #[test]
    fn small_model_is_a_single_leaf() {
        let mut model = Model::from_triangles(scattered(3));
        model.rebuild_bvh(8);
        let nodes = model.bvh().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].faces(), Some(0..3));
    }

    #[test]
    fn coincident_centroids_use_median_split() {
        let tri = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mut model = Model::from_triangles(std::iter::repeat(tri).take(33));
        model.rebuild_bvh(1);
        check_soundness(&model, 2);

        let root = model.bvh().unwrap()[0];
        let (left, right) = root.children().unwrap();
        let nodes = model.bvh().unwrap();
        let first_face = |i: usize| {
            nodes
                .iter()
                .skip(i)
                .find_map(|n| n.faces())
                .map(|r| r.start)
                .unwrap()
        };
        // Left subtree starts at face 0, right subtree at the median.
        assert_eq!(first_face(left), 0);
        assert_eq!(first_face(right), 16);
    }

    #[test]
    fn nodes_are_depth_first() {
        let mut model = Model::from_triangles(scattered(100));
        model.rebuild_bvh(2);
        let nodes = model.bvh().unwrap();
        for (i, node) in nodes.iter().enumerate() {
            if let Some((left, right)) = node.children() {
                assert_eq!(left, i + 1);
                assert!(right > left);
            }
        }
        // Leaves in array order cover faces in ascending order.
        let starts: Vec<_> = nodes.iter().filter_map(|n| n.faces()).map(|r| r.start).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reordering_preserves_geometry() {
        let mut model = Model::from_triangles(scattered(200));
        let before = sorted_triangles(&model);
        let vertex_count = model.vertices().len();

        model.rebuild_bvh(3);

        assert_eq!(sorted_triangles(&model), before);
        assert_eq!(model.vertices().len(), vertex_count);
    }

    #[test]
    fn vertices_follow_first_use_order() {
        let mut model = Model::from_triangles(scattered(50));
        model.rebuild_bvh(2);

        let mut next = 0;
        for face in model.faces() {
            for &v in &face.vertices {
                assert!(v <= next, "vertex {v} used before {next}");
                if v == next {
                    next += 1;
                }
            }
        }
        assert_eq!(next as usize, model.vertices().len());
    }

    #[test]
    fn empty_model_has_no_hierarchy() {
        let mut model = Model::new();
        model.rebuild_bvh(4);
        assert!(model.bvh().is_none());

        let mut bytes = Vec::new();
        model.write_bvh_stl(&mut bytes).unwrap();
        assert_eq!(bytes.len(), stl::HEADER_SIZE + 4);
    }

    #[test]
    fn hierarchy_dump_has_twelve_triangles_per_node() {
        let mut model = Model::from_triangles(scattered(40));
        model.rebuild_bvh(4);
        let nodes = model.bvh().unwrap();

        let mut bytes = Vec::new();
        model.write_bvh_stl(&mut bytes).unwrap();
        let records = 12 * nodes.len();
        assert_eq!(bytes.len(), stl::HEADER_SIZE + 4 + records * stl::RECORD_SIZE);

        let count = &bytes[stl::HEADER_SIZE..stl::HEADER_SIZE + 4];
        assert_eq!(u32::from_le_bytes(count.try_into().unwrap()) as usize, records);

        let mut boxes = Model::new();
        boxes
            .load_stl(bytes.as_slice(), true, stl::LoadMode::Guess)
            .unwrap();
        assert_eq!(boxes.face_count(), records);
        assert_eq!(boxes.bounding_box(), &nodes[0].bbox);

        // Root box first, winding outward.
        let root = nodes[0].bbox;
        for (i, [a, b, c]) in boxes.triangles().take(12).enumerate() {
            let normal = boxes.faces()[i].normal;
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid - root.center()) > 0.0, "triangle {i}");
        }
    }
}
