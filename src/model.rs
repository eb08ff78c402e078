//! Indexed triangle mesh with cached derived state.
//!
//! A [`Model`] owns a deduplicated vertex array, a face array indexing into
//! it, the axis-aligned bounding box of the referenced geometry, and an
//! optional bounding volume hierarchy. Geometry is only replaced wholesale
//! (by the STL loader, [`Model::from_triangles`] or [`Model::clear`]), so
//! the cached box and hierarchy can never silently go stale.

use crate::aabb::Aabb;
use crate::bvh::BvhNode;
use crate::math::vec3::Vec3;
use crate::triangle::{triangle_normal, Face};

/// A triangle mesh ready for rendering.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) vertices: Vec<Vec3>,
    pub(crate) faces: Vec<Face>,
    pub(crate) bounding_box: Aabb,
    pub(crate) bvh: Option<Vec<BvhNode>>,
}

impl Model {
    /// Create a new empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from a triangle soup.
    ///
    /// Normals are computed from the vertex positions assuming
    /// counter-clockwise winding, and coincident vertices are merged exactly
    /// as the loader does.
    pub fn from_triangles<I>(triangles: I) -> Self
    where
        I: IntoIterator<Item = [Vec3; 3]>,
    {
        let mut soup = TriangleSoup::new(false);
        for [a, b, c] in triangles {
            soup.push(Vec3::ZERO, [a, b, c]);
        }

        let mut model = Model::new();
        soup.finish(&mut model);
        model
    }

    /// Drop all geometry and the hierarchy.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.bvh = None;
        self.bounding_box = Aabb::default();
    }

    // ============ Geometry Access ============

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Resolve a face's vertex indices to positions.
    #[inline]
    pub fn face_vertices(&self, face: &Face) -> [Vec3; 3] {
        let [a, b, c] = face.vertices;
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Iterate faces as resolved vertex positions, in face order.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.faces.iter().map(move |face| self.face_vertices(face))
    }

    // ============ Derived State ============

    pub fn bounding_box(&self) -> &Aabb {
        &self.bounding_box
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Vec3 {
        self.bounding_box.center()
    }

    /// Recompute the bounding box from the referenced vertices.
    ///
    /// An empty model collapses to a box at the origin.
    pub fn update_bounding_box(&mut self) {
        let bounding_box = {
            let mut triangles = self.triangles();
            match triangles.next() {
                None => Aabb::default(),
                Some([a, b, c]) => triangles.fold(Aabb::from_triangle(a, b, c), |bbox, [a, b, c]| {
                    bbox.union(&Aabb::from_triangle(a, b, c))
                }),
            }
        };
        self.bounding_box = bounding_box;
    }

    /// The bounding volume hierarchy, if one has been built since geometry
    /// was last replaced. Root is at index 0.
    pub fn bvh(&self) -> Option<&[BvhNode]> {
        self.bvh.as_deref()
    }
}

/// Accumulates unindexed triangles during a load, then welds them into a
/// [`Model`].
///
/// The running bounding box is maintained as triangles arrive so the loader
/// never walks the geometry twice.
pub(crate) struct TriangleSoup {
    points: Vec<Vec3>,
    normals: Vec<Vec3>,
    bounding_box: Option<Aabb>,
    use_file_normals: bool,
}

impl TriangleSoup {
    pub(crate) fn new(use_file_normals: bool) -> Self {
        Self::with_capacity(use_file_normals, 0)
    }

    pub(crate) fn with_capacity(use_file_normals: bool, triangles: usize) -> Self {
        Self {
            points: Vec::with_capacity(triangles * 3),
            normals: Vec::with_capacity(triangles),
            bounding_box: None,
            use_file_normals,
        }
    }

    pub(crate) fn push(&mut self, normal: Vec3, vertices: [Vec3; 3]) {
        let [a, b, c] = vertices.map(without_negative_zero);
        let normal = if self.use_file_normals {
            normal
        } else {
            triangle_normal(a, b, c)
        };

        let tri_box = Aabb::from_triangle(a, b, c);
        self.bounding_box = Some(match self.bounding_box {
            Some(bbox) => bbox.union(&tri_box),
            None => tri_box,
        });

        self.points.extend_from_slice(&[a, b, c]);
        self.normals.push(normal);
    }

    pub(crate) fn len(&self) -> usize {
        self.normals.len()
    }

    /// Replace the model's geometry with the welded soup.
    pub(crate) fn finish(self, model: &mut Model) {
        let (vertices, indices) = weld(&self.points);

        model.faces = indices
            .chunks_exact(3)
            .zip(self.normals)
            .map(|(tri, normal)| Face::new([tri[0], tri[1], tri[2]], normal))
            .collect();
        model.vertices = vertices;
        model.bounding_box = self.bounding_box.unwrap_or_default();
        model.bvh = None;
    }
}

/// Adding `+0.0` turns `-0.0` into `0.0` and leaves every other value,
/// NaN payloads included, untouched.
#[inline]
fn without_negative_zero(v: Vec3) -> Vec3 {
    Vec3::new(v.x + 0.0, v.y + 0.0, v.z + 0.0)
}

/// Merge coincident points.
///
/// Returns the surviving points in first-occurrence order and, for every
/// input point, the index of its survivor. Points are coincident when all
/// three coordinates compare equal under IEEE total ordering, so callers
/// must fold `-0.0` into `0.0` first. Duplicates are
/// found with a stable lexicographic sort, so the survivor of each group is
/// its earliest occurrence.
pub(crate) fn weld(points: &[Vec3]) -> (Vec<Vec3>, Vec<u32>) {
    let mut order: Vec<u32> = (0..points.len() as u32).collect();
    order.sort_by(|&a, &b| points[a as usize].total_cmp_lex(&points[b as usize]));

    let mut survivor = vec![0u32; points.len()];
    let mut run_start = 0;
    for (i, &idx) in order.iter().enumerate() {
        let head = order[run_start];
        if points[idx as usize].total_cmp_lex(&points[head as usize]) != std::cmp::Ordering::Equal {
            run_start = i;
        }
        survivor[idx as usize] = order[run_start];
    }

    let mut remap = vec![u32::MAX; points.len()];
    let mut welded = Vec::new();
    let indices = survivor
        .iter()
        .map(|&s| {
            let slot = &mut remap[s as usize];
            if *slot == u32::MAX {
                *slot = welded.len() as u32;
                welded.push(points[s as usize]);
            }
            *slot
        })
        .collect();

    (welded, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> Model {
        Model::from_triangles([
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
            ],
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
        ])
    }

    #[test]
    fn weld_merges_duplicates_in_first_occurrence_order() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let c = Vec3::new(0.0, 0.0, 1.0);
        let (welded, indices) = weld(&[a, b, a, c, b, a]);

        assert_eq!(welded, vec![a, b, c]);
        assert_eq!(indices, vec![0, 1, 0, 2, 1, 0]);
    }

    #[test]
    fn negative_zero_shares_the_positive_zero_vertex() {
        let model = Model::from_triangles([
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            [
                Vec3::new(-0.0, 0.0, -0.0),
                Vec3::new(0.0, -1.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
        ]);

        assert_eq!(model.vertices().len(), 4);
        assert_eq!(model.faces()[0].vertices[0], model.faces()[1].vertices[0]);
        let origin = model.vertices()[model.faces()[1].vertices[0] as usize];
        assert!(origin.x.is_sign_positive() && origin.z.is_sign_positive());
    }

    #[test]
    fn weld_of_nothing_is_empty() {
        let (welded, indices) = weld(&[]);
        assert!(welded.is_empty());
        assert!(indices.is_empty());
    }

    #[test]
    fn from_triangles_shares_vertices() {
        let model = quad();
        assert_eq!(model.face_count(), 2);
        assert_eq!(model.vertices().len(), 4);
        assert_eq!(model.faces()[0].vertices[0], model.faces()[1].vertices[0]);
        assert_relative_eq!(model.faces()[1].normal.z, 1.0);
    }

    #[test]
    fn bounding_box_and_center() {
        let model = quad();
        assert_eq!(model.bounding_box().from, Vec3::ZERO);
        assert_eq!(model.bounding_box().to, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(model.center(), Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn update_bounding_box_matches_load_time_box() {
        let mut model = quad();
        let cached = *model.bounding_box();
        model.update_bounding_box();
        assert_eq!(*model.bounding_box(), cached);
    }

    #[test]
    fn empty_model_box_collapses_to_origin() {
        let mut model = quad();
        model.clear();
        model.update_bounding_box();
        assert!(model.is_empty());
        assert_eq!(*model.bounding_box(), Aabb::point(Vec3::ZERO));
        assert!(model.bvh().is_none());
    }
}
