//! End-to-end behaviour through the public API: load, build, render.

use stlrast::prelude::*;
use stlrast::stl::{HEADER_SIZE, RECORD_SIZE};

const WIDTH: usize = 64;
const HEIGHT: usize = 48;
const BACKGROUND: Color = Color::rgb(10, 20, 30);

fn white(_: Vec3, _: Vec3, _: Vec3) -> Color {
    Color::WHITE
}

fn tetrahedron() -> Model {
    let p = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];
    Model::from_triangles([
        [p[0], p[2], p[1]],
        [p[0], p[1], p[3]],
        [p[0], p[3], p[2]],
        [p[1], p[2], p[3]],
    ])
}

fn binary_header(claimed: u32) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..HEADER_SIZE as u8)
        .map(|i| i.wrapping_mul(37) | 0x80)
        .collect();
    bytes.extend_from_slice(&claimed.to_le_bytes());
    bytes
}

fn load(bytes: &[u8], mode: LoadMode) -> Result<Model, LoadError> {
    let mut model = Model::new();
    model.load_stl(bytes, true, mode)?;
    Ok(model)
}

struct Frame {
    color: Vec<Color>,
    depth: Vec<f32>,
}

impl Frame {
    fn new() -> Self {
        Self {
            color: vec![BACKGROUND; WIDTH * HEIGHT],
            depth: vec![1.0; WIDTH * HEIGHT],
        }
    }

    fn render<S: Shader + ?Sized>(
        &mut self,
        model: &Model,
        mvp: &Mat4,
        shader: &S,
        culling: CullingMode,
    ) -> usize {
        render(
            &mut Image::new(&mut self.color, WIDTH, HEIGHT),
            &mut Image::new(&mut self.depth, WIDTH, HEIGHT),
            model,
            mvp,
            shader,
            culling,
        )
    }
}

fn looking_from(eye: Vec3) -> Mat4 {
    let camera = Camera::look_at(eye, Vec3::ZERO, Vec3::UP);
    let projection = Projection::from_degrees(60.0, WIDTH as f32 / HEIGHT as f32, 0.1, 10.0);
    projection.matrix() * camera.view_matrix()
}

#[test]
fn binary_round_trip_preserves_vertices_and_connectivity() {
    let model = tetrahedron();
    let mut bytes = Vec::new();
    model.write_stl_binary(&mut bytes).unwrap();
    assert_eq!(bytes.len(), HEADER_SIZE + 4 + 4 * RECORD_SIZE);

    let reloaded = load(&bytes, LoadMode::Binary).unwrap();
    assert_eq!(reloaded.vertices(), model.vertices());
    assert_eq!(reloaded.faces(), model.faces());
    assert_eq!(reloaded.bounding_box(), model.bounding_box());
}

#[test]
fn guess_classifies_text_binary_and_blank_headers() {
    let text = "solid t\nfacet normal 0 0 1 outer loop vertex 0 0 0 vertex 1 0 0 vertex 0 1 0 endloop endfacet\nendsolid t\n";
    assert_eq!(load(text.as_bytes(), LoadMode::Guess).unwrap().face_count(), 1);

    let mut binary = binary_header(1);
    binary.extend_from_slice(&[0u8; RECORD_SIZE]);
    assert_eq!(load(&binary, LoadMode::Guess).unwrap().face_count(), 1);

    let blank = vec![b' '; HEADER_SIZE];
    assert!(matches!(load(&blank, LoadMode::Guess), Err(LoadError::GuessFailed)));
}

#[test]
fn short_binary_streams_never_parse() {
    let mut bytes = binary_header(3);
    bytes.extend(std::iter::repeat(0u8).take(3 * RECORD_SIZE));

    for end in 0..bytes.len() {
        assert!(
            matches!(load(&bytes[..end], LoadMode::Binary), Err(LoadError::FileTruncated)),
            "prefix of {end} bytes"
        );
    }
}

#[test]
fn shared_vertex_is_stored_once() {
    let facet = |a: &str, b: &str, c: &str| {
        format!("facet normal 0 0 0 outer loop vertex {a} vertex {b} vertex {c} endloop endfacet\n")
    };
    let shared = "0.5 0.25 -1";
    let src = format!(
        "solid fan\n{}{}{}endsolid fan\n",
        facet(shared, "1 0 0", "0 1 0"),
        facet("2 0 0", shared, "0 2 0"),
        facet("3 0 0", "0 3 0", shared),
    );

    let model = load(src.as_bytes(), LoadMode::Text).unwrap();
    let target = Vec3::new(0.5, 0.25, -1.0);
    assert_eq!(model.vertices().iter().filter(|&&v| v == target).count(), 1);
    assert_eq!(model.vertices().len(), 7);
}

#[test]
fn bvh_build_is_sound_for_loaded_models() {
    let mut model = tetrahedron();
    model.rebuild_bvh(0);
    let nodes = model.bvh().unwrap();

    let mut seen = vec![false; model.face_count()];
    for node in nodes {
        match node.kind {
            BvhKind::Leaf { first, last } => {
                for (i, [a, b, c]) in model.triangles().enumerate().take(last).skip(first) {
                    assert!(node.bbox.contains(&Aabb::from_triangle(a, b, c)));
                    assert!(!seen[i]);
                    seen[i] = true;
                }
            }
            BvhKind::Internal { left, right } => {
                assert_eq!(node.bbox, nodes[left].bbox.union(&nodes[right].bbox));
            }
        }
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn front_facing_triangle_renders_white() {
    let triangle = Model::from_triangles([[
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ]]);
    let mut frame = Frame::new();

    let mvp = looking_from(Vec3::new(0.0, 0.0, 3.0));
    let rendered = frame.render(&triangle, &mvp, &white, CullingMode::Clockwise);
    assert_eq!(rendered, 1);

    let mut covered = 0;
    for (color, depth) in frame.color.iter().zip(&frame.depth) {
        if *color == Color::WHITE {
            covered += 1;
            assert!(*depth > -1.0 && *depth < 1.0, "depth {depth}");
        } else {
            assert_eq!(*color, BACKGROUND);
            assert_eq!(*depth, 1.0);
        }
    }

    // The legs project to about 13.9 pixels from the right angle at pixel
    // (32, 24), along +x and up the image. Pixel centers strictly inside
    // number 91, half of the enclosing square.
    let pixel = |x: usize, y: usize| frame.color[y * WIDTH + x];
    assert_eq!(covered, 91);
    assert_eq!(pixel(36, 19), Color::WHITE, "centroid");
    assert_eq!(pixel(32, 23), Color::WHITE, "right angle");
    assert_eq!(pixel(40, 16), BACKGROUND, "beyond the hypotenuse");
    assert_eq!(pixel(36, 24), BACKGROUND, "below the bottom leg");
    assert_eq!(pixel(31, 19), BACKGROUND, "left of the vertical leg");
}

#[test]
fn triangle_seen_from_behind_is_culled() {
    let triangle = Model::from_triangles([[
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ]]);
    let mut frame = Frame::new();

    let mvp = looking_from(Vec3::new(0.0, 0.0, -3.0));
    let rendered = frame.render(&triangle, &mvp, &white, CullingMode::Clockwise);
    assert_eq!(rendered, 0);
    assert!(frame.color.iter().all(|&c| c == BACKGROUND));
    assert!(frame.depth.iter().all(|&d| d == 1.0));

    // Without culling it is drawn from either side.
    let rendered = frame.render(&triangle, &mvp, &white, CullingMode::None);
    assert_eq!(rendered, 1);
}

#[test]
fn closed_mesh_shows_only_front_faces() {
    let model = tetrahedron();
    let mvp = looking_from(Vec3::new(2.0, 1.5, 2.5));

    let mut front = Frame::new();
    let mut back = Frame::new();
    let front_count = front.render(&model, &mvp, &white, CullingMode::BACK);
    let back_count = back.render(&model, &mvp, &white, CullingMode::FRONT);
    assert_eq!(front_count + back_count, model.face_count());
    assert!(front_count > 0 && back_count > 0);
}

#[test]
fn hierarchy_does_not_change_rendering() {
    // Grid of tetrahedra spread well past the edges of the view.
    let base = tetrahedron();
    let mut triangles = Vec::new();
    for i in -6..=6 {
        for j in -6..=6 {
            let offset = Vec3::new(i as f32 * 1.5, j as f32 * 1.5, 0.0);
            triangles.extend(base.triangles().map(|t| t.map(|v| v * 0.5 + offset)));
        }
    }

    let linear = Model::from_triangles(triangles);
    let mut hierarchical = linear.clone();
    hierarchical.rebuild_bvh(4);

    let mvp = looking_from(Vec3::new(0.0, 0.0, 6.0));
    let normal_shader = shaders::normal;

    let mut a = Frame::new();
    let mut b = Frame::new();
    let count_a = a.render(&linear, &mvp, &normal_shader, CullingMode::BACK);
    let count_b = b.render(&hierarchical, &mvp, &normal_shader, CullingMode::BACK);

    assert_eq!(count_a, count_b);
    assert!(count_a > 0 && count_a < linear.face_count());
    // Shared-edge ties may resolve to either face, but the nearest depth
    // per pixel does not depend on draw order.
    assert_eq!(a.depth, b.depth);
}
