//! `stlrast`: render an STL mesh to a PNG image.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{info, warn};

use stlrast::prelude::*;

#[derive(Parser)]
#[command(name = "stlrast")]
#[command(version, about = "Render an STL mesh to a PNG image")]
struct Cli {
    /// STL file to render. Reads standard input when omitted.
    input: Option<PathBuf>,

    /// Output PNG path.
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Image width in pixels.
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// STL encoding of the input.
    #[arg(long, value_enum, default_value_t = Format::Guess)]
    format: Format,

    /// Keep the normals stored in the file instead of recomputing them.
    #[arg(long)]
    file_normals: bool,

    /// Which faces to discard by winding.
    #[arg(long, value_enum, default_value_t = Cull::Back)]
    cull: Cull,

    #[arg(long, value_enum, default_value_t = ShaderKind::Diffuse)]
    shader: ShaderKind,

    /// Use a parallel projection instead of a perspective one.
    #[arg(long)]
    orthographic: bool,

    /// Vertical field of view in degrees (perspective only).
    #[arg(long, default_value_t = 60.0)]
    fov: f32,

    /// Build a BVH with about this many faces per leaf before rendering.
    #[arg(long)]
    bvh_leaf_load: Option<usize>,

    /// Write the BVH node boxes to this path as a binary STL.
    #[arg(long, requires = "bvh_leaf_load")]
    dump_bvh: Option<PathBuf>,

    /// Background color as RRGGBB or RRGGBBAA hex.
    #[arg(long, default_value = "000000ff", value_parser = parse_color)]
    background: Color,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Guess,
    Text,
    Binary,
}

impl From<Format> for LoadMode {
    fn from(format: Format) -> Self {
        match format {
            Format::Guess => LoadMode::Guess,
            Format::Text => LoadMode::Text,
            Format::Binary => LoadMode::Binary,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Cull {
    None,
    Back,
    Front,
}

impl From<Cull> for CullingMode {
    fn from(cull: Cull) -> Self {
        match cull {
            Cull::None => CullingMode::None,
            Cull::Back => CullingMode::BACK,
            Cull::Front => CullingMode::FRONT,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ShaderKind {
    /// Directional light from above and in front of the camera.
    Diffuse,
    Depth,
    Normal,
    /// Object-space position within the bounding box.
    Position,
}

fn parse_color(hex: &str) -> Result<Color, String> {
    Color::from_hex(hex).ok_or_else(|| format!("`{hex}` is not an RRGGBB or RRGGBBAA color"))
}

fn load_model<R: BufRead>(reader: R, cli: &Cli) -> Result<Model, String> {
    let mut model = Model::new();
    model
        .load_stl(reader, cli.file_normals, cli.format.into())
        .map_err(|e| format!("failed to load STL: {e}"))?;
    Ok(model)
}

fn shader_for(kind: ShaderKind, model: &Model) -> Box<dyn Shader> {
    match kind {
        ShaderKind::Diffuse => Box::new(shaders::diffuse_directional(
            Vec3::new(0.0, -1.0, -1.0),
            Color::new(40, 40, 40, 255),
            Color::new(215, 215, 215, 255),
        )),
        ShaderKind::Depth => Box::new(shaders::depth),
        ShaderKind::Normal => Box::new(shaders::normal),
        ShaderKind::Position => Box::new(shaders::position(*model.bounding_box())),
    }
}

/// Camera on the bounding box diagonal, with a projection whose depth range
/// encloses the whole model.
fn view_projection(model: &Model, cli: &Cli) -> Mat4 {
    let camera = Camera::framing(model.bounding_box());
    let distance = camera.distance();
    let radius = 0.5 * distance;
    let aspect = cli.width as f32 / cli.height as f32;
    let (z_near, z_far) = (0.05 * distance, 2.0 * distance);

    let projection = if cli.orthographic {
        Projection::orthographic(-radius * aspect, radius * aspect, -radius, radius, z_near, z_far)
    } else {
        Projection::from_degrees(cli.fov, aspect, z_near, z_far)
    };

    projection.matrix() * camera.view_matrix()
}

fn save_png(path: &Path, pixels: &[Color], width: u32, height: u32) -> Result<(), String> {
    let bytes: Vec<u8> = pixels.iter().flat_map(|c| c.to_array()).collect();
    let image = image::RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| "pixel buffer does not match image size".to_string())?;
    image
        .save(path)
        .map_err(|e| format!("failed to write {}: {e}", path.display()))
}

fn run(cli: &Cli) -> Result<(), String> {
    if cli.width == 0 || cli.height == 0 {
        return Err("image dimensions must be positive".to_string());
    }

    let start = Instant::now();
    let mut model = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| format!("failed to open {}: {e}", path.display()))?;
            load_model(BufReader::new(file), cli)?
        }
        None => load_model(io::stdin().lock(), cli)?,
    };
    info!(
        "loaded {} faces, {} vertices in {:.2?}",
        model.face_count(),
        model.vertices().len(),
        start.elapsed()
    );

    if let Some(load) = cli.bvh_leaf_load {
        let start = Instant::now();
        model.rebuild_bvh(load);
        info!(
            "built bvh with {} nodes in {:.2?}",
            model.bvh().map_or(0, <[BvhNode]>::len),
            start.elapsed()
        );

        if let Some(path) = &cli.dump_bvh {
            let file = File::create(path)
                .map_err(|e| format!("failed to create {}: {e}", path.display()))?;
            model
                .write_bvh_stl(BufWriter::new(file))
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            info!("wrote bvh boxes to {}", path.display());
        }
    }

    let (width, height) = (cli.width as usize, cli.height as usize);
    let mut color = vec![cli.background; width * height];
    let mut depth = vec![1.0f32; width * height];

    if model.is_empty() {
        warn!("model has no faces; writing background only");
    } else {
        let mvp = view_projection(&model, cli);
        let shader = shader_for(cli.shader, &model);

        let start = Instant::now();
        let stats = render_with_stats(
            &mut Image::new(&mut color, width, height),
            &mut Image::new(&mut depth, width, height),
            &model,
            &mvp,
            shader.as_ref(),
            cli.cull.into(),
        );
        info!(
            "rendered {} of {} faces in {:.2?} ({} culled, {} clipped, {} skipped by bvh)",
            stats.rendered,
            model.face_count(),
            start.elapsed(),
            stats.culled,
            stats.clipped,
            stats.skipped
        );
    }

    save_png(&cli.output, &color, cli.width, cli.height)?;
    info!("wrote {}", cli.output.display());
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
