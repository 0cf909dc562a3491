mod scene;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use facet_geom::SectionCoord;
use facet_mesh::{ChunkMesh, MeshConfig, MeshContext, NORMAL_ORDER, VertexLayout};
use facet_runtime::{BuildJob, JobOut, Runtime};

use crate::scene::Scene;

#[derive(Parser, Debug)]
#[command(name = "facet", about = "Build chunk meshes from tessellation scenes")]
struct Cli {
    /// Mesh config TOML; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every mesh in a scene and print its draw ranges.
    Build {
        scene: PathBuf,
        /// Camera section as x,y,z.
        #[arg(long, value_parser = parse_section, default_value = "0,0,0")]
        camera: SectionCoord,
        /// Draw pass used for range emission; each mesh's own pass when omitted.
        #[arg(long)]
        pass: Option<u32>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the configured vertex layout.
    Layout,
}

fn parse_section(s: &str) -> Result<SectionCoord, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z but got '{s}'"));
    };
    let parse = |v: &str| v.parse::<i32>().map_err(|e| format!("'{v}': {e}"));
    Ok(SectionCoord::new(parse(x)?, parse(y)?, parse(z)?))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => {
            log::info!("loading mesh config from {}", path.display());
            MeshConfig::from_path(path)?
        }
        None => MeshConfig::default(),
    };

    match cli.command {
        Command::Layout => print_layout(VertexLayout::from_config(&config)),
        Command::Build {
            scene,
            camera,
            pass,
            workers,
        } => build(config, &scene, camera, pass, workers)?,
    }
    Ok(())
}

fn print_layout(layout: VertexLayout) {
    println!("layout {:?} stride {} bytes", layout.kind(), layout.stride());
    println!(
        "input {} words/vertex, polygon {} words/vertex",
        layout.input_vertex_size(),
        layout.polygon_vertex_size()
    );
    for attr in layout.attributes().iter() {
        println!(
            "  {:<18} {} x {:<12} offset {:>2}",
            attr.name,
            attr.components,
            format!("{:?}", attr.ty),
            attr.offset
        );
    }
}

fn build(
    config: MeshConfig,
    scene_path: &Path,
    camera: SectionCoord,
    pass: Option<u32>,
    workers: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let scene = Scene::from_path(scene_path)?;
    let ctx = Arc::new(MeshContext::new(config));
    let runtime = Runtime::new(Arc::clone(&ctx), workers)?;

    for mesh in &scene.meshes {
        let mut job = BuildJob::new(mesh.coord(), mesh.pass, mesh.batches(ctx.layout));
        if let Some(dimension) = mesh.dimension {
            job = job.with_dimension(dimension);
        }
        runtime.submit_job(job);
    }

    let mut results: Vec<JobOut> = Vec::with_capacity(scene.meshes.len());
    while results.len() < scene.meshes.len() {
        match runtime.recv_timeout(Duration::from_secs(30)) {
            Some(out) => results.push(out),
            None => {
                log::error!(
                    "timed out with {} of {} meshes built",
                    results.len(),
                    scene.meshes.len()
                );
                break;
            }
        }
    }
    results.sort_by_key(|out| out.job_id);

    for out in &results {
        match &out.mesh {
            Some(mesh) => {
                let pass = pass.unwrap_or(out.pass);
                print_mesh(mesh, camera, pass, &ctx.config, out.t_mesh_ms)
            }
            None => println!("mesh {:?} pass {}: cancelled", out.coord, out.pass),
        }
    }

    let counters = ctx.counters.snapshot();
    println!(
        "meshes alive: {}, resident bytes: {}",
        counters.live_instances, counters.resident_bytes
    );
    Ok(())
}

fn print_mesh(
    mesh: &ChunkMesh,
    camera: SectionCoord,
    pass: u32,
    config: &MeshConfig,
    t_mesh_ms: u32,
) {
    let c = mesh.coord();
    println!(
        "mesh ({}, {}, {}) pass {}: {} polygons, {} bytes, {} batches, {} ms",
        c.x,
        c.y,
        c.z,
        mesh.pass(),
        mesh.polygon_count(),
        mesh.buffer_size(),
        mesh.batch_count(),
        t_mesh_ms
    );
    for diagnostic in mesh.diagnostics() {
        println!("  {diagnostic}");
    }
    let starts = mesh.sub_mesh_starts();
    for (normal, start) in NORMAL_ORDER.iter().zip(starts) {
        if let Some(start) = start {
            println!("  bucket {normal:?} starts at polygon {start}");
        }
    }
    for range in mesh.visible_ranges(camera, pass, config) {
        println!(
            "  draw vertices {}..{}",
            range.first_vertex,
            range.first_vertex + range.vertex_count
        );
    }
}
