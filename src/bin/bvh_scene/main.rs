//! bvh-scene CLI - load meshes, build the BVH and inspect or export it.

use anyhow::{bail, Context, Result};
use scene_bvh::prelude::*;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Parsed command line
struct Args {
    command: String,
    files: Vec<PathBuf>,
    leaf_size: Option<usize>,
    normalize: bool,
    json: bool,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
    verbosity: &'static str,
}

fn main() {
    let args = match parse_args(env::args().skip(1).collect()) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_help();
            return;
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!("Run `bvh-scene help` for usage.");
            std::process::exit(2);
        }
    };

    let _trace_guard = init_tracing(args.verbosity);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn parse_args(raw: Vec<String>) -> Result<Option<Args>> {
    let mut args = Args {
        command: String::new(),
        files: Vec::new(),
        leaf_size: None,
        normalize: false,
        json: false,
        out: None,
        config: None,
        verbosity: "info",
    };

    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => args.verbosity = "debug",
            "-vv" | "--trace" => args.verbosity = "trace",
            "-q" | "--quiet" => args.verbosity = "warn",
            "-n" | "--normalize" => args.normalize = true,
            "-j" | "--json" => args.json = true,
            "-l" | "--leaf-size" => {
                let value = iter.next().context("--leaf-size needs a value")?;
                let n = value
                    .parse()
                    .with_context(|| format!("invalid leaf size '{value}'"))?;
                args.leaf_size = Some(n);
            }
            "-o" | "--out" => {
                args.out = Some(PathBuf::from(iter.next().context("--out needs a directory")?));
            }
            "-c" | "--config" => {
                args.config = Some(PathBuf::from(iter.next().context("--config needs a file")?));
            }
            "-h" | "--help" | "help" => return Ok(None),
            _ if args.command.is_empty() => args.command = arg,
            _ => args.files.push(PathBuf::from(arg)),
        }
    }

    if args.command.is_empty() {
        return Ok(None);
    }
    Ok(Some(args))
}

/// Log filter: RUST_LOG wins over the verbosity flags.
fn env_filter(verbosity: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity))
}

#[cfg(feature = "chrome-trace")]
fn init_tracing(verbosity: &str) -> Option<tracing_chrome::FlushGuard> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(fmt_layer);

    if env::var("BVH_SCENE_TRACE").ok().as_deref() != Some("1") {
        let _ = tracing::subscriber::set_global_default(registry);
        return None;
    }

    let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new()
        .file("trace.json")
        .build();
    if tracing::subscriber::set_global_default(registry.with(chrome_layer)).is_err() {
        return None;
    }
    Some(guard)
}

#[cfg(not(feature = "chrome-trace"))]
fn init_tracing(verbosity: &str) -> Option<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(env_filter(verbosity))
        .with(fmt_layer);
    let _ = tracing::subscriber::set_global_default(registry);
    None
}

fn run(args: &Args) -> Result<()> {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    if let Some(n) = args.leaf_size {
        settings.max_leaf_size = n;
    }
    if args.normalize {
        settings.normalize_vertex_positions = true;
    }

    match args.command.as_str() {
        "version" => {
            println!(
                "bvh-scene {} (built {} {})",
                env!("CARGO_PKG_VERSION"),
                env!("BVH_SCENE_BUILD_DATE"),
                env!("BVH_SCENE_BUILD_TIME")
            );
            return Ok(());
        }
        "info" | "i" | "build" | "b" | "nodes" | "n" | "export" | "e" => {}
        other => bail!("unknown command '{other}'"),
    }

    if args.files.is_empty() {
        bail!("missing mesh file argument");
    }

    let scene = load_scene(&args.files, &settings)?;

    match args.command.as_str() {
        "info" | "i" => cmd_info(&scene),
        "build" | "b" => cmd_build(scene, &settings, args.json)?,
        "nodes" | "n" => cmd_nodes(scene, &settings)?,
        _ => {
            let out = args.out.as_deref().context("export needs --out <dir>")?;
            cmd_export(scene, &settings, out)?;
        }
    }

    if args.config.is_none() {
        for file in &args.files {
            settings.add_recent(file.clone());
        }
        settings.save();
    }
    Ok(())
}

fn load_scene(files: &[PathBuf], settings: &Settings) -> Result<Scene> {
    let mut scene = Scene::new();
    for file in files {
        scene
            .add_mesh(file, Mat4::IDENTITY, settings.normalize_vertex_positions)
            .with_context(|| format!("loading {}", file.display()))?;
    }
    Ok(scene)
}

fn cmd_info(scene: &Scene) {
    println!("Meshes: {}", scene.meshes().len());
    for (i, mesh) in scene.meshes().iter().enumerate() {
        let m = &mesh.material;
        let range = scene.mesh_triangle_range(i).unwrap_or(0..0);
        println!(
            "  [{i}] {:<24} verts: {:>8}  tris: {:>8}  range: {:?}",
            mesh.name,
            mesh.vertices.len(),
            mesh.triangle_count(),
            range
        );
        println!(
            "       diffuse: [{:.3}, {:.3}, {:.3}]  shininess: {:.1}  transparency: {:.2}  ior: {:.2}",
            m.diffuse[0], m.diffuse[1], m.diffuse[2], m.shininess, m.transparency, m.ior
        );
        if let Some(path) = m.texture().and_then(|t| scene.textures().get(t as usize)) {
            println!("       texture: {}", path.display());
        }
    }
    println!("Triangles: {}", scene.triangles().len());
    println!("Textures: {}", scene.textures().len());
}

fn rebuild(scene: &mut Scene, settings: &Settings) -> Result<()> {
    scene.rebuild_acceleration_structure(settings.max_leaf_size)?;
    scene
        .bvh()
        .validate(scene.triangles().as_slice())
        .context("BVH failed validation")?;
    Ok(())
}

fn cmd_build(mut scene: Scene, settings: &Settings, json: bool) -> Result<()> {
    rebuild(&mut scene, settings)?;
    let stats = scene.bvh().stats();
    let bounds = scene.bvh().root().map(|r| r.bounds()).unwrap_or_default();

    if json {
        let value = serde_json::json!({
            "meshes": scene.meshes().len(),
            "triangles": scene.triangles().len(),
            "max_leaf_size": settings.max_leaf_size,
            "nodes": stats.node_count,
            "leaves": stats.leaf_count,
            "max_depth": stats.max_depth,
            "min_leaf_size": stats.min_leaf_size,
            "largest_leaf": stats.max_leaf_size,
            "avg_leaf_size": stats.avg_leaf_size,
            "bounds": {
                "min": bounds.min.to_array(),
                "max": bounds.max.to_array(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Meshes:      {}", scene.meshes().len());
    println!("Triangles:   {}", scene.triangles().len());
    println!("Leaf size:   {}", settings.max_leaf_size);
    println!("Nodes:       {}", stats.node_count);
    println!("Leaves:      {}", stats.leaf_count);
    println!("Max depth:   {}", stats.max_depth);
    println!(
        "Leaf tris:   min {} / max {} / avg {:.2}",
        stats.min_leaf_size, stats.max_leaf_size, stats.avg_leaf_size
    );
    println!("Bounds:      {:?}", bounds);
    Ok(())
}

fn cmd_nodes(mut scene: Scene, settings: &Settings) -> Result<()> {
    rebuild(&mut scene, settings)?;
    for (i, node) in scene.nodes().iter().enumerate() {
        if node.is_leaf() {
            println!(
                "{i:>6} leaf     first {:>8} count {:>3}  {:?}",
                node.first,
                node.count,
                node.bounds()
            );
        } else {
            println!(
                "{i:>6} interior left {:>8} right {:>6}  {:?}",
                node.left,
                node.right,
                node.bounds()
            );
        }
    }
    Ok(())
}

fn cmd_export(mut scene: Scene, settings: &Settings, out: &Path) -> Result<()> {
    rebuild(&mut scene, settings)?;
    let data = scene.gpu_data();
    data.write_to_dir(out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!(
        "Wrote {} triangles ({} bytes) and {} nodes ({} bytes) to {}",
        data.tri_count,
        data.triangles_bytes().len(),
        data.node_count,
        data.nodes_bytes().len(),
        out.display()
    );
    Ok(())
}

fn print_help() {
    println!(
        "bvh-scene {version}
Triangle soup + BVH builder for GPU ray tracing

USAGE:
    bvh-scene [OPTIONS] <COMMAND> <file.obj>...

COMMANDS:
    info,   i    Show sub-meshes, materials and triangle counts
    build,  b    Build the BVH and print statistics
    nodes,  n    Build the BVH and print the flat node array
    export, e    Build and write triangles.bin / nodes.bin (needs --out)
    version      Show version and build date
    help         Show this help

OPTIONS:
    -l, --leaf-size <N>    Maximum triangles per leaf (default from settings, 4)
    -n, --normalize        Normalize vertex positions into a unit box
    -j, --json             JSON output for `build`
    -o, --out <DIR>        Output directory for `export`
    -c, --config <FILE>    Read settings from FILE instead of the config dir
    -v, --verbose          Debug logging
    -vv, --trace           Trace logging
    -q, --quiet            Warnings only

ENVIRONMENT:
    RUST_LOG               Overrides the log filter
    BVH_SCENE_TRACE=1      Write trace.json (chrome-trace feature)",
        version = env!("CARGO_PKG_VERSION")
    );
}
