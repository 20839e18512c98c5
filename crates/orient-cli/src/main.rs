//! orient CLI - build-orientation optimizer
//!
//! Loads an STL mesh, measures the support it needs in a given orientation,
//! or searches random orientations for the one needing the least.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use orient_math::{Rotation, Vec3};
use orient_support::{
    estimate_support_with_geometry, rotate, seat_on_platform, Mesh, OrientationSearch,
    ProgressEvent, SamplingMode, SearchResult, SupportObjective, SupportSettings,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};

mod config;
mod stl;

use config::{resolve_settings, Overrides};

#[derive(Parser)]
#[command(name = "orient")]
#[command(about = "Find the print orientation that needs the least support", long_about = None)]
struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about an STL mesh
    Info {
        /// Path to the STL file
        file: PathBuf,
    },
    /// Measure support for one orientation
    Analyze {
        /// Path to the STL file
        file: PathBuf,
        /// Rotation about X (degrees)
        #[arg(long, allow_negative_numbers = true)]
        rx: Option<f64>,
        /// Rotation about Y (degrees)
        #[arg(long, allow_negative_numbers = true)]
        ry: Option<f64>,
        /// Rotation about Z (degrees)
        #[arg(long, allow_negative_numbers = true)]
        rz: Option<f64>,
        /// Direction to bring onto the build axis, as x,y,z
        #[arg(long, value_parser = parse_direction, allow_hyphen_values = true,
              conflicts_with_all = ["rx", "ry", "rz"])]
        direction: Option<Vec3>,
        /// Overhang angle threshold (degrees)
        #[arg(long, default_value_t = 45.0)]
        overhang_angle: f64,
        /// Drop the rotated mesh onto the platform before measuring
        #[arg(long)]
        seat: bool,
        /// Write the support columns as JSON
        #[arg(long)]
        columns: Option<PathBuf>,
    },
    /// Search for the orientation needing the least support
    Optimize {
        /// Path to the STL file
        file: PathBuf,
        /// Number of candidate orientations
        #[arg(short = 'n', long)]
        samples: Option<usize>,
        /// Sampling mode (euler or direction)
        #[arg(long)]
        mode: Option<SamplingMode>,
        /// Random seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Overhang angle threshold (degrees)
        #[arg(long)]
        overhang_angle: Option<f64>,
        /// Metric to minimize (volume, overhang_area or facing_area)
        #[arg(long)]
        objective: Option<SupportObjective>,
        /// Drop each candidate onto the platform before measuring
        #[arg(long)]
        seat: bool,
        /// TOML settings file; flags override its values
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print progress and result as JSON lines
        #[arg(long)]
        json: bool,
        /// Write the mesh in the best orientation as binary STL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { file } => {
            show_info(&file)?;
        }
        Commands::Analyze {
            file,
            rx,
            ry,
            rz,
            direction,
            overhang_angle,
            seat,
            columns,
        } => {
            let rotation = match direction {
                Some(dir) => Rotation::align_to_build_axis(&dir),
                None => Rotation::from_euler_degrees(
                    rx.unwrap_or(0.0),
                    ry.unwrap_or(0.0),
                    rz.unwrap_or(0.0),
                ),
            };
            analyze(&file, &rotation, overhang_angle, seat, columns.as_deref())?;
        }
        Commands::Optimize {
            file,
            samples,
            mode,
            seed,
            overhang_angle,
            objective,
            seat,
            config,
            json,
            output,
        } => {
            let overrides = Overrides {
                overhang_angle,
                n_samples: samples,
                sampling_mode: mode,
                random_seed: seed,
                objective,
                seat_on_platform: seat,
            };
            optimize(&file, config.as_deref(), &overrides, json, output.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_direction(s: &str) -> std::result::Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z but got '{s}'"));
    }
    let mut xyz = [0.0; 3];
    for (slot, raw) in xyz.iter_mut().zip(&parts) {
        *slot = raw
            .parse::<f64>()
            .map_err(|e| format!("bad component '{raw}': {e}"))?;
    }
    let dir = Vec3::new(xyz[0], xyz[1], xyz[2]);
    if !(dir.norm() > 0.0 && dir.norm().is_finite()) {
        return Err("direction must be a finite, non-zero vector".into());
    }
    Ok(dir)
}

fn load_mesh(path: &Path) -> Result<Mesh> {
    let mesh =
        stl::load_stl(path).with_context(|| format!("failed to load {}", path.display()))?;
    info!(triangles = mesh.len(), "loaded {}", path.display());
    Ok(mesh)
}

fn show_info(file: &Path) -> Result<()> {
    let mesh = load_mesh(file)?;

    println!("Mesh: {}", file.display());
    println!("  Triangles: {}", mesh.len());
    println!("  Degenerate faces: {}", mesh.degenerate_count());
    println!("  Surface area: {:.3} mm²", mesh.total_area());
    if let Some((min, max)) = mesh.bounds() {
        let size = max - min;
        println!(
            "  Bounds: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        println!("  Size: {:.3} x {:.3} x {:.3} mm", size.x, size.y, size.z);
    }

    Ok(())
}

fn analyze(
    file: &Path,
    rotation: &Rotation,
    overhang_angle: f64,
    seat: bool,
    columns_out: Option<&Path>,
) -> Result<()> {
    if !(0.0..=90.0).contains(&overhang_angle) {
        bail!("overhang angle must be between 0 and 90 degrees, got {overhang_angle}");
    }
    let mesh = load_mesh(file)?;

    let mut oriented = rotate(&mesh, rotation);
    if seat {
        oriented = seat_on_platform(&oriented);
    }
    let settings = SupportSettings {
        overhang_angle,
        ..Default::default()
    };
    let (estimate, columns) = estimate_support_with_geometry(&oriented, &settings);

    let [rx, ry, rz] = rotation.to_euler_degrees();
    println!("Orientation: rx={rx:.2}° ry={ry:.2}° rz={rz:.2}°");
    println!("  Faces needing support: {}", estimate.supported_faces);
    println!("  Overhang area: {:.3} mm²", estimate.overhang_area);
    println!("  Facing area: {:.3} mm²", estimate.facing_area);
    println!("  Support volume: {:.3} mm³", estimate.volume);

    if let Some(path) = columns_out {
        let json = serde_json::to_string_pretty(&columns)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {} support columns to {}", columns.len(), path.display());
    }

    Ok(())
}

/// Final line of an optimize run.
#[derive(Serialize)]
struct Summary {
    best_metric: Option<f64>,
    best_euler_degrees: Option<[f64; 3]>,
    best_iteration: Option<usize>,
    iterations_run: usize,
    was_cancelled: bool,
    error: Option<String>,
}

impl From<&SearchResult> for Summary {
    fn from(result: &SearchResult) -> Self {
        Self {
            best_metric: result.best_metric(),
            best_euler_degrees: result.best_rotation().map(|r| r.to_euler_degrees()),
            best_iteration: result.best.map(|b| b.iteration),
            iterations_run: result.iterations_run,
            was_cancelled: result.was_cancelled,
            error: result.error.clone(),
        }
    }
}

fn optimize(
    file: &Path,
    config: Option<&Path>,
    overrides: &Overrides,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let settings = resolve_settings(config, overrides)?;
    let mesh = Arc::new(load_mesh(file)?);
    let unit = match settings.objective {
        SupportObjective::Volume => "mm³",
        SupportObjective::OverhangArea | SupportObjective::FacingArea => "mm²",
    };

    let mut search = OrientationSearch::new();
    let events = search.start(Arc::clone(&mesh), settings.sampler(), settings.clone())?;
    for event in events {
        print_progress(&event, settings.n_samples, unit, json)?;
    }
    let result = search.wait()?;

    let summary = Summary::from(&result);
    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        match (summary.best_metric, summary.best_euler_degrees) {
            (Some(metric), Some([rx, ry, rz])) => {
                println!("Best: {metric:.3} {unit} at rx={rx:.2}° ry={ry:.2}° rz={rz:.2}°");
            }
            _ => println!("No orientation evaluated"),
        }
        println!(
            "Evaluated {} of {} candidates{}",
            result.iterations_run,
            settings.n_samples,
            if result.was_cancelled { " (stopped early)" } else { "" }
        );
    }
    if let Some(err) = &result.error {
        warn!("search stopped: {err}");
    }

    if let Some(path) = output {
        let Some(rotation) = result.best_rotation() else {
            bail!("no orientation to write");
        };
        let oriented = seat_on_platform(&rotate(&mesh, &rotation));
        let bytes = stl::write_stl_binary(&oriented)
            .with_context(|| format!("failed to encode {}", path.display()))?;
        fs::write(path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote best orientation to {}", path.display());
    }

    Ok(())
}

fn print_progress(event: &ProgressEvent, total: usize, unit: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!(
            "[{:>width$}/{total}] {:.3} {unit} (best {:.3})",
            event.iteration,
            event.metric,
            event.best_metric,
            width = total.to_string().len()
        );
    }
    Ok(())
}
