// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polyframe CSG CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use polyframe_csg::geometry::analytics::analyze;
use polyframe_csg::{io, spawn_evaluation, BooleanOp, Engine, EngineConfig, EvaluationReport, Mesh, Primitive};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyframe-csg")]
#[command(about = "Polyframe CSG - boolean operations on closed triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine a UV sphere and a box (sphere minus box by default)
    Demo {
        /// Boolean operation (union, subtract, intersect)
        #[arg(long, default_value = "subtract")]
        op: BooleanOp,

        #[arg(long, default_value_t = 0.75)]
        sphere_radius: f64,

        #[arg(long, default_value_t = 1.0)]
        box_size: f64,

        /// Sphere longitude segments
        #[arg(long, default_value_t = 32)]
        segments: u32,

        /// Use the box as the first operand
        #[arg(long)]
        box_first: bool,

        /// Output file (.stl or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the stage report
        #[arg(long)]
        report: bool,
    },

    /// Evaluate a boolean operation between two STL files
    Eval {
        /// First operand
        a: PathBuf,

        /// Second operand
        b: PathBuf,

        #[arg(long, default_value = "union")]
        op: BooleanOp,

        /// Output file (.stl or .json)
        #[arg(short, long)]
        output: PathBuf,

        /// Write ASCII instead of binary STL
        #[arg(long)]
        ascii: bool,

        /// Print the stage report
        #[arg(long)]
        report: bool,
    },

    /// Print geometry statistics of an STL file
    Stats {
        input: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write the effective configuration to a TOML file
    InitConfig {
        #[arg(default_value = "csg.toml")]
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::load()?,
    };

    match cli.command {
        Commands::Demo {
            op,
            sphere_radius,
            box_size,
            segments,
            box_first,
            output,
            report,
        } => {
            let sphere = Primitive::sphere(sphere_radius, segments).to_mesh().with_tag(1);
            let cube = Primitive::cube(box_size).to_mesh().with_tag(2);
            let (a, b) = if box_first { (cube, sphere) } else { (sphere, cube) };
            run_evaluation(&config, a, b, op, output.as_deref(), false, report)
        }
        Commands::Eval {
            a,
            b,
            op,
            output,
            ascii,
            report,
        } => {
            let mesh_a = io::import_stl(&a)?.with_tag(1);
            let mesh_b = io::import_stl(&b)?.with_tag(2);
            run_evaluation(&config, mesh_a, mesh_b, op, Some(&output), ascii, report)
        }
        Commands::Stats { input, json } => stats_command(&input, json, &config),
        Commands::InitConfig { output } => {
            config.save(&output)?;
            println!("{} {}", "Wrote".green(), output.display());
            Ok(())
        }
        Commands::Version => {
            println!("Polyframe CSG v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "polyframe_csg=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_evaluation(
    config: &EngineConfig,
    a: Mesh,
    b: Mesh,
    op: BooleanOp,
    output: Option<&Path>,
    ascii: bool,
    print_report: bool,
) -> Result<()> {
    println!(
        "{} {} ({} + {} polygons)",
        "Evaluating".bold(),
        op.to_string().cyan(),
        a.polygon_count(),
        b.polygon_count()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    spinner.set_message(format!("{} in progress", op));
    spinner.enable_steady_tick(Duration::from_millis(80));

    // Poll the completion channel the way a UI loop would
    let handle = spawn_evaluation(Engine::new(config.clone()), a, b, op);
    let result = loop {
        if let Some(result) = handle.wait_timeout(Duration::from_millis(50)) {
            break result;
        }
    };
    spinner.finish_and_clear();

    let (mesh, report) = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    println!(
        "{} {} triangles in {:.2?}",
        "✓".green(),
        mesh.polygon_count(),
        report.timings.total()
    );
    if print_report {
        report.print();
    }
    analyze(&mesh, report.epsilon).print();

    if let Some(path) = output {
        export(&mesh, path, ascii)?;
        println!("{} {}", "Wrote".green(), path.display());
    }
    warn_if_open(&report, &mesh);
    Ok(())
}

fn export(mesh: &Mesh, path: &Path, ascii: bool) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("json") => io::export_json(mesh, path),
        _ if ascii => io::export_stl_ascii(mesh, path),
        _ => io::export_stl(mesh, path),
    }
    .with_context(|| format!("Failed to export {}", path.display()))
}

fn warn_if_open(report: &EvaluationReport, mesh: &Mesh) {
    if !polyframe_csg::geometry::mesh_utils::is_closed(mesh, report.epsilon) {
        eprintln!("{} result is not closed", "Warning:".yellow().bold());
    }
}

fn stats_command(input: &Path, json: bool, config: &EngineConfig) -> Result<()> {
    let mesh = io::import_stl(input)?;
    let tolerance = config.epsilon_for(mesh.bounding_box().diagonal());
    let stats = analyze(&mesh, tolerance);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{} {}", "File:".bold(), input.display().to_string().cyan());
        stats.print();
    }
    Ok(())
}
