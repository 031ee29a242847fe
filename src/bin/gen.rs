//! ipidx-gen: CLI tool for building index artifacts from source tables.

use clap::{Parser, Subcommand};
use ipidx::index::SourceTables;
use ipidx::{AddressFamily, BuildSettings, IndexBuilder, IndexKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ipidx-gen")]
#[command(version = "0.1.0")]
#[command(about = "Build two-level binary search indexes from IP range tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build index artifacts for one or both address families
    Build {
        /// Index kind: country or geocode
        #[arg(short, long)]
        kind: String,

        /// Directory holding the source tables
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Output directory for the built artifacts
        #[arg(short, long)]
        output: PathBuf,

        /// Optional YAML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Restrict the build to one family (4 or 6)
        #[arg(short, long)]
        family: Option<String>,
    },

    /// Validate source tables without writing artifacts
    Check {
        /// Index kind: country or geocode
        #[arg(short, long)]
        kind: String,

        /// Directory holding the source tables
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Optional YAML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            kind,
            data_dir,
            output,
            config,
            family,
        } => build(&kind, data_dir, &output, config, family),
        Commands::Check {
            kind,
            data_dir,
            config,
        } => check(&kind, data_dir, config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_kind(kind: &str) -> Result<IndexKind, Box<dyn std::error::Error>> {
    IndexKind::from_str(kind).ok_or_else(|| format!("unknown index kind: {kind}").into())
}

fn resolve_settings(
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<BuildSettings, Box<dyn std::error::Error>> {
    let mut settings = match config {
        Some(path) => BuildSettings::from_file(path)?,
        None => BuildSettings::new("."),
    };
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    Ok(settings)
}

fn parse_family(family: &str) -> Result<AddressFamily, Box<dyn std::error::Error>> {
    AddressFamily::from_str(family).ok_or_else(|| format!("unknown family: {family}").into())
}

fn build(
    kind: &str,
    data_dir: Option<PathBuf>,
    output: &PathBuf,
    config: Option<PathBuf>,
    family: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = parse_kind(kind)?;
    let settings = resolve_settings(data_dir, config)?;
    let builder = IndexBuilder::new(kind, settings);

    match family {
        Some(family) => builder.build_family(parse_family(&family)?, output)?,
        None => builder.build(output)?,
    }

    println!("Index written to {:?}", output);
    Ok(())
}

fn check(
    kind: &str,
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = parse_kind(kind)?;
    let settings = resolve_settings(data_dir, config)?;

    for family in AddressFamily::ALL {
        let tables = SourceTables::load(&settings, kind, family)?;
        println!(
            "family v{}: {} rows, {} buckets",
            family.file_stem(),
            tables.row_count(),
            kind.bucket_count()
        );
    }
    Ok(())
}
