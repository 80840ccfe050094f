// banksia: assigns street instance ids to a road network GeoJSON.

use anyhow::{Context, Result};
use clap::Parser;
use kerbline::config::ClusterConfig;
use kerbline::geojson_io::{RoadDataset, instance_collection};
use kerbline::pipeline::InstancePipeline;
use kerbline::summary::CountsSummary;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Road network FeatureCollection (LineString / MultiLineString features
    /// with a `name` property).
    #[arg(long, env = "KERBLINE_INPUT")]
    input: PathBuf,

    /// Where to write the input features annotated with instance ids.
    #[arg(long, env = "KERBLINE_OUTPUT")]
    output: PathBuf,

    /// Optional: one MultiLineString feature per street instance.
    #[arg(long, env = "KERBLINE_INSTANCES")]
    instances: Option<PathBuf>,

    /// Optional: per-name instance counts as JSON.
    #[arg(long, env = "KERBLINE_COUNTS")]
    counts: Option<PathBuf>,

    /// RON run configuration. Flags below override it.
    #[arg(long, env = "KERBLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Grid cell size in metres.
    #[arg(long, env = "KERBLINE_CELL_SIZE_M")]
    cell_size_m: Option<f64>,

    /// City prefix for readable ids.
    #[arg(long, env = "KERBLINE_CITY")]
    city: Option<String>,

    /// Endpoint tolerance in metres (0 = exact match).
    #[arg(long, env = "KERBLINE_ENDPOINT_TOLERANCE_M")]
    endpoint_tolerance_m: Option<f64>,
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cluster_config = match &args.config {
        Some(path) => ClusterConfig::from_ron_file(path)?,
        None => ClusterConfig::default(),
    };
    if let Some(cell_size_m) = args.cell_size_m {
        cluster_config.cell_size_m = cell_size_m;
    }
    if let Some(city) = &args.city {
        cluster_config.city = city.clone();
    }
    if let Some(tolerance) = args.endpoint_tolerance_m {
        cluster_config.endpoint_tolerance_m = tolerance;
    }

    // Bad configuration stops the run before any data is read.
    let config = cluster_config
        .validate()
        .context("invalid run configuration")?;
    info!(
        "Grid {:.0}m, arterial keywords {:?}, endpoint tolerance {:?}",
        config.cell.metres(),
        config.arterial.keywords(),
        config.endpoint_tolerance
    );

    let mut dataset = RoadDataset::load(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let pipeline = InstancePipeline::new(config.clone());
    let outcome = pipeline.run(&dataset.segments);

    let stats = &outcome.stats;
    info!(
        "Assigned {} instances across {} streets in {:.2}s",
        stats.instances, stats.streets, outcome.elapsed_seconds
    );
    info!(
        "{} segments clustered, {} malformed, {} unnamed, {} arterial overrides",
        stats.clustered_segments,
        stats.malformed_segments,
        stats.unnamed_segments,
        stats.arterial_overrides
    );
    if stats.failed_streets > 0 {
        tracing::warn!("{} streets failed to cluster", stats.failed_streets);
    }

    if let Some(path) = &args.instances {
        write_json(path, &instance_collection(&dataset.segments, &outcome))?;
    }

    let summary = CountsSummary::from_outcome(&outcome, &config);
    summary.log_report(&config.arterial);
    if let Some(path) = &args.counts {
        write_json(path, &summary)?;
    }

    dataset.annotate(&outcome);
    write_json(&args.output, &dataset.collection)?;

    Ok(())
}
