// wattle: runs every connectivity method side by side on a handful of streets
// and reports instance counts and timings.

use anyhow::{Context, Result};
use clap::Parser;
use kerbline::benchmark::{DEFAULT_TEST_STREETS, MethodHarness, select_streets};
use kerbline::config::ClusterConfig;
use kerbline::geojson_io::RoadDataset;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Road network FeatureCollection.
    #[arg(long, env = "KERBLINE_INPUT")]
    input: PathBuf,

    /// Streets to compare (comma-separated). Abbreviations such as "St" or
    /// "Rd" match their long forms.
    #[arg(long, value_delimiter = ',')]
    streets: Option<Vec<String>>,

    /// Directory for method_comparison.json and method_comparison_detailed.json.
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    /// RON run configuration for the production pipeline row.
    #[arg(long, env = "KERBLINE_CONFIG")]
    config: Option<PathBuf>,
}

fn write_pretty(path: PathBuf, value: &serde_json::Value) -> Result<()> {
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Results saved to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cluster_config = match &args.config {
        Some(path) => ClusterConfig::from_ron_file(path)?,
        None => ClusterConfig::default(),
    };
    let config = cluster_config
        .validate()
        .context("invalid run configuration")?;
    let harness = MethodHarness::standard(&config)?;

    let dataset = RoadDataset::load(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let wanted: Vec<String> = match args.streets {
        Some(streets) => streets.into_iter().map(|s| s.trim().to_string()).collect(),
        None => DEFAULT_TEST_STREETS.iter().map(|s| s.to_string()).collect(),
    };
    let selected = select_streets(&dataset.segments, wanted.as_slice());
    info!(
        "Comparing {} methods on {} of {} requested streets",
        harness.labels().len(),
        selected.len(),
        wanted.len()
    );

    let report = harness.run(&selected);

    println!("\nINSTANCE COUNTS\n");
    println!("{}", report.count_table());
    println!("\nPROCESSING TIME\n");
    println!("{}", report.timing_table());

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    write_pretty(args.output_dir.join("method_comparison.json"), &report.summary_json())?;
    write_pretty(
        args.output_dir.join("method_comparison_detailed.json"),
        &report
            .detailed_json()
            .context("serializing detailed comparison")?,
    )?;

    Ok(())
}
