//! Offline comparison of connectivity strategies on selected streets.
//!
//! Every (street, strategy) pair is one cell of the report. A cell that fails,
//! including by panicking, records an error and the run carries on.

pub mod strategies;

use crate::config::RunConfig;
use crate::connectivity::{ConnectivityStrategy, GridFloodFill};
use crate::error::{ConfigError, StrategyError};
use crate::grid::CellSize;
use crate::pipeline::InstancePipeline;
use crate::segment::Segment;
use crate::street_key::StreetKey;
use ahash::AHashMap;
use itertools::Itertools;
use serde::Serialize;
use serde_json::json;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;
use strategies::{BufferIntersection, CentroidGrid, EndpointDistance, PairwiseDistance, RTreeNeighbour};
use tracing::{info, warn};

/// Sydney streets the grid size was tuned on.
pub const DEFAULT_TEST_STREETS: &[&str] = &[
    "Victoria Street",
    "Regent Street",
    "Short Street",
    "Railway Terrace",
    "Princes Highway",
    "Park Street",
    "George Street",
    "Elizabeth Street",
    "William Street",
    "King Street",
    "Church Street",
    "Windsor Street",
    "Albert Street",
    "Parramatta Road",
    "Liverpool Road",
    "Victoria Road",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CellOutcome {
    Ok {
        count: usize,
        seconds: f64,
        components: Vec<Vec<usize>>,
    },
    Error {
        message: String,
    },
}

impl CellOutcome {
    pub fn count(&self) -> Option<usize> {
        match self {
            CellOutcome::Ok { count, .. } => Some(*count),
            CellOutcome::Error { .. } => None,
        }
    }

    pub fn seconds(&self) -> f64 {
        match self {
            CellOutcome::Ok { seconds, .. } => *seconds,
            CellOutcome::Error { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodResult {
    pub method: String,
    pub outcome: CellOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetBenchmark {
    pub street: String,
    pub segment_count: usize,
    pub results: Vec<MethodResult>,
}

impl StreetBenchmark {
    pub fn result(&self, method: &str) -> Option<&CellOutcome> {
        self.results
            .iter()
            .find(|r| r.method == method)
            .map(|r| &r.outcome)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub methods: Vec<String>,
    pub streets: Vec<StreetBenchmark>,
}

/// A street picked for benchmarking, with its well-formed segments.
pub struct SelectedStreet<'a> {
    pub label: String,
    pub segments: Vec<&'a Segment>,
}

/// Segments whose name normalises to the same [`StreetKey`] as each wanted
/// street. Streets with no segments are dropped.
pub fn select_streets<'a, S: AsRef<str>>(segments: &'a [Segment], wanted: &[S]) -> Vec<SelectedStreet<'a>> {
    let mut by_key: AHashMap<StreetKey, Vec<&'a Segment>> = AHashMap::new();
    for segment in segments.iter().filter(|s| s.is_well_formed()) {
        if let Some(name) = segment.street_name() {
            by_key.entry(StreetKey::parse(name)).or_default().push(segment);
        }
    }

    wanted
        .iter()
        .filter_map(|w| {
            let label = w.as_ref().to_string();
            match by_key.get(&StreetKey::parse(&label)) {
                Some(found) => Some(SelectedStreet {
                    label,
                    segments: found.clone(),
                }),
                None => {
                    warn!("No segments found for {}", label);
                    None
                }
            }
        })
        .collect()
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Default)]
pub struct MethodHarness {
    strategies: Vec<Box<dyn ConnectivityStrategy>>,
}

impl MethodHarness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: impl ConnectivityStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Every strategy the tuning compared, plus the production pipeline
    /// at the configured settings.
    pub fn standard(config: &RunConfig) -> Result<Self, ConfigError> {
        let mut harness = Self::new();
        for threshold_m in [30.0, 50.0, 100.0] {
            harness = harness.with_strategy(PairwiseDistance { threshold_m });
        }
        for metres in [50.0, 100.0, 200.0] {
            harness = harness.with_strategy(GridFloodFill::new(CellSize::from_metres(metres)?));
        }
        harness = harness
            .with_strategy(InstancePipeline::new(config.clone()))
            .with_strategy(RTreeNeighbour { threshold_m: 30.0 })
            .with_strategy(BufferIntersection { buffer_m: 30.0 })
            .with_strategy(BufferIntersection { buffer_m: 50.0 })
            .with_strategy(EndpointDistance {
                threshold_m: 30.0,
                major_road_threshold_m: None,
            })
            .with_strategy(EndpointDistance {
                threshold_m: 100.0,
                major_road_threshold_m: None,
            })
            .with_strategy(EndpointDistance {
                threshold_m: 30.0,
                major_road_threshold_m: Some(2000.0),
            })
            .with_strategy(CentroidGrid {
                cell: CellSize::from_metres(100.0)?,
            });
        Ok(harness)
    }

    pub fn labels(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.label()).collect()
    }

    fn run_cell(strategy: &dyn ConnectivityStrategy, segments: &[&Segment]) -> CellOutcome {
        let started = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| strategy.resolve(segments)))
            .unwrap_or_else(|payload| Err(StrategyError::Panicked(panic_message(payload))));
        let seconds = started.elapsed().as_secs_f64();

        match result {
            Ok(partition) => CellOutcome::Ok {
                count: partition.len(),
                seconds,
                components: partition.into_components(),
            },
            Err(e) => CellOutcome::Error {
                message: e.to_string(),
            },
        }
    }

    pub fn run_street(&self, street: &str, segments: &[&Segment]) -> StreetBenchmark {
        info!("Testing: {} ({} segments)", street, segments.len());
        let results = self
            .strategies
            .iter()
            .map(|strategy| {
                let method = strategy.label();
                let outcome = Self::run_cell(strategy.as_ref(), segments);
                match &outcome {
                    CellOutcome::Ok { count, seconds, .. } => {
                        info!("  {}: {} instances in {:.3}s", method, count, seconds)
                    }
                    CellOutcome::Error { message } => warn!("  {}: ERROR: {}", method, message),
                }
                MethodResult { method, outcome }
            })
            .collect();

        StreetBenchmark {
            street: street.to_string(),
            segment_count: segments.len(),
            results,
        }
    }

    pub fn run(&self, streets: &[SelectedStreet<'_>]) -> BenchmarkReport {
        BenchmarkReport {
            methods: self.labels(),
            streets: streets
                .iter()
                .map(|s| self.run_street(&s.label, &s.segments))
                .collect(),
        }
    }
}

const METHOD_WIDTH: usize = 34;
const COLUMN_WIDTH: usize = 15;

impl BenchmarkReport {
    fn header(&self) -> String {
        let columns = self
            .streets
            .iter()
            .map(|s| {
                let short: String = s.street.chars().take(COLUMN_WIDTH - 1).collect();
                format!("{:>width$}", short, width = COLUMN_WIDTH)
            })
            .join("");
        format!(
            "{:<mw$}{}\n{}",
            "Method",
            columns,
            "-".repeat(METHOD_WIDTH + COLUMN_WIDTH * self.streets.len()),
            mw = METHOD_WIDTH
        )
    }

    fn table(&self, cell: impl Fn(&CellOutcome) -> String) -> String {
        let mut out = self.header();
        for method in &self.methods {
            out.push('\n');
            out.push_str(&format!("{:<mw$}", method, mw = METHOD_WIDTH));
            for street in &self.streets {
                let text = street.result(method).map(&cell).unwrap_or_default();
                out.push_str(&format!("{:>width$}", text, width = COLUMN_WIDTH));
            }
        }
        out
    }

    /// Instance count per method (rows) and street (columns).
    pub fn count_table(&self) -> String {
        self.table(|outcome| match outcome.count() {
            Some(count) => count.to_string(),
            None => "ERROR".to_string(),
        })
    }

    pub fn timing_table(&self) -> String {
        self.table(|outcome| format!("{:.3}s", outcome.seconds()))
    }

    /// Counts and timings only; errors show up as the string "ERROR".
    pub fn summary_json(&self) -> serde_json::Value {
        let results: serde_json::Map<String, serde_json::Value> = self
            .streets
            .iter()
            .map(|street| {
                let methods: serde_json::Map<String, serde_json::Value> = street
                    .results
                    .iter()
                    .map(|r| {
                        let count = match r.outcome.count() {
                            Some(c) => json!(c),
                            None => json!("ERROR"),
                        };
                        (
                            r.method.clone(),
                            json!({ "count": count, "time": r.outcome.seconds() }),
                        )
                    })
                    .collect();
                (street.street.clone(), serde_json::Value::Object(methods))
            })
            .collect();

        json!({
            "streets": self.streets.iter().map(|s| s.street.clone()).collect::<Vec<_>>(),
            "results": results,
        })
    }

    /// Full groupings per street and method, for visual inspection.
    pub fn detailed_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
