// Per-street clustering pipeline:
// grid flood fill -> endpoint stitching -> arterial override -> numbering.
//
// Each street name is clustered on its own, with fresh index and union-find
// structures, so nothing leaks between names.

use crate::config::RunConfig;
use crate::connectivity::{ConnectivityStrategy, GridFloodFill, Partition};
use crate::continuity::apply_continuity_override;
use crate::error::StrategyError;
use crate::naming::{Instance, name_instances};
use crate::segment::Segment;
use crate::stitch::stitch_endpoints;
use ahash::AHashMap;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Fewer than two coordinates.
    MalformedSegment,
    /// Missing or blank name. Filtered, not an error.
    UnclassifiableName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSegment {
    pub index: usize,
    pub source_id: String,
    pub reason: SkipReason,
}

/// Component count after each merge stage. Never increases left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub grid: usize,
    pub stitched: usize,
    pub merged: usize,
}

/// Result of clustering one street's segments. Indices are local to the
/// slice handed to [`InstancePipeline::cluster_street`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetClustering {
    pub stages: StageCounts,
    pub arterial_override: bool,
    pub partition: Partition,
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub ordinal: u32,
    pub total: usize,
    pub street_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetOutcome {
    pub name: String,
    /// Indices into the full input slice, in input order.
    pub segment_indices: Vec<usize>,
    pub stages: StageCounts,
    pub arterial_override: bool,
    /// Members are indices into the full input slice.
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_segments: usize,
    pub clustered_segments: usize,
    pub malformed_segments: usize,
    pub unnamed_segments: usize,
    pub streets: usize,
    pub instances: usize,
    pub arterial_overrides: usize,
    pub failed_streets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    /// One slot per input segment; `None` for skipped segments and for
    /// segments of a street whose clustering failed.
    pub assignments: Vec<Option<Assignment>>,
    pub streets: Vec<StreetOutcome>,
    pub skipped: Vec<SkippedSegment>,
    pub stats: RunStats,
    pub elapsed_seconds: f64,
}

/// Production instance assignment.
///
/// Generic over the connectivity resolver so the benchmark can swap in
/// alternatives; [`InstancePipeline::new`] uses the grid flood fill.
#[derive(Debug, Clone)]
pub struct InstancePipeline<S = GridFloodFill> {
    config: RunConfig,
    resolver: S,
}

impl InstancePipeline<GridFloodFill> {
    pub fn new(config: RunConfig) -> Self {
        let resolver = GridFloodFill::new(config.cell);
        Self { config, resolver }
    }
}

impl<S: ConnectivityStrategy> InstancePipeline<S> {
    pub fn with_resolver(config: RunConfig, resolver: S) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Cluster the (well-formed) segments of one street name.
    pub fn cluster_street(
        &self,
        name: &str,
        segments: &[&Segment],
    ) -> Result<StreetClustering, StrategyError> {
        let grid = self.resolver.resolve(segments)?;
        let grid_count = grid.len();

        let stitched = if self.config.endpoint_stitching {
            stitch_endpoints(segments, &grid, self.config.endpoint_tolerance)
        } else {
            grid
        };
        let stitched_count = stitched.len();

        let (merged, arterial_override) =
            apply_continuity_override(name, stitched, &self.config.arterial);

        let instances = name_instances(name, &merged, &self.config.naming);

        Ok(StreetClustering {
            stages: StageCounts {
                grid: grid_count,
                stitched: stitched_count,
                merged: merged.len(),
            },
            arterial_override,
            partition: merged,
            instances,
        })
    }

    /// Cluster every street name in `segments`. Names are processed in order
    /// of first appearance; a failure on one name is logged and counted and
    /// never stops the batch.
    pub fn run(&self, segments: &[Segment]) -> RunOutcome {
        let started = Instant::now();
        let mut assignments: Vec<Option<Assignment>> = vec![None; segments.len()];
        let mut skipped = Vec::new();
        let mut stats = RunStats {
            total_segments: segments.len(),
            ..Default::default()
        };

        let mut slot_of_name: AHashMap<&str, usize> = AHashMap::new();
        let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();

        for (index, segment) in segments.iter().enumerate() {
            let Some(name) = segment.street_name() else {
                stats.unnamed_segments += 1;
                skipped.push(SkippedSegment {
                    index,
                    source_id: segment.source_id.clone(),
                    reason: SkipReason::UnclassifiableName,
                });
                continue;
            };
            if !segment.is_well_formed() {
                stats.malformed_segments += 1;
                debug!(
                    "Skipping malformed segment {} ({} coordinates) of {}",
                    segment.source_id,
                    segment.coords.len(),
                    name
                );
                skipped.push(SkippedSegment {
                    index,
                    source_id: segment.source_id.clone(),
                    reason: SkipReason::MalformedSegment,
                });
                continue;
            }

            let slot = *slot_of_name.entry(name).or_insert_with(|| {
                groups.push((name, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(index);
        }

        info!(
            "Clustering {} segments across {} street names ({} malformed, {} unnamed skipped)",
            segments.len() - skipped.len(),
            groups.len(),
            stats.malformed_segments,
            stats.unnamed_segments
        );

        let mut streets = Vec::with_capacity(groups.len());
        for (processed, (name, indices)) in groups.into_iter().enumerate() {
            let street_segments: Vec<&Segment> = indices.iter().map(|&i| &segments[i]).collect();

            match self.cluster_street(name, &street_segments) {
                Ok(clustering) => {
                    let instances: Vec<Instance> = clustering
                        .instances
                        .into_iter()
                        .map(|instance| Instance {
                            members: instance.members.iter().map(|&m| indices[m]).collect(),
                            ..instance
                        })
                        .collect();

                    for instance in &instances {
                        for &global in &instance.members {
                            assignments[global] = Some(Assignment {
                                ordinal: instance.ordinal,
                                total: instance.total,
                                street_id: instance.street_id.clone(),
                            });
                        }
                    }

                    stats.streets += 1;
                    stats.clustered_segments += indices.len();
                    stats.instances += instances.len();
                    if clustering.arterial_override {
                        stats.arterial_overrides += 1;
                    }

                    streets.push(StreetOutcome {
                        name: name.to_string(),
                        segment_indices: indices,
                        stages: clustering.stages,
                        arterial_override: clustering.arterial_override,
                        instances,
                    });
                }
                Err(e) => {
                    stats.failed_streets += 1;
                    warn!("Failed to cluster {}: {}", name, e);
                }
            }

            if (processed + 1) % 1000 == 0 {
                info!("Processed {} streets...", processed + 1);
            }
        }

        RunOutcome {
            assignments,
            streets,
            skipped,
            stats,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        }
    }
}

/// The full production pipeline seen as a single strategy, so the benchmark
/// can put it side by side with the alternatives.
impl<S: ConnectivityStrategy> ConnectivityStrategy for InstancePipeline<S> {
    fn label(&self) -> String {
        format!(
            "Grid {:.0}m + Stitch + Arterial",
            self.config.cell.metres()
        )
    }

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError> {
        let name = segments
            .iter()
            .find_map(|s| s.street_name())
            .unwrap_or_default();
        Ok(self.cluster_street(name, segments)?.partition)
    }
}
