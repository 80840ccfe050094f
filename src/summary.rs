use crate::config::RunConfig;
use crate::continuity::ArterialMatcher;
use crate::pipeline::RunOutcome;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Instance counts per street name for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountsSummary {
    pub method: String,
    pub grid_size_meters: f64,
    pub total_streets: usize,
    pub total_segments: usize,
    pub processing_time_seconds: f64,
    pub counts: BTreeMap<String, usize>,
}

impl CountsSummary {
    pub fn from_outcome(outcome: &RunOutcome, config: &RunConfig) -> Self {
        let grid_size_meters = config.cell.metres().round();
        let method = if config.arterial.keywords().is_empty() {
            format!("Grid {grid_size_meters:.0}m")
        } else {
            format!("Grid {grid_size_meters:.0}m + Highway-Aware")
        };

        Self {
            method,
            grid_size_meters,
            total_streets: outcome.streets.len(),
            total_segments: outcome.stats.total_segments,
            processing_time_seconds: outcome.elapsed_seconds,
            counts: outcome
                .streets
                .iter()
                .map(|s| (s.name.clone(), s.instances.len()))
                .collect(),
        }
    }

    /// Names with the most instances, ties broken alphabetically.
    pub fn top(&self, n: usize) -> Vec<(&str, usize)> {
        self.counts
            .iter()
            .map(|(name, &count)| (name.as_str(), count))
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .take(n)
            .collect()
    }

    /// Arterial names and their instance counts. After the override these
    /// are all 1 unless the run disabled it.
    pub fn arterials<'a>(&'a self, matcher: &ArterialMatcher) -> Vec<(&'a str, usize)> {
        self.counts
            .iter()
            .filter(|(name, _)| matcher.is_arterial(name))
            .map(|(name, &count)| (name.as_str(), count))
            .collect()
    }

    pub fn log_report(&self, matcher: &ArterialMatcher) {
        info!(
            "{}: {} streets, {} segments in {:.2}s",
            self.method, self.total_streets, self.total_segments, self.processing_time_seconds
        );

        info!("Top 20 streets by instance count:");
        for (name, count) in self.top(20) {
            info!("  {:>4}  {}", count, name);
        }

        let arterials = self.arterials(matcher);
        let multi = arterials.iter().filter(|(_, c)| *c > 1).count();
        info!("{} arterial streets ({} with more than one instance)", arterials.len(), multi);
        for (name, count) in arterials.iter().take(20) {
            info!("  {:>4}  {}", count, name);
        }
    }
}
