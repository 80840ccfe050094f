use crate::error::StrategyError;
use crate::grid::{CellKey, CellSize, cells_for_coords};
use crate::segment::Segment;
use crate::union_find::UnionFind;
use ahash::AHashMap;
use serde::Serialize;
use std::collections::VecDeque;

/// A split of `0..n` (indices into one street's segment slice) into
/// components.
///
/// Always normalised: members ascending, components ordered by their smallest
/// member. Two partitions with the same grouping therefore compare equal and
/// iterate in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    components: Vec<Vec<usize>>,
}

impl Partition {
    pub fn from_components(mut components: Vec<Vec<usize>>) -> Self {
        components.retain(|c| !c.is_empty());
        for component in &mut components {
            component.sort_unstable();
            component.dedup();
        }
        components.sort_by_key(|c| c[0]);
        Self { components }
    }

    pub fn from_union_find(uf: &mut UnionFind) -> Self {
        Self {
            components: uf.groups(),
        }
    }

    /// Every index in its own component.
    pub fn singletons(n: usize) -> Self {
        Self {
            components: (0..n).map(|i| vec![i]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Vec<usize>] {
        &self.components
    }

    pub fn into_components(self) -> Vec<Vec<usize>> {
        self.components
    }

    /// Component id of every index in `0..n`.
    pub fn component_ids(&self, n: usize) -> Vec<Option<usize>> {
        let mut ids = vec![None; n];
        for (cid, component) in self.components.iter().enumerate() {
            for &m in component {
                if m < n {
                    ids[m] = Some(cid);
                }
            }
        }
        ids
    }

    /// True when every index in `0..n` appears exactly once.
    pub fn covers_exactly(&self, n: usize) -> bool {
        let mut seen = vec![false; n];
        for &m in self.components.iter().flatten() {
            if m >= n || seen[m] {
                return false;
            }
            seen[m] = true;
        }
        seen.into_iter().all(|s| s)
    }

    /// Merge everything into one component.
    pub fn collapsed(&self) -> Self {
        Self::from_components(vec![self.components.concat()])
    }
}

/// Anything that can turn one street's segments into a partition.
///
/// The production pipeline and the benchmark harness both go through this.
pub trait ConnectivityStrategy {
    /// Short human readable name, used as the benchmark row label.
    fn label(&self) -> String;

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError>;
}

/// Progress of a populated cell during the flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Unvisited,
    Queued,
    Absorbed,
}

/// Grid flood fill: two segments are connected iff a chain of populated,
/// 8-neighbouring cells joins them.
///
/// Directly joined segments may be up to roughly two cells apart, and that
/// tolerance compounds along a chain.
#[derive(Debug, Clone, Copy)]
pub struct GridFloodFill {
    pub cell: CellSize,
}

impl GridFloodFill {
    pub fn new(cell: CellSize) -> Self {
        Self { cell }
    }
}

impl ConnectivityStrategy for GridFloodFill {
    fn label(&self) -> String {
        format!("Grid {:.0}m + Flood Fill", self.cell.metres())
    }

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError> {
        Ok(flood_fill(segments, self.cell))
    }
}

/// Cell -> segment indices, keeping the order in which cells were first seen
/// so the traversal never depends on hash iteration order.
struct CellIndex {
    order: Vec<CellKey>,
    members: AHashMap<CellKey, Vec<usize>>,
}

impl CellIndex {
    fn build(segments: &[&Segment], cell: CellSize) -> Self {
        let mut order = Vec::new();
        let mut members: AHashMap<CellKey, Vec<usize>> = AHashMap::new();
        for (idx, segment) in segments.iter().enumerate() {
            for key in cells_for_coords(&segment.coords, cell) {
                members
                    .entry(key)
                    .or_insert_with(|| {
                        order.push(key);
                        Vec::new()
                    })
                    .push(idx);
            }
        }
        Self { order, members }
    }
}

pub fn flood_fill(segments: &[&Segment], cell: CellSize) -> Partition {
    let mut uf = UnionFind::new(segments.len());
    if segments.len() < 2 {
        return Partition::from_union_find(&mut uf);
    }

    let index = CellIndex::build(segments, cell);
    let mut state: AHashMap<CellKey, CellState> = index
        .order
        .iter()
        .map(|&k| (k, CellState::Unvisited))
        .collect();

    let mut queue = VecDeque::new();
    for &start in &index.order {
        if state[&start] != CellState::Unvisited {
            continue;
        }

        state.insert(start, CellState::Queued);
        queue.push_back(start);
        let mut region_segments: Vec<usize> = Vec::new();

        while let Some(current) = queue.pop_front() {
            state.insert(current, CellState::Absorbed);
            region_segments.extend_from_slice(&index.members[&current]);

            for neighbour in current.neighbours() {
                if let Some(s) = state.get_mut(&neighbour) {
                    if *s == CellState::Unvisited {
                        *s = CellState::Queued;
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        uf.union_all(&region_segments);
    }

    Partition::from_union_find(&mut uf)
}
