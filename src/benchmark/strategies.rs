// Alternative connectivity strategies, kept around to compare against the grid
// flood fill. None of these are used on the production path.

use crate::connectivity::{ConnectivityStrategy, Partition};
use crate::error::StrategyError;
use crate::grid::{CellKey, CellSize};
use crate::projection::{LocalTangentPlane, haversine_m};
use crate::segment::{LonLat, Segment};
use crate::union_find::UnionFind;
use ahash::AHashMap;
use geo::{BoundingRect, Buffer, Intersects};
use geo_types::{Coord, LineString, MultiPolygon};
use rstar::RTree;
use rstar::primitives::GeomWithData;

/// Points kept per segment by the distance based strategies.
pub const MAX_SAMPLED_POINTS: usize = 20;

/// Road categories treated as major roads by the adaptive endpoint strategy.
pub const MAJOR_ROAD_CATEGORIES: &[&str] = &["trunk", "motorway", "primary"];

/// Endpoints always, plus evenly spaced interior vertices, at most
/// roughly `max_points` in total.
pub fn sample_coords(coords: &[LonLat], max_points: usize) -> Vec<LonLat> {
    if coords.len() <= max_points || max_points < 3 {
        return coords.to_vec();
    }
    let mut sampled = vec![coords[0], coords[coords.len() - 1]];
    let step = (coords.len() / (max_points - 2)).max(1);
    sampled.extend(coords[..coords.len() - 1].iter().skip(step).step_by(step).copied());
    sampled
}

fn check_finite(segments: &[&Segment]) -> Result<(), StrategyError> {
    for (i, segment) in segments.iter().enumerate() {
        if segment
            .coords
            .iter()
            .any(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(StrategyError::NonFinite(i));
        }
    }
    Ok(())
}

fn any_within(a: &[LonLat], b: &[LonLat], threshold_m: f64) -> bool {
    a.iter()
        .any(|&p| b.iter().any(|&q| haversine_m(p, q) <= threshold_m))
}

/// Every pair of segments, connected when any sampled vertices are within
/// the threshold. Quadratic in segment count.
#[derive(Debug, Clone, Copy)]
pub struct PairwiseDistance {
    pub threshold_m: f64,
}

impl ConnectivityStrategy for PairwiseDistance {
    fn label(&self) -> String {
        format!("Point-to-Point ({:.0}m)", self.threshold_m)
    }

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError> {
        check_finite(segments)?;
        let sampled: Vec<Vec<LonLat>> = segments
            .iter()
            .map(|s| sample_coords(&s.coords, MAX_SAMPLED_POINTS))
            .collect();

        let mut uf = UnionFind::new(segments.len());
        for i in 0..sampled.len() {
            for j in (i + 1)..sampled.len() {
                if !uf.connected(i, j) && any_within(&sampled[i], &sampled[j], self.threshold_m) {
                    uf.union(i, j);
                }
            }
        }
        Ok(Partition::from_union_find(&mut uf))
    }
}

/// Sampled vertices in an R-tree (local metric plane); candidates within the
/// threshold are confirmed with a haversine check.
#[derive(Debug, Clone, Copy)]
pub struct RTreeNeighbour {
    pub threshold_m: f64,
}

impl ConnectivityStrategy for RTreeNeighbour {
    fn label(&self) -> String {
        format!("R-Tree Neighbour ({:.0}m)", self.threshold_m)
    }

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError> {
        check_finite(segments)?;
        let mut uf = UnionFind::new(segments.len());
        let Some(plane) = LocalTangentPlane::centred_on(segments.iter().flat_map(|s| s.coords.iter()))
        else {
            return Ok(Partition::from_union_find(&mut uf));
        };

        let sampled: Vec<Vec<LonLat>> = segments
            .iter()
            .map(|s| sample_coords(&s.coords, MAX_SAMPLED_POINTS))
            .collect();

        // data = (segment, lon, lat)
        let points: Vec<GeomWithData<[f64; 2], (usize, LonLat)>> = sampled
            .iter()
            .enumerate()
            .flat_map(|(seg_idx, coords)| {
                coords.iter().map(move |&c| {
                    let (x, y) = plane.project(c);
                    GeomWithData::new([x, y], (seg_idx, c))
                })
            })
            .collect();
        let tree = RTree::bulk_load(points);

        // Planar and great-circle distances differ slightly; search a bit wider.
        let search_radius = self.threshold_m * 1.05;
        for (seg_idx, coords) in sampled.iter().enumerate() {
            for &c in coords {
                let (x, y) = plane.project(c);
                for hit in tree.locate_within_distance([x, y], search_radius * search_radius) {
                    let (other, other_coord) = hit.data;
                    if other == seg_idx || uf.connected(seg_idx, other) {
                        continue;
                    }
                    if haversine_m(c, other_coord) <= self.threshold_m {
                        uf.union(seg_idx, other);
                    }
                }
            }
        }
        Ok(Partition::from_union_find(&mut uf))
    }
}

/// Buffers every segment by a fixed distance in a local metric plane and
/// joins segments whose buffers intersect.
#[derive(Debug, Clone, Copy)]
pub struct BufferIntersection {
    pub buffer_m: f64,
}

impl ConnectivityStrategy for BufferIntersection {
    fn label(&self) -> String {
        format!("Polygon Buffer ({:.0}m)", self.buffer_m)
    }

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError> {
        check_finite(segments)?;
        let mut uf = UnionFind::new(segments.len());
        let Some(plane) = LocalTangentPlane::centred_on(segments.iter().flat_map(|s| s.coords.iter()))
        else {
            return Ok(Partition::from_union_find(&mut uf));
        };

        let buffered: Vec<Option<MultiPolygon<f64>>> = segments
            .iter()
            .map(|s| {
                if s.coords.len() < 2 {
                    return None;
                }
                let line: LineString<f64> = s
                    .coords
                    .iter()
                    .map(|&c| {
                        let (x, y) = plane.project(c);
                        Coord { x, y }
                    })
                    .collect();
                let polygon = line.buffer(self.buffer_m);
                (!polygon.0.is_empty()).then_some(polygon)
            })
            .collect();

        if segments.len() > 1 && buffered.iter().all(Option::is_none) {
            return Err(StrategyError::Geometry(
                "buffering produced no polygons".to_string(),
            ));
        }

        let bounds: Vec<_> = buffered
            .iter()
            .map(|b| b.as_ref().and_then(|p| p.bounding_rect()))
            .collect();

        for i in 0..segments.len() {
            let (Some(a), Some(a_bounds)) = (&buffered[i], bounds[i]) else {
                continue;
            };
            for j in (i + 1)..segments.len() {
                let (Some(b), Some(b_bounds)) = (&buffered[j], bounds[j]) else {
                    continue;
                };
                if uf.connected(i, j) || !a_bounds.intersects(&b_bounds) {
                    continue;
                }
                if a.intersects(b) {
                    uf.union(i, j);
                }
            }
        }
        Ok(Partition::from_union_find(&mut uf))
    }
}

/// Only the two ends of each segment count. The adaptive variant widens the
/// threshold when either segment is tagged as a major road.
#[derive(Debug, Clone, Copy)]
pub struct EndpointDistance {
    pub threshold_m: f64,
    pub major_road_threshold_m: Option<f64>,
}

impl EndpointDistance {
    fn is_major_road(segment: &Segment) -> bool {
        segment
            .category
            .as_deref()
            .is_some_and(|c| MAJOR_ROAD_CATEGORIES.contains(&c))
    }
}

impl ConnectivityStrategy for EndpointDistance {
    fn label(&self) -> String {
        match self.major_road_threshold_m {
            Some(_) => "Endpoint Adaptive".to_string(),
            None => format!("Endpoint Only ({:.0}m)", self.threshold_m),
        }
    }

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError> {
        check_finite(segments)?;
        let endpoints: Vec<Option<(LonLat, LonLat)>> =
            segments.iter().map(|s| s.endpoints()).collect();

        let mut uf = UnionFind::new(segments.len());
        for i in 0..segments.len() {
            let Some((a0, a1)) = endpoints[i] else {
                continue;
            };
            for j in (i + 1)..segments.len() {
                let Some((b0, b1)) = endpoints[j] else {
                    continue;
                };
                let threshold = match self.major_road_threshold_m {
                    Some(boost)
                        if Self::is_major_road(segments[i]) || Self::is_major_road(segments[j]) =>
                    {
                        boost
                    }
                    _ => self.threshold_m,
                };
                let min_dist = [(a0, b0), (a0, b1), (a1, b0), (a1, b1)]
                    .into_iter()
                    .map(|(p, q)| haversine_m(p, q))
                    .fold(f64::INFINITY, f64::min);
                if min_dist <= threshold {
                    uf.union(i, j);
                }
            }
        }
        Ok(Partition::from_union_find(&mut uf))
    }
}

/// Groups segments whose centroids land in the same grid cell. No
/// neighbour propagation at all.
#[derive(Debug, Clone, Copy)]
pub struct CentroidGrid {
    pub cell: CellSize,
}

impl ConnectivityStrategy for CentroidGrid {
    fn label(&self) -> String {
        format!("Centroid Grid {:.0}m", self.cell.metres())
    }

    fn resolve(&self, segments: &[&Segment]) -> Result<Partition, StrategyError> {
        check_finite(segments)?;
        let mut uf = UnionFind::new(segments.len());
        let mut first_in_cell: AHashMap<CellKey, usize> = AHashMap::new();
        for (i, segment) in segments.iter().enumerate() {
            let Some(centroid) = segment.centroid() else {
                continue;
            };
            let first = *first_in_cell.entry(CellKey::of(centroid, self.cell)).or_insert(i);
            uf.union(first, i);
        }
        Ok(Partition::from_union_find(&mut uf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(coords: Vec<(f64, f64)>) -> Segment {
        Segment::new("t", Some("Example Street"), coords)
    }

    /// Two segments ~20 m apart, plus one ~5 km away.
    fn fixture() -> Vec<Segment> {
        vec![
            seg(vec![(151.2000, -33.8700), (151.2010, -33.8700)]),
            seg(vec![(151.2012, -33.8700), (151.2020, -33.8700)]),
            seg(vec![(151.2500, -33.8700), (151.2510, -33.8700)]),
        ]
    }

    fn refs(segments: &[Segment]) -> Vec<&Segment> {
        segments.iter().collect()
    }

    #[test]
    fn test_sample_coords_keeps_endpoints() {
        let coords: Vec<LonLat> = (0..100).map(|i| (i as f64, 0.0)).collect();
        let sampled = sample_coords(&coords, 20);
        assert_eq!(sampled[0], (0.0, 0.0));
        assert_eq!(sampled[1], (99.0, 0.0));
        assert!(sampled.len() <= 22);
        assert!(sampled.contains(&(5.0, 0.0)));

        let short = vec![(0.0, 0.0), (1.0, 1.0)];
        assert_eq!(sample_coords(&short, 20), short);
    }

    #[test]
    fn test_pairwise_threshold() {
        let segments = fixture();
        let tight = PairwiseDistance { threshold_m: 10.0 }.resolve(&refs(&segments)).unwrap();
        assert_eq!(tight.len(), 3);
        let loose = PairwiseDistance { threshold_m: 30.0 }.resolve(&refs(&segments)).unwrap();
        assert_eq!(loose.components(), &[vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_rtree_agrees_with_pairwise() {
        let segments = fixture();
        let p = RTreeNeighbour { threshold_m: 30.0 }.resolve(&refs(&segments)).unwrap();
        assert_eq!(p.components(), &[vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_buffer_intersection() {
        let segments = fixture();
        let p = BufferIntersection { buffer_m: 15.0 }.resolve(&refs(&segments)).unwrap();
        assert_eq!(p.components(), &[vec![0, 1], vec![2]]);
        let p = BufferIntersection { buffer_m: 5.0 }.resolve(&refs(&segments)).unwrap();
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_endpoint_adaptive_boost() {
        let segments = vec![
            seg(vec![(151.2000, -33.8700), (151.2010, -33.8700)]).with_category("motorway"),
            seg(vec![(151.2110, -33.8700), (151.2120, -33.8700)]).with_category("motorway"),
        ];
        let plain = EndpointDistance {
            threshold_m: 30.0,
            major_road_threshold_m: None,
        };
        assert_eq!(plain.resolve(&refs(&segments)).unwrap().len(), 2);

        let adaptive = EndpointDistance {
            threshold_m: 30.0,
            major_road_threshold_m: Some(2000.0),
        };
        assert_eq!(adaptive.label(), "Endpoint Adaptive");
        assert_eq!(adaptive.resolve(&refs(&segments)).unwrap().len(), 1);
    }

    #[test]
    fn test_centroid_grid() {
        let segments = fixture();
        let cell = CellSize::from_metres(1000.0).unwrap();
        let p = CentroidGrid { cell }.resolve(&refs(&segments)).unwrap();
        assert!(p.covers_exactly(3));
        assert!(p.len() >= 2);
    }

    #[test]
    fn test_non_finite_is_reported() {
        let segments = vec![
            seg(vec![(0.0, 0.0), (0.0, 1.0)]),
            seg(vec![(f64::NAN, 0.0), (0.0, 1.0)]),
        ];
        let err = PairwiseDistance { threshold_m: 30.0 }
            .resolve(&refs(&segments))
            .unwrap_err();
        assert_eq!(err, StrategyError::NonFinite(1));
    }
}
