// Second merge pass: components whose segments share an endpoint are the same
// street, whatever the grid thought. Catches joins that sit on a cell boundary.

use crate::connectivity::Partition;
use crate::grid::{CellKey, CellSize, METRES_PER_DEGREE};
use crate::projection::haversine_m;
use crate::segment::{LonLat, Segment};
use crate::union_find::UnionFind;
use ahash::AHashMap;

/// How close two endpoints must be to count as the same point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EndpointTolerance {
    /// Bitwise-equal coordinates (with -0.0 treated as 0.0).
    #[default]
    Exact,
    /// Within this many metres (haversine).
    Metres(f64),
}

fn exact_key((lon, lat): LonLat) -> (u64, u64) {
    // +0.0 folds -0.0 onto 0.0 so the two share a key.
    ((lon + 0.0).to_bits(), (lat + 0.0).to_bits())
}

/// Union components whose segments have a common endpoint. Never splits.
pub fn stitch_endpoints(
    segments: &[&Segment],
    partition: &Partition,
    tolerance: EndpointTolerance,
) -> Partition {
    if partition.len() <= 1 {
        return partition.clone();
    }

    // (endpoint, owning component id), in segment order
    let mut endpoints: Vec<(LonLat, usize)> = Vec::new();
    for (cid, component) in partition.components().iter().enumerate() {
        for &idx in component {
            if let Some((start, end)) = segments[idx].endpoints() {
                endpoints.push((start, cid));
                endpoints.push((end, cid));
            }
        }
    }

    let mut uf = UnionFind::new(partition.len());
    match tolerance {
        EndpointTolerance::Exact => union_exact(&endpoints, &mut uf),
        EndpointTolerance::Metres(metres) => union_within(&endpoints, metres, &mut uf),
    }

    let merged = uf
        .groups()
        .into_iter()
        .map(|cids| {
            cids.into_iter()
                .flat_map(|cid| partition.components()[cid].iter().copied())
                .collect()
        })
        .collect();
    Partition::from_components(merged)
}

fn union_exact(endpoints: &[(LonLat, usize)], uf: &mut UnionFind) {
    let mut owners: AHashMap<(u64, u64), Vec<usize>> = AHashMap::new();
    for &(coord, cid) in endpoints {
        let claimed = owners.entry(exact_key(coord)).or_default();
        if !claimed.contains(&cid) {
            claimed.push(cid);
        }
    }
    for claimed in owners.values() {
        if claimed.len() > 1 {
            uf.union_all(claimed);
        }
    }
}

/// Latitude at which the longitude reach is computed is capped here; past it
/// the reach would grow without bound for no practical gain.
const MAX_REACH_LATITUDE: f64 = 89.0;

/// Longitude buckets to probe on each side. A bucket is `metres` wide in
/// latitude, but a degree of longitude shrinks with `cos(lat)`, so an east-west
/// pair within tolerance can sit several buckets apart away from the equator.
/// Sized for the highest latitude present, with a little slack for the
/// difference between a parallel and a great circle.
fn longitude_reach(endpoints: &[(LonLat, usize)]) -> i64 {
    let max_abs_lat = endpoints
        .iter()
        .map(|((_, lat), _)| lat.abs())
        .fold(0.0_f64, f64::max)
        .min(MAX_REACH_LATITUDE);
    (1.01 / max_abs_lat.to_radians().cos()).ceil() as i64
}

fn union_within(endpoints: &[(LonLat, usize)], metres: f64, uf: &mut UnionFind) {
    // One tolerance per bucket in latitude, so the latitude neighbours cover
    // every pair. Longitude needs the wider reach. Haversine then confirms.
    let Ok(bucket) = CellSize::from_degrees(metres / METRES_PER_DEGREE) else {
        union_exact(endpoints, uf);
        return;
    };
    let reach = longitude_reach(endpoints);

    let mut buckets: AHashMap<CellKey, Vec<usize>> = AHashMap::new();
    for (i, &(coord, _)) in endpoints.iter().enumerate() {
        buckets.entry(CellKey::of(coord, bucket)).or_default().push(i);
    }

    for (i, &(coord, cid)) in endpoints.iter().enumerate() {
        let key = CellKey::of(coord, bucket);
        for dlat in -1..=1_i64 {
            for dlon in -reach..=reach {
                let probe = CellKey {
                    lat: key.lat.saturating_add(dlat),
                    lon: key.lon.saturating_add(dlon),
                };
                let Some(candidates) = buckets.get(&probe) else {
                    continue;
                };
                for &j in candidates {
                    let (other, other_cid) = endpoints[j];
                    if j <= i || other_cid == cid || uf.connected(cid, other_cid) {
                        continue;
                    }
                    if haversine_m(coord, other) <= metres {
                        uf.union(cid, other_cid);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(coords: Vec<(f64, f64)>) -> Segment {
        Segment::new("t", Some("Example Street"), coords)
    }

    #[test]
    fn test_shared_endpoint_merges_components() {
        let segments = vec![
            seg(vec![(0.0, 0.0), (0.0, 1.0)]),
            seg(vec![(5.0, 5.0), (6.0, 6.0)]),
            seg(vec![(0.0, 1.0), (0.0, 2.0)]),
        ];
        let refs: Vec<&Segment> = segments.iter().collect();
        let grid = Partition::singletons(3);
        let stitched = stitch_endpoints(&refs, &grid, EndpointTolerance::Exact);
        assert_eq!(stitched.components(), &[vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_interior_vertices_do_not_count() {
        let segments = vec![
            seg(vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
            seg(vec![(1.0, 1.0), (0.0, 1.0), (-1.0, 1.0)]),
        ];
        let refs: Vec<&Segment> = segments.iter().collect();
        let stitched = stitch_endpoints(&refs, &Partition::singletons(2), EndpointTolerance::Exact);
        assert_eq!(stitched.len(), 2);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let segments = vec![
            seg(vec![(1.0, 1.0), (-0.0, 0.0)]),
            seg(vec![(0.0, -0.0), (2.0, 2.0)]),
        ];
        let refs: Vec<&Segment> = segments.iter().collect();
        let stitched = stitch_endpoints(&refs, &Partition::singletons(2), EndpointTolerance::Exact);
        assert_eq!(stitched.len(), 1);
    }

    #[test]
    fn test_near_miss_needs_tolerance() {
        // ~0.5 m apart
        let segments = vec![
            seg(vec![(151.0, -33.0), (151.001, -33.0)]),
            seg(vec![(151.001, -33.0000045), (151.002, -33.0)]),
        ];
        let refs: Vec<&Segment> = segments.iter().collect();
        let grid = Partition::singletons(2);

        let exact = stitch_endpoints(&refs, &grid, EndpointTolerance::Exact);
        assert_eq!(exact.len(), 2);

        let loose = stitch_endpoints(&refs, &grid, EndpointTolerance::Metres(1.0));
        assert_eq!(loose.len(), 1);
    }

    #[test]
    fn test_east_west_near_miss_at_sydney_latitude() {
        // Put the gap across two longitude buckets: a degree of longitude at
        // -33.87 is ~92 km, so 0.9 m east is ~1.08 tolerance buckets.
        let lat = -33.87;
        let bucket = 1.0 / METRES_PER_DEGREE;
        let a = (151.0 / bucket).floor() * bucket + 0.45 * bucket;
        let b = a + 9.75e-6;
        let cell = CellSize::from_degrees(bucket).unwrap();
        assert_eq!(CellKey::of((b, lat), cell).lon - CellKey::of((a, lat), cell).lon, 2);
        assert!(haversine_m((a, lat), (b, lat)) < 1.0);

        let segments = vec![
            seg(vec![(a - 0.001, lat), (a, lat)]),
            seg(vec![(b, lat), (b + 0.001, lat)]),
        ];
        let refs: Vec<&Segment> = segments.iter().collect();
        let grid = Partition::singletons(2);

        assert_eq!(stitch_endpoints(&refs, &grid, EndpointTolerance::Exact).len(), 2);
        assert_eq!(
            stitch_endpoints(&refs, &grid, EndpointTolerance::Metres(1.0)).len(),
            1
        );
        // 0.9 m apart is still outside half a metre
        assert_eq!(
            stitch_endpoints(&refs, &grid, EndpointTolerance::Metres(0.5)).len(),
            2
        );
    }

    #[test]
    fn test_longitude_reach_grows_with_latitude() {
        assert_eq!(longitude_reach(&[((0.0, 0.0), 0)]), 2);
        assert_eq!(longitude_reach(&[((151.0, -33.87), 0), ((151.0, -10.0), 1)]), 2);
        assert_eq!(longitude_reach(&[((18.0, 69.6), 0)]), 3);
        assert!(longitude_reach(&[((0.0, 90.0), 0)]) < 100);
    }

    #[test]
    fn test_already_merged_components_untouched() {
        let segments = vec![seg(vec![(0.0, 0.0), (0.0, 1.0)]), seg(vec![(3.0, 3.0), (4.0, 4.0)])];
        let refs: Vec<&Segment> = segments.iter().collect();
        let one = Partition::from_components(vec![vec![0, 1]]);
        assert_eq!(stitch_endpoints(&refs, &one, EndpointTolerance::Exact), one);
    }
}
