use crate::segment::LonLat;
use geo::{Distance, Haversine};
use geo_types::Point;

/// Great-circle distance in metres between two (lon, lat) pairs.
pub fn haversine_m(a: LonLat, b: LonLat) -> f64 {
    Haversine.distance(Point::new(a.0, a.1), Point::new(b.0, b.1))
}

/// A Local Tangent Plane projection centered at a specific (lon0, lat0).
/// Projects (lon, lat) to (x, y) metres.
/// Equirectangular approximation: fast, and accurate enough at street scale.
/// x = R * cos(lat0) * dlon
/// y = R * dlat
#[derive(Debug, Clone, Copy)]
pub struct LocalTangentPlane {
    origin_lon_rad: f64,
    origin_lat_rad: f64,
    cos_lat0: f64,
}

impl LocalTangentPlane {
    const EARTH_RADIUS: f64 = 6_371_007.2;

    pub fn new(lon0: f64, lat0: f64) -> Self {
        let origin_lon_rad = lon0.to_radians();
        let origin_lat_rad = lat0.to_radians();
        Self {
            origin_lon_rad,
            origin_lat_rad,
            cos_lat0: origin_lat_rad.cos(),
        }
    }

    /// Centred on the mean of all given coordinates.
    pub fn centred_on<'a>(coords: impl IntoIterator<Item = &'a LonLat>) -> Option<Self> {
        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
        for &(x, y) in coords {
            sx += x;
            sy += y;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Self::new(sx / n as f64, sy / n as f64))
    }

    /// Project (lon, lat) to (x, y) metres
    pub fn project(&self, (lon, lat): LonLat) -> (f64, f64) {
        let dlon = lon.to_radians() - self.origin_lon_rad;
        let dlat = lat.to_radians() - self.origin_lat_rad;
        (
            Self::EARTH_RADIUS * self.cos_lat0 * dlon,
            Self::EARTH_RADIUS * dlat,
        )
    }
}
