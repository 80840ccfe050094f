use geo_types::{Coord, LineString};

/// (longitude, latitude) in degrees, WGS84.
pub type LonLat = (f64, f64);

/// One digitized piece of a road centerline.
///
/// Loaded once and never mutated; the clustering stages only ever hand
/// around indices into a slice of these.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Where the segment came from (feature id or feature index).
    pub source_id: String,
    /// Clustering key. `None` or blank means the segment cannot be clustered.
    pub name: Option<String>,
    /// OSM-style `highway` tag, e.g. `motorway`, `residential`.
    pub category: Option<String>,
    pub coords: Vec<LonLat>,
}

impl Segment {
    pub fn new(source_id: impl Into<String>, name: Option<&str>, coords: Vec<LonLat>) -> Self {
        Self {
            source_id: source_id.into(),
            name: name.map(str::to_string),
            category: None,
            coords,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Trimmed name, or `None` when the name is missing or blank.
    pub fn street_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// A polyline needs at least two vertices to describe a piece of road.
    pub fn is_well_formed(&self) -> bool {
        self.coords.len() >= 2
    }

    pub fn first(&self) -> Option<LonLat> {
        self.coords.first().copied()
    }

    pub fn last(&self) -> Option<LonLat> {
        self.coords.last().copied()
    }

    /// Both ends, start first. Empty segments have none.
    pub fn endpoints(&self) -> Option<(LonLat, LonLat)> {
        Some((self.first()?, self.last()?))
    }

    /// Arithmetic mean of the vertices.
    pub fn centroid(&self) -> Option<LonLat> {
        if self.coords.is_empty() {
            return None;
        }
        let count = self.coords.len() as f64;
        let (sum_x, sum_y) = self
            .coords
            .iter()
            .fold((0.0, 0.0), |acc, c| (acc.0 + c.0, acc.1 + c.1));
        Some((sum_x / count, sum_y / count))
    }

    /// (min_lon, min_lat, max_lon, max_lat)
    pub fn bbox(&self) -> Option<BBox> {
        BBox::of(self.coords.iter().copied())
    }

    pub fn line_string(&self) -> LineString<f64> {
        self.coords
            .iter()
            .map(|&(x, y)| Coord { x, y })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BBox {
    pub fn of(coords: impl IntoIterator<Item = LonLat>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bbox = BBox {
            min_lon: x0,
            min_lat: y0,
            max_lon: x0,
            max_lat: y0,
        };
        for (x, y) in iter {
            bbox.min_lon = bbox.min_lon.min(x);
            bbox.min_lat = bbox.min_lat.min(y);
            bbox.max_lon = bbox.max_lon.max(x);
            bbox.max_lat = bbox.max_lat.max(y);
        }
        Some(bbox)
    }

    pub fn union(self, other: BBox) -> BBox {
        BBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }
}
