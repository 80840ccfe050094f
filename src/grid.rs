// Quantization of (lon, lat) coordinates into grid cells.
//
// Cells are keyed by the integer multiple of the cell size rather than by a
// formatted float, so two coordinates within about half a cell of each other
// always land on the identical key.

use crate::error::ConfigError;
use crate::segment::LonLat;
use ahash::AHashSet;

/// Fixed metres-per-degree factor used to turn a metric cell size into degrees.
/// Applied to both axes, so cells are square in degrees, not in metres.
pub const METRES_PER_DEGREE: f64 = 111_000.0;

/// Smallest accepted cell side in degrees. Keeps `180 / cell` well inside the
/// `i64` range so no coordinate saturates its cell key.
pub const MIN_CELL_DEGREES: f64 = 180.0 / (1u64 << 52) as f64;

/// Side length of a grid cell, in degrees. Always positive, finite and at
/// least [`MIN_CELL_DEGREES`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize(f64);

impl CellSize {
    /// 200 m, the production setting.
    pub const DEFAULT: CellSize = CellSize(200.0 / METRES_PER_DEGREE);

    pub fn from_degrees(degrees: f64) -> Result<Self, ConfigError> {
        if degrees.is_finite() && degrees >= MIN_CELL_DEGREES {
            Ok(Self(degrees))
        } else {
            Err(ConfigError::InvalidCellSize(degrees))
        }
    }

    pub fn from_metres(metres: f64) -> Result<Self, ConfigError> {
        Self::from_degrees(metres / METRES_PER_DEGREE)
            .map_err(|_| ConfigError::InvalidCellSize(metres))
    }

    pub fn degrees(self) -> f64 {
        self.0
    }

    pub fn metres(self) -> f64 {
        self.0 * METRES_PER_DEGREE
    }

    /// Same grid at `factor` times the resolution.
    pub fn scaled(self, factor: f64) -> Result<Self, ConfigError> {
        Self::from_degrees(self.0 * factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub lat: i64,
    pub lon: i64,
}

impl CellKey {
    pub fn of(coord: LonLat, cell: CellSize) -> Self {
        let (lon, lat) = coord;
        Self {
            lat: (lat / cell.0).round() as i64,
            lon: (lon / cell.0).round() as i64,
        }
    }

    /// The 8 surrounding cells at the same cell size.
    pub fn neighbours(self) -> impl Iterator<Item = CellKey> {
        (-1..=1_i64).flat_map(move |dlat| {
            (-1..=1_i64).filter_map(move |dlon| {
                if dlat == 0 && dlon == 0 {
                    None
                } else {
                    Some(CellKey {
                        lat: self.lat.saturating_add(dlat),
                        lon: self.lon.saturating_add(dlon),
                    })
                }
            })
        })
    }

    /// Cell centre as (lon, lat) degrees.
    pub fn centre(self, cell: CellSize) -> LonLat {
        (self.lon as f64 * cell.0, self.lat as f64 * cell.0)
    }
}

/// Every cell a polyline touches, sampling each vertex, in first-seen order
/// and without duplicates.
pub fn cells_for_coords(coords: &[LonLat], cell: CellSize) -> Vec<CellKey> {
    let mut seen = AHashSet::with_capacity(coords.len());
    let mut cells = Vec::new();
    for &coord in coords {
        let key = CellKey::of(coord, cell);
        if seen.insert(key) {
            cells.push(key);
        }
    }
    cells
}
