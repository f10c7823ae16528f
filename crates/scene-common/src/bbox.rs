//! Geographic bounding boxes for crop regions.

use serde::{Deserialize, Serialize};

/// A lon/lat bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Build from a map extent ordered `[west, east, south, north]`.
    pub fn from_extent(extent: [f64; 4]) -> Self {
        Self::new(extent[0], extent[2], extent[1], extent[3])
    }

    /// Extent ordered `[west, east, south, north]`.
    pub fn extent(&self) -> [f64; 4] {
        [self.min_lon, self.max_lon, self.min_lat, self.max_lat]
    }

    /// Parse "west,south,east,north".
    pub fn from_csv(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if !bbox.is_valid() {
            return Err(BboxParseError::Inverted(s.to_string()));
        }
        Ok(bbox)
    }

    /// Min below max on both axes and within lon/lat ranges.
    pub fn is_valid(&self) -> bool {
        self.min_lon < self.max_lon
            && self.min_lat < self.max_lat
            && self.min_lon >= -180.0
            && self.max_lon <= 180.0
            && self.min_lat >= -90.0
            && self.max_lat <= 90.0
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Points evenly spaced along the perimeter, `per_edge` per side
    /// (corners included once).
    pub fn perimeter_points(&self, per_edge: usize) -> Vec<(f64, f64)> {
        let n = per_edge.max(2);
        let mut points = Vec::with_capacity(4 * n);
        for i in 0..n {
            let t = i as f64 / (n - 1) as f64;
            let lon = self.min_lon + t * self.width();
            let lat = self.min_lat + t * self.height();
            points.push((lon, self.min_lat));
            points.push((lon, self.max_lat));
            if i > 0 && i < n - 1 {
                points.push((self.min_lon, lat));
                points.push((self.max_lon, lat));
            }
        }
        points
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounding box format: {0}. Expected 'west,south,east,north'")]
    InvalidFormat(String),

    #[error("Invalid number in bounding box: {0}")]
    InvalidNumber(String),

    #[error("Bounding box has min >= max or is out of range: {0}")]
    Inverted(String),
}
