//! Coordinates, bounding boxes and the distance estimate used for edge lengths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const RADIUS_OF_EARTH_M: f64 = 6_371_000.0;

/// A WGS84 position stored at single precision, as in the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f32,
    pub lon: f32,
}

impl Coordinate {
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat as f32,
            lon: lon as f32,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Equirectangular distance estimate in meters.
///
/// Accurate to well under a percent for the short spans between
/// consecutive way nodes, which is all edge lengths are built from.
pub fn distance_estimate_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = f64::from(a.lat).to_radians();
    let lon1 = f64::from(a.lon).to_radians();
    let lat2 = f64::from(b.lat).to_radians();
    let lon2 = f64::from(b.lon).to_radians();

    let x = (lon2 - lon1) * ((lat1 + lat2) / 2.0).cos();
    let y = lat2 - lat1;

    (x * x + y * y).sqrt() * RADIUS_OF_EARTH_M
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Builds a box from two opposite corners in any order.
    pub fn from_corners(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Self {
        Self {
            min_lat: lat1.min(lat2),
            min_lon: lon1.min(lon2),
            max_lat: lat1.max(lat2),
            max_lon: lon1.max(lon2),
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

impl FromStr for BoundingBox {
    type Err = String;

    /// Parses `min_lat,min_lon,max_lat,max_lon`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!(
                "expected 'min_lat,min_lon,max_lat,max_lon', got '{s}'"
            ));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| format!("invalid coordinate '{part}' in bounding box"))?;
        }

        let [lat1, lon1, lat2, lon2] = values;
        for lat in [lat1, lat2] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(format!("latitude {lat} out of range"));
            }
        }
        for lon in [lon1, lon2] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(format!("longitude {lon} out of range"));
            }
        }

        Ok(Self::from_corners(lat1, lon1, lat2, lon2))
    }
}
