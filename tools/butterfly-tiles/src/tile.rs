//! Web Mercator tile addressing.
//!
//! Tiles partition the world at a given zoom: every position maps to exactly
//! one tile via `floor`, so a node on a shared edge belongs to the tile on its
//! east or south side and never to both.

use crate::geo::BoundingBox;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Zoom used by the public routable tile service.
pub const DEFAULT_ZOOM: u8 = 14;

/// Highest zoom for which tile indices fit the addressing scheme.
pub const MAX_ZOOM: u8 = 22;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl Tile {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Tile containing the given position.
    ///
    /// Latitudes beyond the projection limit and longitudes outside
    /// [-180, 180] are clamped onto the edge tiles.
    pub fn world_to_tile(lon: f64, lat: f64, zoom: u8) -> Self {
        let n = f64::from(1u32 << zoom);
        let last = (1u32 << zoom) - 1;

        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let lon = lon.clamp(-180.0, 180.0);

        let x = ((lon + 180.0) / 360.0 * n).floor();
        let lat_rad = lat.to_radians();
        let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

        Self {
            zoom,
            x: (x.max(0.0) as u32).min(last),
            y: (y.max(0.0) as u32).min(last),
        }
    }

    /// True when the position falls inside this tile.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        Self::world_to_tile(lon, lat, self.zoom) == *self
    }

    /// Geographic extent of the tile.
    pub fn bounds(&self) -> BoundingBox {
        let (north, west) = corner(self.zoom, self.x, self.y);
        let (south, east) = corner(self.zoom, self.x + 1, self.y + 1);
        BoundingBox {
            min_lat: south,
            min_lon: west,
            max_lat: north,
            max_lon: east,
        }
    }

    /// URL of this tile under a tile service base URL.
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.zoom,
            self.x,
            self.y
        )
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// North-west corner of tile `(x, y)`, as `(lat, lon)`.
fn corner(zoom: u8, x: u32, y: u32) -> (f64, f64) {
    let n = f64::from(1u32 << zoom);
    let lon = f64::from(x) / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * f64::from(y) / n)).sinh().atan();
    (lat_rad.to_degrees(), lon)
}

/// Inclusive rectangle of tiles covering a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    pub fn new(bbox: &BoundingBox, zoom: u8) -> Self {
        let top_left = Tile::world_to_tile(bbox.min_lon, bbox.max_lat, zoom);
        let bottom_right = Tile::world_to_tile(bbox.max_lon, bbox.min_lat, zoom);
        Self {
            zoom,
            min_x: top_left.x,
            min_y: top_left.y,
            max_x: bottom_right.x,
            max_y: bottom_right.y,
        }
    }

    pub fn tile_count(&self) -> usize {
        let width = (self.max_x - self.min_x + 1) as usize;
        let height = (self.max_y - self.min_y + 1) as usize;
        width * height
    }

    /// Row-major iteration, north to south then west to east.
    pub fn iter(&self) -> impl Iterator<Item = Tile> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| Tile::new(self.zoom, x, y)))
    }
}
