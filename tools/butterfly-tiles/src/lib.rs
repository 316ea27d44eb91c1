//! Routable tile loader
//!
//! Fetches OSM routable tiles covering a bounding box and stitches them into
//! one routing graph: shared nodes become a single vertex, intermediate nodes
//! fold into edge shapes, and way tags are split into interned routing
//! profiles and metadata.
//!
//! ```no_run
//! use butterfly_tiles::{
//!     load_from_tiles, BoundingBox, HttpTileSource, JsonLdDecoder, LoadOptions, RouterDb,
//!     VehicleSet, DEFAULT_BASE_URL,
//! };
//!
//! # async fn run() -> butterfly_tiles::Result<()> {
//! let mut db = RouterDb::new();
//! let bbox: BoundingBox = "51.20,4.38,51.23,4.43"
//!     .parse()
//!     .map_err(butterfly_tiles::LoadError::InvalidInput)?;
//! let source = HttpTileSource::new(DEFAULT_BASE_URL)?;
//! let vehicles = VehicleSet::from_names(&["car", "bike"])?;
//! let report = load_from_tiles(
//!     &mut db,
//!     &bbox,
//!     &source,
//!     &JsonLdDecoder::default(),
//!     &vehicles,
//!     &LoadOptions::default(),
//! )
//! .await?;
//! println!("{} tiles loaded", report.tiles_loaded);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod geo;
pub mod global_ids;
pub mod ids;
pub mod loader;
pub mod source;
pub mod store;
pub mod tags;
pub mod tile;
pub mod vehicles;

pub use builder::{BuilderOptions, TileGraphBuilder, TileStats};
pub use classify::{EdgeAttributes, TagClassifier};
pub use config::{FileConfig, TilesConfig};
pub use decode::{DecodedNode, DecodedTile, DecodedWay, JsonLdDecoder, TagMapping, TileDecoder};
pub use error::{LoadError, Result};
pub use geo::{distance_estimate_m, BoundingBox, Coordinate};
pub use global_ids::{add_or_update_global_ids, extract_global_ids, GlobalIdMap};
pub use ids::{GlobalId, VertexId};
pub use loader::{load_from_tiles, LoadOptions, LoadReport};
pub use source::{
    CachedTileSource, HttpTileSource, MemoryTileSource, RetryPolicy, TileSource, DEFAULT_BASE_URL,
};
pub use store::{Edge, EdgeData, GraphStore, RouterDb, MAX_PROFILE_COUNT};
pub use tags::TagSet;
pub use tile::{Tile, TileRange, DEFAULT_ZOOM, MAX_ZOOM};
pub use vehicles::{Mode, Vehicle, VehicleCapability, VehicleSet, Whitelist};
