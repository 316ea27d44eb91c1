//! Error types for tile loading

use crate::ids::GlobalId;
use crate::tile::Tile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to fetch tile: {0}")]
    Fetch(#[from] butterfly_common::Error),

    #[error("Failed to decode tile {tile}: {reason}")]
    Decode { tile: Tile, reason: String },

    #[error("Way {way_id} in tile {tile} references node {node} which the tile does not contain")]
    MissingNode {
        tile: Tile,
        way_id: i64,
        node: GlobalId,
    },

    #[error(
        "Maximum supported profiles exceeded ({count} > {max}), make sure only routing tags are included in the profiles"
    )]
    ProfileOverflow { count: u32, max: u32 },

    #[error("Inconsistent graph state: {0}")]
    Inconsistent(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl LoadError {
    /// Errors that must stop a whole load rather than skip a single tile.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoadError::ProfileOverflow { .. } | LoadError::Inconsistent(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
