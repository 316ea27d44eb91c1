//! Strongly typed identifiers for OSM nodes and graph vertices.
//!
//! `GlobalId` reserves its maximum value as a sentinel so the dense
//! per-vertex id array can store "no value" without an `Option` wrapper.

use serde::{Deserialize, Serialize};
use std::fmt;

/// OSM node identifier, stable across tiles and loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GlobalId(pub i64);

impl GlobalId {
    /// Marks a vertex that carries no OSM node id.
    pub const EMPTY: GlobalId = GlobalId(i64::MAX);

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GlobalId {
    fn from(value: i64) -> Self {
        GlobalId(value)
    }
}

/// Dense index of a vertex in the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
