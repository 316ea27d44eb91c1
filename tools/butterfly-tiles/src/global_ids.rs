//! Mapping from OSM node ids to graph vertices.
//!
//! The map lives for one load. It is seeded from the ids persisted on the
//! store and written back when the load finishes, so vertices created by a
//! previous run are reused when a neighbouring tile is loaded later.

use crate::ids::{GlobalId, VertexId};
use crate::store::GraphStore;
use rustc_hash::FxHashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct GlobalIdMap {
    vertices: FxHashMap<GlobalId, VertexId>,
}

impl GlobalIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: GlobalId, vertex: VertexId) {
        self.vertices.insert(id, vertex);
    }

    pub fn try_get(&self, id: GlobalId) -> Option<VertexId> {
        self.vertices.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GlobalId, VertexId)> + '_ {
        self.vertices.iter().map(|(&id, &vertex)| (id, vertex))
    }
}

/// Seeds a map from the global ids persisted on the store.
pub fn extract_global_ids<S: GraphStore + ?Sized>(store: &S) -> GlobalIdMap {
    let mut map = GlobalIdMap::new();
    if !store.has_global_ids() {
        return map;
    }
    for v in 0..store.vertex_count() {
        let vertex = VertexId(v);
        let id = store.vertex_global_id(vertex);
        if !id.is_empty() {
            map.set(id, vertex);
        }
    }
    debug!(known = map.len(), "extracted global ids from store");
    map
}

/// Replaces the store's global ids with the contents of `map`.
///
/// Every vertex is cleared first, so vertices absent from the map end up
/// with [`GlobalId::EMPTY`].
pub fn add_or_update_global_ids<S: GraphStore + ?Sized>(store: &mut S, map: &GlobalIdMap) {
    for v in 0..store.vertex_count() {
        store.set_vertex_global_id(VertexId(v), GlobalId::EMPTY);
    }
    for (id, vertex) in map.iter() {
        store.set_vertex_global_id(vertex, id);
    }
}
