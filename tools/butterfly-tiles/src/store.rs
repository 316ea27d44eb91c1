//! Graph store interface and the in-memory router database.
//!
//! The builder only talks to [`GraphStore`]; [`RouterDb`] is the concrete
//! store the CLI persists between runs.

use crate::error::Result;
use crate::geo::Coordinate;
use crate::ids::{GlobalId, VertexId};
use crate::tags::TagSet;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Upper bound on distinct edge profiles.
pub const MAX_PROFILE_COUNT: u32 = 1 << 14;

/// Side length of the grid vertices are snapped to when sorting.
const HILBERT_SIDE: u32 = 1 << 16;

/// Fixed-size part of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub from: VertexId,
    pub to: VertexId,
    /// Length in meters along the shape.
    pub distance: f32,
    pub profile: u32,
    pub meta: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub data: EdgeData,
    /// Intermediate points strictly between the endpoints.
    pub shape: Vec<Coordinate>,
}

/// Mutable graph storage targeted by the tile builder.
pub trait GraphStore {
    fn add_vertex(&mut self, coordinate: Coordinate) -> VertexId;
    fn vertex_count(&self) -> u32;
    fn vertex(&self, vertex: VertexId) -> Option<Coordinate>;
    fn add_edge(&mut self, edge: EdgeData, shape: Vec<Coordinate>);

    /// Whether a per-vertex global id collection exists.
    fn has_global_ids(&self) -> bool;
    /// Global id attached to a vertex, [`GlobalId::EMPTY`] when none.
    fn vertex_global_id(&self, vertex: VertexId) -> GlobalId;
    /// Attaches a global id, creating the collection on first use.
    fn set_vertex_global_id(&mut self, vertex: VertexId, id: GlobalId);

    /// Id of an equal profile already in the dictionary.
    fn profile_id(&self, tags: &TagSet) -> Option<u32>;
    /// Returns the id of an equal profile, adding it when unseen.
    fn intern_profile(&mut self, tags: &TagSet) -> u32;
    fn intern_meta(&mut self, tags: &TagSet) -> u32;
    fn profile_count(&self) -> u32;
    fn max_profile_count(&self) -> u32;

    /// Renumbers vertices for spatial locality.
    fn sort(&mut self);
    /// Removes redundant edges.
    fn optimize(&mut self);
    /// Releases spare capacity.
    fn compress(&mut self);
}

/// Append-only dictionary assigning dense ids to tag sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TagDictionary {
    entries: Vec<TagSet>,
    #[serde(skip)]
    index: HashMap<TagSet, u32>,
}

impl TagDictionary {
    fn intern(&mut self, tags: &TagSet) -> u32 {
        if let Some(&id) = self.index.get(tags) {
            return id;
        }
        let id = self.entries.len() as u32;
        self.entries.push(tags.clone());
        self.index.insert(tags.clone(), id);
        id
    }

    fn get(&self, id: u32) -> Option<&TagSet> {
        self.entries.get(id as usize)
    }

    fn id_of(&self, tags: &TagSet) -> Option<u32> {
        self.index.get(tags).copied()
    }

    fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, tags)| (tags.clone(), id as u32))
            .collect();
    }
}

/// In-memory road network with bincode persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterDb {
    vertices: Vec<Coordinate>,
    edges: Vec<Edge>,
    global_ids: Option<Vec<GlobalId>>,
    profiles: TagDictionary,
    meta: TagDictionary,
    max_profile_count: u32,
}

impl Default for RouterDb {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterDb {
    pub fn new() -> Self {
        Self::with_max_profile_count(MAX_PROFILE_COUNT)
    }

    pub fn with_max_profile_count(max_profile_count: u32) -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            global_ids: None,
            profiles: TagDictionary::default(),
            meta: TagDictionary::default(),
            max_profile_count,
        }
    }

    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn profile(&self, id: u32) -> Option<&TagSet> {
        self.profiles.get(id)
    }

    pub fn meta(&self, id: u32) -> Option<&TagSet> {
        self.meta.get(id)
    }

    pub fn meta_count(&self) -> u32 {
        self.meta.len()
    }

    /// Writes the database to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        info!(
            path = %path.display(),
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            "saved router db"
        );
        Ok(())
    }

    /// Reads a database previously written by [`RouterDb::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut db: RouterDb = bincode::deserialize_from(reader)?;
        db.profiles.rebuild_index();
        db.meta.rebuild_index();
        debug!(
            path = %path.display(),
            vertices = db.vertices.len(),
            edges = db.edges.len(),
            "loaded router db"
        );
        Ok(db)
    }
}

impl GraphStore for RouterDb {
    fn add_vertex(&mut self, coordinate: Coordinate) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(coordinate);
        if let Some(ids) = self.global_ids.as_mut() {
            ids.push(GlobalId::EMPTY);
        }
        id
    }

    fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    fn vertex(&self, vertex: VertexId) -> Option<Coordinate> {
        self.vertices.get(vertex.index()).copied()
    }

    fn add_edge(&mut self, edge: EdgeData, shape: Vec<Coordinate>) {
        self.edges.push(Edge { data: edge, shape });
    }

    fn has_global_ids(&self) -> bool {
        self.global_ids.is_some()
    }

    fn vertex_global_id(&self, vertex: VertexId) -> GlobalId {
        self.global_ids
            .as_ref()
            .and_then(|ids| ids.get(vertex.index()).copied())
            .unwrap_or(GlobalId::EMPTY)
    }

    fn set_vertex_global_id(&mut self, vertex: VertexId, id: GlobalId) {
        let count = self.vertices.len();
        let ids = self
            .global_ids
            .get_or_insert_with(|| vec![GlobalId::EMPTY; count]);
        if let Some(slot) = ids.get_mut(vertex.index()) {
            *slot = id;
        }
    }

    fn profile_id(&self, tags: &TagSet) -> Option<u32> {
        self.profiles.id_of(tags)
    }

    fn intern_profile(&mut self, tags: &TagSet) -> u32 {
        self.profiles.intern(tags)
    }

    fn intern_meta(&mut self, tags: &TagSet) -> u32 {
        self.meta.intern(tags)
    }

    fn profile_count(&self) -> u32 {
        self.profiles.len()
    }

    fn max_profile_count(&self) -> u32 {
        self.max_profile_count
    }

    fn sort(&mut self) {
        let mut order: Vec<u32> = (0..self.vertices.len() as u32).collect();
        let keys: Vec<u64> = self.vertices.iter().map(|c| hilbert_key(*c)).collect();
        order.sort_by_key(|&old| keys[old as usize]);

        let mut new_of_old = vec![0u32; order.len()];
        for (new, &old) in order.iter().enumerate() {
            new_of_old[old as usize] = new as u32;
        }

        self.vertices = order.iter().map(|&old| self.vertices[old as usize]).collect();
        if let Some(ids) = self.global_ids.as_mut() {
            *ids = order.iter().map(|&old| ids[old as usize]).collect();
        }
        for edge in &mut self.edges {
            edge.data.from = VertexId(new_of_old[edge.data.from.index()]);
            edge.data.to = VertexId(new_of_old[edge.data.to.index()]);
        }
        self.edges.sort_by_key(|e| (e.data.from, e.data.to));
    }

    fn optimize(&mut self) {
        let before = self.edges.len();
        let mut seen = HashSet::with_capacity(before);
        self.edges.retain(|edge| seen.insert(EdgeKey::of(edge)));
        let removed = before - self.edges.len();
        if removed > 0 {
            debug!(removed, "removed duplicate edges");
        }
    }

    fn compress(&mut self) {
        self.vertices.shrink_to_fit();
        self.edges.shrink_to_fit();
        for edge in &mut self.edges {
            edge.shape.shrink_to_fit();
        }
        if let Some(ids) = self.global_ids.as_mut() {
            ids.shrink_to_fit();
        }
    }
}

/// Bitwise identity of an edge, used to drop exact duplicates.
#[derive(PartialEq, Eq, Hash)]
struct EdgeKey {
    from: VertexId,
    to: VertexId,
    distance: u32,
    profile: u32,
    meta: u32,
    shape: Vec<(u32, u32)>,
}

impl EdgeKey {
    fn of(edge: &Edge) -> Self {
        Self {
            from: edge.data.from,
            to: edge.data.to,
            distance: edge.data.distance.to_bits(),
            profile: edge.data.profile,
            meta: edge.data.meta,
            shape: edge
                .shape
                .iter()
                .map(|c| (c.lat.to_bits(), c.lon.to_bits()))
                .collect(),
        }
    }
}

fn hilbert_key(coordinate: Coordinate) -> u64 {
    let scale = f64::from(HILBERT_SIDE - 1);
    let x = ((f64::from(coordinate.lon) + 180.0) / 360.0 * scale).clamp(0.0, scale) as u32;
    let y = ((f64::from(coordinate.lat) + 90.0) / 180.0 * scale).clamp(0.0, scale) as u32;
    hilbert_index(x, y)
}

/// Position of `(x, y)` along a Hilbert curve filling the grid.
fn hilbert_index(mut x: u32, mut y: u32) -> u64 {
    let n = HILBERT_SIDE;
    let mut d = 0u64;
    let mut s = n / 2;
    while s > 0 {
        let rx = u32::from((x & s) > 0);
        let ry = u32::from((y & s) > 0);
        d += u64::from(s) * u64::from(s) * u64::from((3 * rx) ^ ry);
        if ry == 0 {
            if rx == 1 {
                x = n - 1 - x;
                y = n - 1 - y;
            }
            std::mem::swap(&mut x, &mut y);
        }
        s /= 2;
    }
    d
}
