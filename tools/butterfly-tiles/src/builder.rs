//! Turns decoded tiles into vertices and edges.
//!
//! Only core nodes become vertices: way endpoints, nodes shared between ways
//! or referenced twice, and both endpoints of every segment that crosses the
//! tile boundary. The nodes between two consecutive core nodes of a way
//! become the shape of the edge joining them.
//!
//! A tile only builds edges that start inside it. Edges continuing from a
//! boundary node into a neighbouring tile are built when that tile is loaded;
//! the segment crossing the boundary itself is built by whichever of the two
//! tiles is loaded first. Vertices are shared through the [`GlobalIdMap`], so
//! both tiles of a boundary segment resolve its nodes to the same vertices.

use crate::classify::{EdgeAttributes, TagClassifier};
use crate::decode::{DecodedNode, DecodedTile, DecodedWay};
use crate::error::{LoadError, Result};
use crate::geo::{distance_estimate_m, Coordinate};
use crate::global_ids::GlobalIdMap;
use crate::ids::{GlobalId, VertexId};
use crate::store::{EdgeData, GraphStore};
use crate::vehicles::VehicleCapability;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderOptions {
    /// Caps the distance of a single edge, in meters.
    pub max_edge_distance: Option<f32>,
}

/// Per-tile counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileStats {
    pub vertices_added: u32,
    pub edges_added: u32,
    pub ways_rejected: u32,
    pub ways_skipped: u32,
}

impl TileStats {
    pub fn updated(&self) -> bool {
        self.vertices_added > 0 || self.edges_added > 0
    }
}

pub struct TileGraphBuilder<'a, S: GraphStore + ?Sized, C: VehicleCapability + ?Sized> {
    store: &'a mut S,
    global_ids: &'a mut GlobalIdMap,
    classifier: TagClassifier<'a, C>,
    options: BuilderOptions,
    /// Boundary segments already built during this load, as (way, from, to).
    boundary_segments: FxHashSet<(i64, GlobalId, GlobalId)>,
}

impl<'a, S: GraphStore + ?Sized, C: VehicleCapability + ?Sized> TileGraphBuilder<'a, S, C> {
    pub fn new(
        store: &'a mut S,
        global_ids: &'a mut GlobalIdMap,
        capability: &'a C,
        options: BuilderOptions,
    ) -> Self {
        Self {
            store,
            global_ids,
            classifier: TagClassifier::new(capability),
            options,
            boundary_segments: FxHashSet::default(),
        }
    }

    /// Adds one tile to the graph, returning whether anything changed.
    pub fn add_tile(&mut self, tile: &DecodedTile) -> Result<bool> {
        self.add_tile_with_stats(tile).map(|stats| stats.updated())
    }

    /// Like [`add_tile`](Self::add_tile) but reports what was added.
    ///
    /// A way referencing a node the tile does not contain fails the tile
    /// before anything is written to the store.
    pub fn add_tile_with_stats(&mut self, tile: &DecodedTile) -> Result<TileStats> {
        for way in &tile.ways {
            if let Some(&node) = way.nodes.iter().find(|n| !tile.nodes.contains_key(n)) {
                return Err(LoadError::MissingNode {
                    tile: tile.tile,
                    way_id: way.id,
                    node,
                });
            }
        }

        let mut ways: Vec<&DecodedWay> = tile.ways.iter().collect();
        ways.sort_by_key(|w| w.id);

        let core = core_nodes(tile, &ways);
        let mut stats = TileStats::default();
        for way in ways {
            if way.nodes.len() < 2 {
                warn!(
                    tile = %tile.tile,
                    way_id = way.id,
                    nodes = way.nodes.len(),
                    "skipping way with fewer than two nodes"
                );
                stats.ways_skipped += 1;
                continue;
            }
            let Some(attributes) = self.classifier.classify(&mut *self.store, &way.tags)? else {
                stats.ways_rejected += 1;
                continue;
            };
            self.add_way(tile, way, &core, attributes, &mut stats)?;
        }

        debug!(
            tile = %tile.tile,
            vertices = stats.vertices_added,
            edges = stats.edges_added,
            rejected = stats.ways_rejected,
            "added tile"
        );
        Ok(stats)
    }

    fn add_way(
        &mut self,
        tile: &DecodedTile,
        way: &DecodedWay,
        core: &FxHashSet<GlobalId>,
        attributes: EdgeAttributes,
        stats: &mut TileStats,
    ) -> Result<()> {
        let mut cursor: Option<VertexId> = None;
        let mut shape: Vec<Coordinate> = Vec::new();

        for pair in way.nodes.windows(2) {
            let (id1, id2) = (pair[0], pair[1]);
            if id1 == id2 {
                continue;
            }
            let node1 = &tile.nodes[&id1];
            let node2 = &tile.nodes[&id2];
            if !node1.in_tile && !node2.in_tile {
                // Wholly inside a neighbouring tile
                continue;
            }
            let crosses = node1.in_tile != node2.in_tile;

            if core.contains(&id1) {
                let vertex = self.ensure_vertex(node1, stats);
                if cursor != Some(vertex) {
                    if let Some(from) = cursor.take() {
                        self.add_edge(from, vertex, &shape, attributes, stats)?;
                        shape.clear();
                    }
                    cursor = node1.in_tile.then_some(vertex);
                }
            }

            if core.contains(&id2) {
                let vertex = self.ensure_vertex(node2, stats);
                if crosses {
                    let from = self.global_ids.try_get(id1).ok_or_else(|| {
                        LoadError::Inconsistent(format!(
                            "boundary node {id1} of way {} has no vertex",
                            way.id
                        ))
                    })?;
                    if self.boundary_segments.insert((way.id, id1, id2)) {
                        self.add_edge(from, vertex, &[], attributes, stats)?;
                    }
                    shape.clear();
                } else if let Some(from) = cursor {
                    self.add_edge(from, vertex, &shape, attributes, stats)?;
                    shape.clear();
                }
                cursor = node2.in_tile.then_some(vertex);
            } else if cursor.is_some() {
                shape.push(node2.coordinate());
            }
        }
        Ok(())
    }

    fn ensure_vertex(&mut self, node: &DecodedNode, stats: &mut TileStats) -> VertexId {
        if let Some(vertex) = self.global_ids.try_get(node.id) {
            return vertex;
        }
        let vertex = self.store.add_vertex(node.coordinate());
        self.global_ids.set(node.id, vertex);
        stats.vertices_added += 1;
        vertex
    }

    fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        shape: &[Coordinate],
        attributes: EdgeAttributes,
        stats: &mut TileStats,
    ) -> Result<()> {
        let distance = self.edge_distance(from, to, shape)?;
        self.store.add_edge(
            EdgeData {
                from,
                to,
                distance,
                profile: attributes.profile,
                meta: attributes.meta,
            },
            shape.to_vec(),
        );
        stats.edges_added += 1;
        Ok(())
    }

    /// Length along the shape from `from` to `to`.
    fn edge_distance(&self, from: VertexId, to: VertexId, shape: &[Coordinate]) -> Result<f32> {
        let start = self.vertex_coordinate(from)?;
        let end = self.vertex_coordinate(to)?;

        let mut distance = 0.0f32;
        let mut previous = start;
        for &point in shape {
            distance += distance_estimate_m(previous, point) as f32;
            previous = point;
        }
        distance += distance_estimate_m(previous, end) as f32;

        Ok(match self.options.max_edge_distance {
            Some(max) => distance.min(max),
            None => distance,
        })
    }

    fn vertex_coordinate(&self, vertex: VertexId) -> Result<Coordinate> {
        self.store
            .vertex(vertex)
            .ok_or_else(|| LoadError::Inconsistent(format!("vertex {vertex} is not in the store")))
    }
}

/// Nodes that must become vertices in this tile.
///
/// Way endpoints, nodes referenced more than once across the tile's ways,
/// and both endpoints of every segment crossing the tile boundary.
pub fn core_nodes(tile: &DecodedTile, ways: &[&DecodedWay]) -> FxHashSet<GlobalId> {
    let mut core = FxHashSet::default();
    let mut seen = FxHashSet::default();

    for way in ways.iter().filter(|w| w.nodes.len() >= 2) {
        let last = way.nodes.len() - 1;
        for (i, &node) in way.nodes.iter().enumerate() {
            let repeated = !seen.insert(node);
            if i == 0 || i == last || repeated {
                core.insert(node);
            }
        }

        for pair in way.nodes.windows(2) {
            let in1 = tile.nodes.get(&pair[0]).is_some_and(|n| n.in_tile);
            let in2 = tile.nodes.get(&pair[1]).is_some_and(|n| n.in_tile);
            if in1 != in2 {
                core.insert(pair[0]);
                core.insert(pair[1]);
            }
        }
    }
    core
}
