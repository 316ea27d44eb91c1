//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use butterfly_tiles::{DecodedNode, DecodedTile, DecodedWay, GlobalId, TagSet, Tile};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Two horizontally adjacent zoom 14 tiles around Antwerp.
pub const WEST: Tile = Tile {
    zoom: 14,
    x: 8392,
    y: 5469,
};
pub const EAST: Tile = Tile {
    zoom: 14,
    x: 8393,
    y: 5469,
};

/// A node placed at fractions of a tile's extent, from its north-west corner.
#[derive(Debug, Clone, Copy)]
pub struct Place {
    pub id: i64,
    pub tile: Tile,
    pub fx: f64,
    pub fy: f64,
}

pub fn place(id: i64, tile: Tile, fx: f64, fy: f64) -> Place {
    Place { id, tile, fx, fy }
}

impl Place {
    pub fn lat_lon(&self) -> (f64, f64) {
        let b = self.tile.bounds();
        let lon = b.min_lon + (b.max_lon - b.min_lon) * self.fx;
        let lat = b.max_lat - (b.max_lat - b.min_lat) * self.fy;
        (lat, lon)
    }
}

pub fn way(id: i64, nodes: &[i64], highway: &str) -> DecodedWay {
    DecodedWay {
        id,
        nodes: nodes.iter().map(|&n| GlobalId(n)).collect(),
        tags: [("highway", highway)].into_iter().collect::<TagSet>(),
    }
}

/// Decoded view of `tile` over the given nodes and ways.
pub fn decoded(tile: Tile, places: &[Place], ways: Vec<DecodedWay>) -> DecodedTile {
    let nodes: HashMap<GlobalId, DecodedNode> = places
        .iter()
        .map(|p| {
            let (lat, lon) = p.lat_lon();
            let node = DecodedNode {
                id: GlobalId(p.id),
                lat,
                lon,
                in_tile: tile.contains(lon, lat),
            };
            (node.id, node)
        })
        .collect();
    DecodedTile { tile, nodes, ways }
}

/// JSON-LD tile document over the given nodes and `(way id, node ids, highway)` ways.
pub fn document(places: &[Place], ways: &[(i64, &[i64], &str)]) -> Vec<u8> {
    let mut graph: Vec<Value> = places
        .iter()
        .map(|p| {
            let (lat, lon) = p.lat_lon();
            json!({
                "@id": format!("http://www.openstreetmap.org/node/{}", p.id),
                "@type": "osm:Node",
                "geo:lat": lat,
                "geo:long": lon
            })
        })
        .collect();
    for (id, nodes, highway) in ways {
        let refs: Vec<String> = nodes
            .iter()
            .map(|n| format!("http://www.openstreetmap.org/node/{n}"))
            .collect();
        graph.push(json!({
            "@id": format!("http://www.openstreetmap.org/way/{id}"),
            "@type": "osm:Way",
            "osm:highway": format!("https://w3id.org/openstreetmap/terms#{highway}"),
            "osm:hasNodes": refs
        }));
    }
    let document = json!({
        "@context": { "osm": "https://w3id.org/openstreetmap/terms#" },
        "@graph": graph
    });
    serde_json::to_vec(&document).unwrap()
}
