//! JSON-LD routable tile decoding
//!
//! A routable tile is a JSON-LD document whose `@graph` lists OSM nodes and
//! ways. Nodes carry `geo:lat`/`geo:long`; ways carry their node references
//! in `osm:hasNodes`, raw tags as `k=v` strings in `osm:hasTag`, and a set of
//! semantic properties (`osm:highway`, `osm:maxspeed`, ...) which a
//! [`TagMapping`] translates back to plain OSM tags.

use crate::error::{LoadError, Result};
use crate::geo::Coordinate;
use crate::ids::GlobalId;
use crate::tags::TagSet;
use crate::tile::Tile;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};

const NODE_PREFIX: &str = "http://www.openstreetmap.org/node/";
const WAY_PREFIX: &str = "http://www.openstreetmap.org/way/";

/// Semantic properties mapped by default, as `osm:<key>` → `<key>`.
const DEFAULT_MAPPED_KEYS: &[&str] = &[
    "highway",
    "access",
    "barrier",
    "bicycle",
    "construction",
    "crossing",
    "cycleway",
    "foot",
    "junction",
    "lanes",
    "maxspeed",
    "motorcar",
    "motor_vehicle",
    "name",
    "oneway",
    "ref",
    "route",
    "service",
    "surface",
    "toll",
    "tracktype",
    "vehicle",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNode {
    pub id: GlobalId,
    pub lat: f64,
    pub lon: f64,
    /// Whether the node lies inside the tile it was decoded from.
    pub in_tile: bool,
}

impl DecodedNode {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::from_degrees(self.lat, self.lon)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWay {
    pub id: i64,
    pub nodes: Vec<GlobalId>,
    pub tags: TagSet,
}

/// Nodes and ways of one tile, ways ordered by id.
#[derive(Debug, Clone)]
pub struct DecodedTile {
    pub tile: Tile,
    pub nodes: HashMap<GlobalId, DecodedNode>,
    pub ways: Vec<DecodedWay>,
}

/// Turns fetched tile bytes into nodes and ways.
pub trait TileDecoder {
    fn decode(&self, tile: Tile, bytes: &[u8]) -> Result<DecodedTile>;
}

/// Mapping of one semantic property to an OSM key.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyMapping {
    pub key: String,
    /// Explicit value translations, checked before the generic IRI rule.
    #[serde(default)]
    pub values: HashMap<String, String>,
}

/// Reverse mapping from JSON-LD properties to OSM tags.
///
/// Loaded from a JSON object keyed by property name:
///
/// ```json
/// { "osm:highway": { "key": "highway", "values": { "osm:Residential": "residential" } } }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct TagMapping {
    properties: HashMap<String, PropertyMapping>,
}

impl Default for TagMapping {
    fn default() -> Self {
        let properties = DEFAULT_MAPPED_KEYS
            .iter()
            .map(|key| {
                (
                    format!("osm:{key}"),
                    PropertyMapping {
                        key: (*key).to_string(),
                        values: HashMap::new(),
                    },
                )
            })
            .collect();
        Self { properties }
    }
}

impl TagMapping {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Translates one property, `None` when it is unmapped or not a scalar.
    pub fn map(&self, property: &str, value: &Value) -> Option<(String, String)> {
        let mapping = self.properties.get(property)?;
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(true) => "yes".to_string(),
            Value::Bool(false) => "no".to_string(),
            _ => return None,
        };
        let mapped = match mapping.values.get(&raw) {
            Some(explicit) => explicit.clone(),
            None => term_value(&raw),
        };
        Some((mapping.key.clone(), mapped))
    }
}

/// Reduces an ontology term to an OSM value.
///
/// `https://w3id.org/openstreetmap/terms#MotorwayLink` and `osm:MotorwayLink`
/// both become `motorway_link`. Plain literals are returned unchanged.
fn term_value(raw: &str) -> String {
    let local = if let Some(rest) = raw.strip_prefix("osm:") {
        rest
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.rsplit(['#', '/']).next().unwrap_or(raw)
    } else {
        return raw.to_string();
    };

    let mut value = String::with_capacity(local.len() + 4);
    for (i, c) in local.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                value.push('_');
            }
            value.extend(c.to_lowercase());
        } else {
            value.push(c);
        }
    }
    value
}

#[derive(Debug, Clone, Default)]
pub struct JsonLdDecoder {
    mapping: TagMapping,
}

impl JsonLdDecoder {
    pub fn new(mapping: TagMapping) -> Self {
        Self { mapping }
    }

    fn decode_node(
        &self,
        tile: Tile,
        object: &serde_json::Map<String, Value>,
        id: &str,
    ) -> Option<DecodedNode> {
        let id = GlobalId(parse_osm_id(id, NODE_PREFIX)?);
        let lat = number(object.get("geo:lat")?)?;
        let lon = number(object.get("geo:long")?)?;
        Some(DecodedNode {
            id,
            lat,
            lon,
            in_tile: tile.contains(lon, lat),
        })
    }

    fn decode_way(
        &self,
        tile: Tile,
        object: &serde_json::Map<String, Value>,
        id: &str,
    ) -> Option<DecodedWay> {
        let way_id = parse_osm_id(id, WAY_PREFIX)?;

        let mut tags = TagSet::new();
        for (property, value) in object {
            if property == "@id" || property == "@type" || value.is_array() {
                continue;
            }
            if let Some((key, value)) = self.mapping.map(property, value) {
                tags.insert(key, value);
            }
        }
        tags.insert("way_id", way_id.to_string());
        tags.insert("tile_x", tile.x.to_string());
        tags.insert("tile_y", tile.y.to_string());

        // Raw tags win over the semantic properties
        if let Some(Value::Array(raw_tags)) = object.get("osm:hasTag") {
            for raw in raw_tags.iter().filter_map(Value::as_str) {
                let parts: Vec<&str> = raw.split('=').collect();
                if let [key, value] = parts[..] {
                    tags.insert(key, value);
                }
            }
        }

        let Some(Value::Array(references)) = object.get("osm:hasNodes") else {
            return None;
        };
        let mut nodes = Vec::with_capacity(references.len());
        for reference in references {
            let node = reference
                .as_str()
                .and_then(|r| parse_osm_id(r, NODE_PREFIX));
            match node {
                Some(node) => nodes.push(GlobalId(node)),
                None => {
                    warn!(
                        tile = %tile,
                        way_id,
                        reference = %reference,
                        "skipping way with unparsable node reference"
                    );
                    return None;
                }
            }
        }

        Some(DecodedWay {
            id: way_id,
            nodes,
            tags,
        })
    }
}

impl TileDecoder for JsonLdDecoder {
    fn decode(&self, tile: Tile, bytes: &[u8]) -> Result<DecodedTile> {
        let document: Value = serde_json::from_slice(bytes).map_err(|e| LoadError::Decode {
            tile,
            reason: e.to_string(),
        })?;
        let Some(graph) = document.get("@graph").and_then(Value::as_array) else {
            return Err(LoadError::Decode {
                tile,
                reason: "document has no @graph array".to_string(),
            });
        };

        let mut nodes = HashMap::new();
        let mut ways = BTreeMap::new();
        for object in graph.iter().filter_map(Value::as_object) {
            let Some(id) = object.get("@id").and_then(Value::as_str) else {
                continue;
            };
            if id.starts_with(NODE_PREFIX) {
                if let Some(node) = self.decode_node(tile, object, id) {
                    nodes.insert(node.id, node);
                }
            } else if id.starts_with(WAY_PREFIX) {
                if let Some(way) = self.decode_way(tile, object, id) {
                    ways.insert(way.id, way);
                }
            }
        }

        debug!(tile = %tile, nodes = nodes.len(), ways = ways.len(), "decoded tile");
        Ok(DecodedTile {
            tile,
            nodes,
            ways: ways.into_values().collect(),
        })
    }
}

fn parse_osm_id(iri: &str, prefix: &str) -> Option<i64> {
    iri.strip_prefix(prefix)?.parse().ok()
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
