//! Bicycle tag semantics

use super::{is_denied, whitelist_present, Vehicle, Whitelist};
use crate::tags::TagSet;

pub struct Bike;

const PROFILE_KEYS: &[&str] = &[
    "highway",
    "route",
    "access",
    "vehicle",
    "bicycle",
    "oneway",
    "oneway:bicycle",
    "cycleway",
    "junction",
];

const META_KEYS: &[&str] = &["name", "ref", "way_id", "surface", "cycle_network"];

fn highway_access(highway: &str) -> Option<bool> {
    match highway {
        // Dedicated cycle infrastructure
        "cycleway" => Some(true),

        // Shared with pedestrians
        "path" | "footway" | "bridleway" => Some(true),

        // Roads generally accessible to bikes
        "residential" | "unclassified" | "tertiary" | "tertiary_link" => Some(true),
        "secondary" | "secondary_link" | "primary" | "primary_link" | "road" => Some(true),
        "service" | "living_street" | "pedestrian" | "track" => Some(true),

        // Trunk and motorways - generally no bikes
        "trunk" | "trunk_link" | "motorway" | "motorway_link" => Some(false),

        "steps" | "construction" => Some(false),

        _ => None,
    }
}

impl Vehicle for Bike {
    fn name(&self) -> &'static str {
        "bike"
    }

    fn profile_keys(&self) -> &'static [&'static str] {
        PROFILE_KEYS
    }

    fn meta_keys(&self) -> &'static [&'static str] {
        META_KEYS
    }

    fn add_to_whitelist(&self, tags: &TagSet, whitelist: &mut Whitelist) -> bool {
        let recognized = match tags.get("highway") {
            Some(highway) => highway_access(highway).is_some(),
            None => tags.get("route") == Some("ferry"),
        };
        if recognized {
            whitelist_present(tags, PROFILE_KEYS, whitelist);
        }
        recognized
    }

    fn can_traverse(&self, tags: &TagSet) -> bool {
        let bicycle = tags.get("bicycle");
        if matches!(bicycle, Some("no") | Some("dismount")) {
            return false;
        }
        // An explicit permission overrides the class default and general access
        if matches!(bicycle, Some("yes") | Some("designated") | Some("permissive")) {
            return true;
        }

        let access_default = match tags.get("highway") {
            Some(highway) => highway_access(highway).unwrap_or(false),
            None => tags.get("route") == Some("ferry"),
        };
        access_default && !is_denied(tags.get("vehicle")) && !is_denied(tags.get("access"))
    }
}
