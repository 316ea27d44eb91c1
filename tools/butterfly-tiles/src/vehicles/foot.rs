//! Pedestrian tag semantics

use super::{is_denied, whitelist_present, Vehicle, Whitelist, COMMON_META_KEYS};
use crate::tags::TagSet;

pub struct Foot;

const PROFILE_KEYS: &[&str] = &["highway", "route", "access", "foot", "sidewalk"];

fn highway_access(highway: &str) -> Option<bool> {
    match highway {
        // Dedicated pedestrian infrastructure
        "footway" | "pedestrian" | "steps" | "path" | "bridleway" => Some(true),

        // Roads with sidewalks (assume accessible)
        "residential" | "living_street" | "unclassified" | "road" => Some(true),
        "tertiary" | "tertiary_link" | "secondary" | "secondary_link" => Some(true),
        "primary" | "primary_link" | "service" | "track" | "cycleway" => Some(true),

        // Generally not for pedestrians
        "motorway" | "motorway_link" | "trunk" | "trunk_link" => Some(false),

        "construction" => Some(false),

        _ => None,
    }
}

impl Vehicle for Foot {
    fn name(&self) -> &'static str {
        "foot"
    }

    fn profile_keys(&self) -> &'static [&'static str] {
        PROFILE_KEYS
    }

    fn meta_keys(&self) -> &'static [&'static str] {
        COMMON_META_KEYS
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
        let foot = tags.get("foot");
        if is_denied(foot) {
            return false;
        }
        if matches!(foot, Some("yes") | Some("designated") | Some("permissive")) {
            return true;
        }

        let access_default = match tags.get("highway") {
            Some(highway) => highway_access(highway).unwrap_or(false),
            None => tags.get("route") == Some("ferry"),
        };
        access_default && !is_denied(tags.get("access"))
    }
}
