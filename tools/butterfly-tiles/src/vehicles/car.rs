//! Car tag semantics

use super::{is_denied, whitelist_present, Vehicle, Whitelist, COMMON_META_KEYS};
use crate::tags::TagSet;

pub struct Car;

const PROFILE_KEYS: &[&str] = &[
    "highway",
    "route",
    "access",
    "vehicle",
    "motor_vehicle",
    "motorcar",
    "oneway",
    "junction",
    "maxspeed",
    "toll",
];

/// Default car access per highway class, `None` for classes a car never considers.
fn highway_access(highway: &str) -> Option<bool> {
    match highway {
        "motorway" | "motorway_link" | "trunk" | "trunk_link" => Some(true),
        "primary" | "primary_link" | "secondary" | "secondary_link" => Some(true),
        "tertiary" | "tertiary_link" | "unclassified" | "residential" => Some(true),
        "service" | "living_street" | "road" => Some(true),

        // Usually not for cars
        "track" => Some(false),

        // Pedestrian/cyclist infrastructure
        "footway" | "path" | "cycleway" | "pedestrian" => Some(false),

        "construction" => Some(false),

        _ => None,
    }
}

impl Vehicle for Car {
    fn name(&self) -> &'static str {
        "car"
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
        let access_default = match tags.get("highway") {
            Some(highway) => highway_access(highway).unwrap_or(false),
            None => tags.get("route") == Some("ferry"),
        };
        if !access_default {
            return false;
        }

        !(is_denied(tags.get("motor_vehicle"))
            || is_denied(tags.get("motorcar"))
            || is_denied(tags.get("vehicle"))
            || is_denied(tags.get("access")))
    }
}
