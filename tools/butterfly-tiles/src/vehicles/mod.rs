//! Built-in vehicles and the combined capability used during classification
//!
//! Each vehicle knows which tags influence its routing (profile keys), which
//! tags are worth keeping for display (meta keys), and whether a way is
//! traversable at all.

pub mod bike;
pub mod car;
pub mod foot;

pub use bike::Bike;
pub use car::Car;
pub use foot::Foot;

use crate::error::{LoadError, Result};
use crate::tags::TagSet;
use butterfly_common::suggest_vehicle;
use std::collections::BTreeSet;

/// Meta keys every vehicle keeps.
pub const COMMON_META_KEYS: &[&str] = &["name", "ref", "way_id"];

/// Set of tag keys selected as routing-relevant for one way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    keys: BTreeSet<String>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Travel modes with a built-in vehicle definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Car,
    Bike,
    Foot,
}

impl Mode {
    pub fn all() -> [Mode; 3] {
        [Mode::Car, Mode::Bike, Mode::Foot]
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Car => "car",
            Mode::Bike => "bike",
            Mode::Foot => "foot",
        }
    }

    pub fn from_name(name: &str) -> Option<Mode> {
        Mode::all()
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name))
    }

    pub fn vehicle(self) -> Box<dyn Vehicle> {
        match self {
            Mode::Car => Box::new(Car),
            Mode::Bike => Box::new(Bike),
            Mode::Foot => Box::new(Foot),
        }
    }
}

/// Tag semantics of a single vehicle.
pub trait Vehicle: Send + Sync {
    fn name(&self) -> &'static str;

    /// Keys that can change how this vehicle routes over a way.
    fn profile_keys(&self) -> &'static [&'static str];

    /// Keys kept as descriptive metadata.
    fn meta_keys(&self) -> &'static [&'static str];

    /// Adds the profile keys present on `tags` to the whitelist.
    ///
    /// Returns false when the vehicle does not recognize the way at all.
    fn add_to_whitelist(&self, tags: &TagSet, whitelist: &mut Whitelist) -> bool;

    /// Whether the vehicle may use a way with these profile tags.
    fn can_traverse(&self, tags: &TagSet) -> bool;
}

/// Capability consulted by the tag classifier.
pub trait VehicleCapability {
    /// Routing-relevant keys for a way, or `None` when no vehicle recognizes it.
    fn whitelist(&self, tags: &TagSet) -> Option<Whitelist>;

    /// Whether any vehicle lists `key` as a profile key.
    fn is_profile_relevant(&self, key: &str) -> bool;

    /// Whether any vehicle lists `key` as a meta key.
    fn is_meta_relevant(&self, key: &str) -> bool;

    /// Whether at least one vehicle may traverse a way with these profile tags.
    fn can_traverse(&self, profile: &TagSet) -> bool;
}

/// Vehicles configured for a load.
pub struct VehicleSet {
    vehicles: Vec<Box<dyn Vehicle>>,
}

impl VehicleSet {
    pub fn new(vehicles: Vec<Box<dyn Vehicle>>) -> Self {
        Self { vehicles }
    }

    /// Every built-in vehicle.
    pub fn all() -> Self {
        Self::new(Mode::all().into_iter().map(Mode::vehicle).collect())
    }

    /// Resolves vehicle names, suggesting a correction for unknown ones.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(LoadError::InvalidInput(
                "at least one vehicle is required".to_string(),
            ));
        }

        let mut modes: Vec<Mode> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let mode = Mode::from_name(name).ok_or_else(|| {
                let message = match suggest_vehicle(name) {
                    Some(suggestion) => {
                        format!("Unknown vehicle '{name}'. Did you mean '{suggestion}'?")
                    }
                    None => format!("Unknown vehicle '{name}'. Known vehicles: car, bike, foot"),
                };
                LoadError::InvalidInput(message)
            })?;
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }

        Ok(Self::new(modes.into_iter().map(Mode::vehicle).collect()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.vehicles.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

impl VehicleCapability for VehicleSet {
    fn whitelist(&self, tags: &TagSet) -> Option<Whitelist> {
        let mut whitelist = Whitelist::new();
        let mut recognized = false;
        for vehicle in &self.vehicles {
            recognized |= vehicle.add_to_whitelist(tags, &mut whitelist);
        }
        recognized.then_some(whitelist)
    }

    fn is_profile_relevant(&self, key: &str) -> bool {
        self.vehicles
            .iter()
            .any(|v| v.profile_keys().contains(&key))
    }

    fn is_meta_relevant(&self, key: &str) -> bool {
        self.vehicles.iter().any(|v| v.meta_keys().contains(&key))
    }

    fn can_traverse(&self, profile: &TagSet) -> bool {
        self.vehicles.iter().any(|v| v.can_traverse(profile))
    }
}

/// Explicit denial values shared by the access keys.
pub(crate) fn is_denied(value: Option<&str>) -> bool {
    matches!(value, Some("no") | Some("private"))
}

/// Adds every key of `keys` present on `tags`.
pub(crate) fn whitelist_present(tags: &TagSet, keys: &[&str], whitelist: &mut Whitelist) {
    for key in keys {
        if tags.contains_key(key) {
            whitelist.add(key);
        }
    }
}
