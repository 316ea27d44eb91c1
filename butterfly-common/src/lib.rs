//! Common utilities for the butterfly-osm toolkit

pub mod error;

pub use error::{suggest_vehicle, Error, Result};
