//! Loader configuration
//!
//! Values come from an optional TOML file, overridden by command line flags,
//! with built-in defaults for anything left unset.

use crate::builder::BuilderOptions;
use crate::error::{LoadError, Result};
use crate::loader::LoadOptions;
use crate::source::DEFAULT_BASE_URL;
use crate::tile::{DEFAULT_ZOOM, MAX_ZOOM};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Partial configuration, as read from a file or assembled from flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub zoom: Option<u8>,
    pub keep_global_ids: Option<bool>,
    pub concurrency: Option<usize>,
    pub cache_dir: Option<PathBuf>,
    pub vehicles: Option<Vec<String>>,
    pub max_edge_distance: Option<f32>,
    /// JSON file with a property to tag mapping.
    pub tag_mapping: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LoadError::Config(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| LoadError::Config(format!("{}: {e}", path.display())))
    }

    /// Fields set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: FileConfig) -> FileConfig {
        FileConfig {
            base_url: overrides.base_url.or(self.base_url),
            zoom: overrides.zoom.or(self.zoom),
            keep_global_ids: overrides.keep_global_ids.or(self.keep_global_ids),
            concurrency: overrides.concurrency.or(self.concurrency),
            cache_dir: overrides.cache_dir.or(self.cache_dir),
            vehicles: overrides.vehicles.or(self.vehicles),
            max_edge_distance: overrides.max_edge_distance.or(self.max_edge_distance),
            tag_mapping: overrides.tag_mapping.or(self.tag_mapping),
        }
    }

    /// Applies defaults and validates.
    pub fn resolve(self) -> Result<TilesConfig> {
        let zoom = self.zoom.unwrap_or(DEFAULT_ZOOM);
        if zoom > MAX_ZOOM {
            return Err(LoadError::Config(format!(
                "zoom {zoom} is above the maximum of {MAX_ZOOM}"
            )));
        }
        let concurrency = self.concurrency.unwrap_or(4);
        if concurrency == 0 {
            return Err(LoadError::Config("concurrency must be at least 1".to_string()));
        }
        if let Some(max) = self.max_edge_distance {
            if max.is_nan() || max <= 0.0 {
                return Err(LoadError::Config(format!(
                    "max_edge_distance must be positive, got {max}"
                )));
            }
        }

        Ok(TilesConfig {
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            zoom,
            keep_global_ids: self.keep_global_ids.unwrap_or(true),
            concurrency,
            cache_dir: self.cache_dir,
            vehicles: self
                .vehicles
                .unwrap_or_else(|| vec!["car".to_string(), "bike".to_string(), "foot".to_string()]),
            max_edge_distance: self.max_edge_distance,
            tag_mapping: self.tag_mapping,
        })
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesConfig {
    pub base_url: String,
    pub zoom: u8,
    pub keep_global_ids: bool,
    pub concurrency: usize,
    pub cache_dir: Option<PathBuf>,
    pub vehicles: Vec<String>,
    pub max_edge_distance: Option<f32>,
    pub tag_mapping: Option<PathBuf>,
}

impl TilesConfig {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            zoom: self.zoom,
            keep_global_ids: self.keep_global_ids,
            concurrency: self.concurrency,
            builder: BuilderOptions {
                max_edge_distance: self.max_edge_distance,
            },
        }
    }
}
