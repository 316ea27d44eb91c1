//! Loads every tile covering a bounding box into a graph store.

use crate::builder::{BuilderOptions, TileGraphBuilder};
use crate::decode::{DecodedTile, TileDecoder};
use crate::error::{LoadError, Result};
use crate::geo::BoundingBox;
use crate::global_ids::{add_or_update_global_ids, extract_global_ids};
use crate::source::TileSource;
use crate::store::GraphStore;
use crate::tile::{Tile, TileRange, DEFAULT_ZOOM, MAX_ZOOM};
use crate::vehicles::VehicleCapability;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    pub zoom: u8,
    /// Persist node ids on the store so later loads can extend the graph.
    pub keep_global_ids: bool,
    /// Tiles fetched and decoded concurrently.
    pub concurrency: usize,
    pub builder: BuilderOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            keep_global_ids: true,
            concurrency: 4,
            builder: BuilderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub tiles_requested: usize,
    pub tiles_loaded: usize,
    pub tiles_unchanged: usize,
    pub tiles_missing: usize,
    pub tiles_failed: usize,
    pub vertices: u32,
    pub edges_added: u64,
}

enum Fetched {
    Missing,
    Failed(LoadError),
    Decoded(DecodedTile),
}

/// Fetches, decodes and adds all tiles covering `bbox`.
///
/// Tiles are fetched and decoded concurrently but applied to the store one at
/// a time in row-major order. Missing tiles are skipped, tiles that fail to
/// fetch, decode or build are logged and skipped; a profile overflow or an
/// inconsistent id map aborts the load. Afterwards node ids are written back
/// when `keep_global_ids` is set, and the store is sorted, optimized and
/// compressed.
pub async fn load_from_tiles<S, T, D, C>(
    store: &mut S,
    bbox: &BoundingBox,
    source: &T,
    decoder: &D,
    capability: &C,
    options: &LoadOptions,
) -> Result<LoadReport>
where
    S: GraphStore + ?Sized,
    T: TileSource,
    D: TileDecoder + Sync,
    C: VehicleCapability + ?Sized,
{
    if options.zoom > MAX_ZOOM {
        return Err(LoadError::InvalidInput(format!(
            "zoom {} is above the maximum of {MAX_ZOOM}",
            options.zoom
        )));
    }

    let start = Instant::now();
    let range = TileRange::new(bbox, options.zoom);
    let mut report = LoadReport {
        tiles_requested: range.tile_count(),
        ..LoadReport::default()
    };
    info!(tiles = range.tile_count(), zoom = options.zoom, "loading tiles");

    let mut global_ids = extract_global_ids(store);
    let mut builder =
        TileGraphBuilder::new(store, &mut global_ids, capability, options.builder.clone());

    let mut tiles = stream::iter(range.iter())
        .map(|tile| fetch_and_decode(source, decoder, tile))
        .buffered(options.concurrency.max(1));

    while let Some((tile, fetched)) = tiles.next().await {
        let decoded = match fetched {
            Fetched::Missing => {
                debug!(tile = %tile, "tile not available");
                report.tiles_missing += 1;
                continue;
            }
            Fetched::Failed(e) => {
                warn!(tile = %tile, error = %e, "skipping tile");
                report.tiles_failed += 1;
                continue;
            }
            Fetched::Decoded(decoded) => decoded,
        };

        match builder.add_tile_with_stats(&decoded) {
            Ok(stats) if stats.updated() => {
                report.tiles_loaded += 1;
                report.edges_added += u64::from(stats.edges_added);
            }
            Ok(_) => report.tiles_unchanged += 1,
            Err(e) if e.is_fatal() => {
                error!(tile = %tile, error = %e, "aborting load");
                return Err(e);
            }
            Err(e) => {
                error!(tile = %tile, error = %e, "failed to add tile");
                report.tiles_failed += 1;
            }
        }
    }
    drop(tiles);
    drop(builder);

    if options.keep_global_ids {
        add_or_update_global_ids(store, &global_ids);
    }

    store.sort();
    store.optimize();
    store.compress();

    report.vertices = store.vertex_count();
    info!(
        loaded = report.tiles_loaded,
        missing = report.tiles_missing,
        failed = report.tiles_failed,
        vertices = report.vertices,
        edges = report.edges_added,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "load complete"
    );
    Ok(report)
}

async fn fetch_and_decode<T, D>(source: &T, decoder: &D, tile: Tile) -> (Tile, Fetched)
where
    T: TileSource,
    D: TileDecoder + Sync,
{
    let fetched = match source.fetch(tile).await {
        Ok(Some(bytes)) => match decoder.decode(tile, &bytes) {
            Ok(decoded) => Fetched::Decoded(decoded),
            Err(e) => Fetched::Failed(e),
        },
        Ok(None) => Fetched::Missing,
        Err(e) => Fetched::Failed(e.into()),
    };
    (tile, fetched)
}
