use anyhow::{Context, Result};
use butterfly_tiles::{
    load_from_tiles, BoundingBox, CachedTileSource, FileConfig, GraphStore, HttpTileSource,
    JsonLdDecoder, LoadReport, RouterDb, TagMapping, TileRange, TilesConfig, VehicleSet,
    DEFAULT_ZOOM, MAX_ZOOM,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "butterfly-tiles")]
#[command(version)]
#[command(about = "Build routing graphs from OpenStreetMap routable tiles", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all tiles covering a bounding box into a router db
    Load {
        /// Bounding box as min_lat,min_lon,max_lat,max_lon
        #[arg(long, value_parser = parse_bbox)]
        bbox: BoundingBox,
        /// Vehicle to load the network for (repeatable)
        #[arg(long = "vehicle")]
        vehicles: Vec<String>,
        /// Tile zoom level
        #[arg(long)]
        zoom: Option<u8>,
        /// Tile service base URL
        #[arg(long)]
        base_url: Option<String>,
        /// Directory caching downloaded tiles
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Do not store node ids (the db cannot be extended later)
        #[arg(long)]
        no_global_ids: bool,
        /// Cap on the length of a single edge, in meters
        #[arg(long)]
        max_edge_distance: Option<f32>,
        /// JSON file mapping tile properties to OSM tags
        #[arg(long)]
        tag_mapping: Option<PathBuf>,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Existing router db to extend
        #[arg(long)]
        db: Option<PathBuf>,
        /// Output router db file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List the tiles covering a bounding box
    Tiles {
        /// Bounding box as min_lat,min_lon,max_lat,max_lon
        #[arg(long, value_parser = parse_bbox)]
        bbox: BoundingBox,
        /// Tile zoom level
        #[arg(long, default_value_t = DEFAULT_ZOOM)]
        zoom: u8,
    },
    /// Print statistics of a router db
    Info {
        /// Router db file
        db: PathBuf,
    },
}

fn parse_bbox(s: &str) -> std::result::Result<BoundingBox, String> {
    s.parse()
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Commands::Load {
            bbox,
            vehicles,
            zoom,
            base_url,
            cache_dir,
            no_global_ids,
            max_edge_distance,
            tag_mapping,
            config,
            db,
            output,
        } => {
            let file = match &config {
                Some(path) => FileConfig::from_path(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?,
                None => FileConfig::default(),
            };
            let flags = FileConfig {
                base_url,
                zoom,
                keep_global_ids: no_global_ids.then_some(false),
                concurrency: None,
                cache_dir,
                vehicles: (!vehicles.is_empty()).then_some(vehicles),
                max_edge_distance,
                tag_mapping,
            };
            let config = file.merge(flags).resolve()?;

            let start = Instant::now();
            let mut router_db = match &db {
                Some(path) => RouterDb::load(path)
                    .with_context(|| format!("Failed to load router db {}", path.display()))?,
                None => RouterDb::new(),
            };

            let report = run_load(&mut router_db, &bbox, &config).await?;

            router_db
                .save(&output)
                .with_context(|| format!("Failed to save router db {}", output.display()))?;

            println!("Tiles requested: {}", report.tiles_requested);
            println!("Tiles loaded:    {}", report.tiles_loaded);
            println!("Tiles unchanged: {}", report.tiles_unchanged);
            println!("Tiles missing:   {}", report.tiles_missing);
            println!("Tiles failed:    {}", report.tiles_failed);
            println!("Vertices:        {}", report.vertices);
            println!("Edges:           {}", router_db.edge_count());
            println!(
                "✓ Saved {} in {:.2}s",
                output.display(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Tiles { bbox, zoom } => {
            if zoom > MAX_ZOOM {
                anyhow::bail!("Zoom {zoom} is above the maximum of {MAX_ZOOM}");
            }
            let range = TileRange::new(&bbox, zoom);
            for tile in range.iter() {
                println!("{tile}");
            }
            eprintln!("{} tiles", range.tile_count());
        }
        Commands::Info { db } => {
            print_info(&db)?;
        }
    }

    Ok(())
}

async fn run_load(
    db: &mut RouterDb,
    bbox: &BoundingBox,
    config: &TilesConfig,
) -> Result<LoadReport> {
    let vehicles = VehicleSet::from_names(config.vehicles.as_slice())?;
    let mapping = match &config.tag_mapping {
        Some(path) => TagMapping::from_path(path)
            .with_context(|| format!("Failed to read tag mapping {}", path.display()))?,
        None => TagMapping::default(),
    };
    let decoder = JsonLdDecoder::new(mapping);
    let options = config.load_options();
    let http = HttpTileSource::new(&config.base_url)?;

    tracing::info!(vehicles = ?vehicles.names(), base_url = %config.base_url, "starting load");

    let report = match &config.cache_dir {
        Some(dir) => {
            let source = CachedTileSource::new(http, dir);
            load_from_tiles(db, bbox, &source, &decoder, &vehicles, &options).await?
        }
        None => load_from_tiles(db, bbox, &http, &decoder, &vehicles, &options).await?,
    };
    Ok(report)
}

fn print_info(path: &Path) -> Result<()> {
    let db = RouterDb::load(path)
        .with_context(|| format!("Failed to load router db {}", path.display()))?;

    let shape_points: usize = db.edges().iter().map(|e| e.shape.len()).sum();
    let total_m: f64 = db.edges().iter().map(|e| f64::from(e.data.distance)).sum();

    println!("Router db:     {}", path.display());
    println!("Vertices:      {}", db.vertex_count());
    println!("Edges:         {}", db.edge_count());
    println!("Shape points:  {shape_points}");
    println!("Total length:  {:.1} km", total_m / 1000.0);
    println!("Profiles:      {}", db.profile_count());
    println!("Meta entries:  {}", db.meta_count());
    println!("Global ids:    {}", if db.has_global_ids() { "yes" } else { "no" });
    Ok(())
}
