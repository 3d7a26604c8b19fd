//! Synthetic Scene Example
//!
//! This example runs the footprint pipeline over a generated scene (or an
//! image file) with a stand-in model that reads the first band as building
//! probability, then writes the polygons as GeoJSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example synthetic_scene -- [OPTIONS]
//! ```
//!
//! # Arguments
//!
//! * `-i, --input` - Image to use instead of the generated scene
//! * `-o, --output` - GeoJSON output path (default: footprints.geojson)
//! * `-c, --config` - JSON pipeline configuration
//! * `--mask-output` - Also write the cleaned mask as a PNG
//! * `--tile-size`, `--overlap` - Window tiling overrides
//! * `--simplify` - Douglas-Peucker tolerance in map units
//! * `--fail-every` - Make every n-th inference call fail, to exercise retries
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=info cargo run --example synthetic_scene -- \
//!     --size 1024 --tile-size 256 --overlap 32 --simplify 0.5 -o scene.geojson
//! ```

use clap::Parser;
use ndarray::{Array2, Array3, ArrayView3, Axis};
use rooftrace::prelude::*;
use rooftrace::utils::{init_tracing, save_mask};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Command-line arguments for the synthetic scene example
#[derive(Parser)]
#[command(name = "synthetic_scene")]
#[command(about = "Extracts building footprints from a synthetic or image-based scene")]
struct Args {
    /// Image to use instead of the generated scene
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// GeoJSON output path
    #[arg(short, long, default_value = "footprints.geojson")]
    output: PathBuf,

    /// JSON pipeline configuration (fields not given keep their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the cleaned mask as a PNG
    #[arg(long)]
    mask_output: Option<PathBuf>,

    /// Side length of the generated scene in pixels
    #[arg(long, default_value_t = 768)]
    size: usize,

    /// Window size override
    #[arg(long)]
    tile_size: Option<u32>,

    /// Overlap margin override
    #[arg(long)]
    overlap: Option<u32>,

    /// Simplification tolerance in map units
    #[arg(long)]
    simplify: Option<f64>,

    /// Make every n-th inference call fail
    #[arg(long)]
    fail_every: Option<usize>,

    /// Map x of the top-left corner
    #[arg(long, default_value_t = 500_000.0)]
    origin_x: f64,

    /// Map y of the top-left corner
    #[arg(long, default_value_t = 4_200_000.0)]
    origin_y: f64,

    /// Pixel size in map units
    #[arg(long, default_value_t = 0.3)]
    pixel_size: f64,

    /// CRS identifier written to the output
    #[arg(long, default_value = "EPSG:32633")]
    crs: String,
}

/// Reads the first band as probability; optionally fails every n-th call.
#[derive(Debug)]
struct BrightnessModel {
    fail_every: Option<usize>,
    calls: AtomicUsize,
}

impl InferenceAdapter for BrightnessModel {
    fn predict(&self, tile: ArrayView3<'_, f32>) -> Result<Array2<f32>, FootprintError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(n) = self.fail_every {
            if n > 0 && call % n == 0 {
                return Err(FootprintError::inference_message(
                    self.name(),
                    format!("injected failure on call {call}"),
                ));
            }
        }
        Ok(tile.index_axis(Axis(2), 0).mapv(|v| v.clamp(0.0, 1.0)))
    }

    fn name(&self) -> &str {
        "brightness"
    }
}

/// Rectangular buildings, an L-shaped block, a courtyard and speckle noise.
fn generate_scene(size: usize) -> Array3<f32> {
    let scale = |v: usize| v * size / 768;
    let rects = [
        (60, 60, 140, 180),
        (60, 260, 200, 330),
        (300, 80, 360, 400),
        (360, 80, 520, 150),
        (250, 480, 500, 720),
        (580, 300, 700, 420),
        (600, 600, 612, 612),
    ];
    let courtyard = (320, 540, 430, 660);

    Array3::from_shape_fn((size, size, 3), |(row, col, band)| {
        let inside = |(r0, c0, r1, c1): (usize, usize, usize, usize)| {
            (scale(r0)..scale(r1)).contains(&row) && (scale(c0)..scale(c1)).contains(&col)
        };
        let building = rects.iter().any(|&r| inside(r)) && !inside(courtyard);
        let speckle = (row * 31 + col * 17) % 211 == 0;
        let value = if building || speckle { 0.85 } else { 0.1 };
        value * (1.0 - 0.1 * band as f32)
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default().with_tiling(256, 32),
    };
    if let Some(tile_size) = args.tile_size {
        config.tile_size = tile_size;
    }
    if let Some(overlap) = args.overlap {
        config.overlap_margin = overlap;
    }
    if let Some(tolerance) = args.simplify {
        config.simplify_tolerance = tolerance;
    }

    let transform = AffineTransform::north_up(args.origin_x, args.origin_y, args.pixel_size);
    let crs = Crs::new(args.crs.as_str());
    let raster = match &args.input {
        Some(path) => {
            info!("Loading raster image: {:?}", path);
            load_raster_image(path, transform, crs)?
        }
        None => {
            info!("Generating a {}x{} synthetic scene", args.size, args.size);
            InMemoryRaster::new(generate_scene(args.size), transform, crs)?
        }
    };

    let adapter = Arc::new(BrightnessModel {
        fail_every: args.fail_every,
        calls: AtomicUsize::new(0),
    });
    let pipeline = FootprintPipeline::new(config, adapter)?.with_progress_observer(
        |update: ProgressUpdate| {
            if update.completed == update.total {
                info!("{}", update);
            }
        },
    );

    let start = Instant::now();
    let extraction = pipeline
        .run(&raster, &CancellationToken::new())
        .into_result()?;
    info!("Pipeline finished in {:.2?}", start.elapsed());

    for warning in extraction.report.warnings() {
        warn!("{}", warning);
    }
    println!("{}", extraction.report.stats);
    println!(
        "{} footprint(s), total area {:.1} square map units",
        extraction.collection.len(),
        extraction.collection.total_area()
    );

    extraction.collection.write_geojson(&args.output)?;
    info!("Wrote {:?}", args.output);

    if let Some(mask_path) = &args.mask_output {
        save_mask(&extraction.mask, mask_path)?;
        info!(
            "Wrote {:?} ({} foreground pixels)",
            mask_path,
            extraction.mask.foreground_count()
        );
    }

    Ok(())
}
