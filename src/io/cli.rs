//! Command-line interface for building a mosaic from a master image and a tile directory

use crate::colour::space::ColourSpace;
use crate::io::configuration::{
    DEFAULT_MAX_REPEATS, DEFAULT_METRIC, DEFAULT_TILE_SIDE, GIF_FRAME_DELAY_MS, MosaicConfig,
    OUTPUT_SUFFIX, PROGRESS_UPDATE_INTERVAL,
};
use crate::io::error::Result;
use crate::io::progress::ProgressManager;
use crate::io::visualization::BuildCapture;
use crate::metrics::registry::{self, MetricRegistry};
use crate::mosaic::grid::{GridConfig, MosaicGrid};
use crate::mosaic::master::Master;
use crate::mosaic::pool::Pool;
use crate::spatial::cell::TileSize;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "photomosaic")]
#[command(
    author,
    version,
    about = "Rebuild a target image from a directory of tile images"
)]
/// Command-line arguments for the mosaic tool
pub struct Cli {
    /// Target image to reconstruct
    #[arg(value_name = "MASTER")]
    pub master: PathBuf,

    /// Directory of tile images
    #[arg(value_name = "TILES")]
    pub tiles: PathBuf,

    /// Output image (defaults to <MASTER>_mosaic next to the master)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Distance metric: greyscale, norm or luv_approx
    #[arg(short, long, default_value = DEFAULT_METRIC)]
    pub metric: String,

    /// Tile size as N (square) or WxH
    #[arg(short, long, default_value_t = TileSize::square(DEFAULT_TILE_SIDE))]
    pub tile_size: TileSize,

    /// Maximum times a single tile may be used, 0 for unlimited
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_REPEATS)]
    pub max_repeats: usize,

    /// Colour space distances are measured in: rgb or ucs
    #[arg(short, long, default_value_t = ColourSpace::Rgb)]
    pub colour_space: ColourSpace,

    /// Match the master's histogram to the tile pool before matching
    #[arg(long)]
    pub match_histogram: bool,

    /// Write a histogram chart of the prepared master to this path
    #[arg(long, value_name = "PATH")]
    pub plot_palette: Option<PathBuf>,

    /// Write an animated GIF of the build next to the output
    #[arg(short, long)]
    pub visualize: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Core options selected on the command line
    pub fn config(&self) -> MosaicConfig {
        MosaicConfig {
            metric: self.metric.clone(),
            tile_size: self.tile_size,
            max_repeats: self.max_repeats,
            colour_space: self.colour_space,
            match_histogram: self.match_histogram,
        }
    }

    /// Where the mosaic is written
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| sibling_path(&self.master, OUTPUT_SUFFIX, None))
    }

    /// Where the build animation is written
    pub fn visualization_path(&self) -> PathBuf {
        sibling_path(&self.output_path(), "_build", Some("gif"))
    }
}

fn sibling_path(path: &Path, suffix: &str, extension: Option<&str>) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let extension = extension
        .map(str::to_string)
        .or_else(|| path.extension().map(|e| e.to_string_lossy().to_string()))
        .unwrap_or_else(|| "png".to_string());
    let name = format!("{}{suffix}.{extension}", stem.to_string_lossy());

    path.parent()
        .map_or_else(|| PathBuf::from(&name), |parent| parent.join(&name))
}

/// Install the tracing subscriber used by the binary
///
/// `RUST_LOG` takes precedence; otherwise warnings are shown, or only errors
/// when `quiet`. Installing twice is a no-op.
pub fn init_logging(quiet: bool) {
    let default_filter = if quiet { "error" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Orchestrates one mosaic build from command-line arguments
pub struct MosaicRunner {
    cli: Cli,
    registry: MetricRegistry,
    progress_manager: Option<ProgressManager>,
}

impl MosaicRunner {
    /// Create a runner using the built-in metrics
    pub fn new(cli: Cli) -> Self {
        Self::with_registry(cli, registry::builtin().clone())
    }

    /// Create a runner resolving metric names against `registry`
    pub fn with_registry(cli: Cli, registry: MetricRegistry) -> Self {
        let progress_manager = cli.should_show_progress().then(ProgressManager::new);

        Self {
            cli,
            registry,
            progress_manager,
        }
    }

    /// Build the mosaic and write every requested output
    ///
    /// Returns the path of the written mosaic.
    ///
    /// # Errors
    ///
    /// Returns the first error of configuration, decoding, matching or export
    pub fn process(&mut self) -> Result<PathBuf> {
        let config = self.cli.config();
        config.validate()?;
        let metric = self.registry.get(&config.metric)?;

        let mut master = Master::from_file(&self.cli.master)?;

        self.start_stage("tiles", None);
        let mut pool = Pool::from_dir(&self.cli.tiles, config.tile_size)?;
        self.finish_stage(&format!(
            "{} loaded, {} skipped",
            pool.len(),
            pool.warnings().len()
        ));

        if config.colour_space == ColourSpace::Ucs {
            master = master.to_ucs()?;
            pool = pool.to_ucs()?;
        }
        if config.match_histogram {
            master = master.match_histogram(&pool.palette())?;
        }
        if let Some(ref plot_path) = self.cli.plot_palette {
            master.plot(plot_path)?;
        }

        let mut grid = MosaicGrid::new(
            master,
            pool,
            metric,
            GridConfig {
                tile_size: config.tile_size,
                max_repeats: config.max_repeats,
            },
        )?;
        let cell_count = grid.partition()?.len();

        self.start_stage("matching", Some(cell_count));
        let mut matched = 0;
        while grid.match_next()? {
            matched += 1;
            if matched % PROGRESS_UPDATE_INTERVAL == 0 {
                self.advance(matched);
            }
        }
        self.finish_stage(&format!("{} tiles used", distinct_tiles(&grid)));

        let mosaic = grid.assemble()?;
        let output_path = self.cli.output_path();
        mosaic.save(&output_path)?;

        if self.cli.visualize {
            BuildCapture::from_grid(&grid)?
                .export_gif(&self.cli.visualization_path(), GIF_FRAME_DELAY_MS)?;
        }

        if let Some(ref mut pm) = self.progress_manager {
            pm.finish();
        }
        tracing::info!(path = %output_path.display(), "mosaic written");
        Ok(output_path)
    }

    fn start_stage(&mut self, name: &str, length: Option<usize>) {
        if let Some(ref mut pm) = self.progress_manager {
            pm.start_stage(name, length);
        }
    }

    fn advance(&self, position: usize) {
        if let Some(ref pm) = self.progress_manager {
            pm.advance(position);
        }
    }

    fn finish_stage(&mut self, message: &str) {
        if let Some(ref mut pm) = self.progress_manager {
            pm.finish_stage(message);
        }
    }
}

fn distinct_tiles(grid: &MosaicGrid) -> usize {
    grid.pool()
        .tiles()
        .iter()
        .filter(|tile| tile.uses() > 0)
        .count()
}
