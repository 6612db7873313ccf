//! Palette charts and animated captures of a mosaic build

use std::collections::HashMap;
use std::path::Path;

use image::{DynamicImage, Frame, Rgb, RgbImage};

use crate::colour::palette::Palette;
use crate::colour::space::{ColourSpace, LEVELS};
use crate::io::configuration::{
    BUILD_BACKGROUND_DIM, MAX_GIF_FRAMES, PLOT_BIN_WIDTH, PLOT_CHANNEL_HEIGHT,
    VIEWER_MIN_FRAME_DELAY_MS,
};
use crate::io::error::{MosaicError, Result, computation_error};
use crate::io::image::export_image;
use crate::mosaic::grid::MosaicGrid;
use crate::mosaic::pool::TileId;
use crate::spatial::buffer::PixelBuffer;

const PLOT_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const RGB_BAR_COLOURS: [Rgb<u8>; 3] = [Rgb([200, 40, 40]), Rgb([40, 160, 40]), Rgb([40, 40, 200])];
const UCS_BAR_COLOURS: [Rgb<u8>; 3] = [Rgb([90, 90, 90]), Rgb([180, 40, 150]), Rgb([200, 160, 20])];

/// Draw one bar chart per channel, stacked vertically, and save it
///
/// Bars are scaled to the tallest bin of their own channel.
///
/// # Errors
///
/// Returns an error if the chart cannot be written to `output_path`
pub fn plot_palette(palette: &Palette, output_path: &Path) -> Result<()> {
    let width = (LEVELS * PLOT_BIN_WIDTH) as u32;
    let height = (3 * PLOT_CHANNEL_HEIGHT) as u32;
    let mut chart = RgbImage::from_pixel(width, height, PLOT_BACKGROUND);
    let colours = match palette.space() {
        ColourSpace::Rgb => RGB_BAR_COLOURS,
        ColourSpace::Ucs => UCS_BAR_COLOURS,
    };

    for (channel, colour) in colours.into_iter().enumerate() {
        let Some(bins) = palette.channel(channel) else {
            continue;
        };
        let peak = bins.iter().copied().max().unwrap_or(0).max(1) as f64;
        let baseline = (channel + 1) * PLOT_CHANNEL_HEIGHT;
        for (level, &count) in bins.iter().enumerate() {
            let bar = ((count as f64 / peak) * (PLOT_CHANNEL_HEIGHT - 1) as f64).round() as usize;
            for dy in 0..bar {
                for dx in 0..PLOT_BIN_WIDTH {
                    let x = (level * PLOT_BIN_WIDTH + dx) as u32;
                    let y = (baseline - 1 - dy) as u32;
                    if let Some(pixel) = chart.get_pixel_mut_checked(x, y) {
                        *pixel = colour;
                    }
                }
            }
        }
    }

    export_image(&chart, output_path)
}

/// Records the order tiles were placed during a build
///
/// The animation starts from a dimmed copy of the master and reveals one tile
/// per placement, so viewers can follow the row-major matching order.
pub struct BuildCapture {
    background: RgbImage,
    tiles: HashMap<TileId, RgbImage>,
    placements: Vec<(u32, u32, TileId)>,
}

impl BuildCapture {
    /// Capture the assignments of a matched or assembled grid
    ///
    /// # Errors
    ///
    /// Returns an error if the grid has no assignments or its pixels cannot be
    /// converted to RGB images
    pub fn from_grid(grid: &MosaicGrid) -> Result<Self> {
        if grid.assignments().is_empty() {
            return Err(computation_error(
                "build capture",
                &"no tile placements to capture",
            ));
        }
        let layout = grid.layout();
        let master = rgb_image(&grid.master().pixels().region(
            0,
            0,
            layout.output_height(),
            layout.output_width(),
        )?)?;
        let background = dim(&master, BUILD_BACKGROUND_DIM);

        let mut tiles = HashMap::new();
        let mut placements = Vec::with_capacity(grid.assignments().len());
        for assignment in grid.assignments() {
            if !tiles.contains_key(&assignment.tile) {
                let tile = grid.pool().tile(assignment.tile).ok_or_else(|| {
                    computation_error("build capture", &format!("unknown tile {}", assignment.tile.0))
                })?;
                tiles.insert(assignment.tile, rgb_image(tile.pixels())?);
            }
            let (top, left) = layout.cell_origin(assignment.row, assignment.col);
            placements.push((left as u32, top as u32, assignment.tile));
        }

        Ok(Self {
            background,
            tiles,
            placements,
        })
    }

    /// Number of recorded placements
    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    /// Export the build as a GIF, skipping frames to respect viewer limits
    ///
    /// At most [`MAX_GIF_FRAMES`] intermediate frames are written; the delay is
    /// raised to [`VIEWER_MIN_FRAME_DELAY_MS`] if lower.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File system operations fail
    /// - GIF encoding fails
    pub fn export_gif(&self, output_path: &Path, frame_delay_ms: u32) -> Result<()> {
        let delay_ms = frame_delay_ms.max(VIEWER_MIN_FRAME_DELAY_MS);
        let skip_factor = self.placements.len().div_ceil(MAX_GIF_FRAMES).max(1);
        let frames = self.generate_frames(delay_ms, skip_factor);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MosaicError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create directory",
                source: e,
            })?;
        }

        let file = std::fs::File::create(output_path).map_err(|e| MosaicError::FileSystem {
            path: output_path.to_path_buf(),
            operation: "create file",
            source: e,
        })?;

        let mut encoder = image::codecs::gif::GifEncoder::new(file);
        encoder
            .encode_frames(frames)
            .map_err(|e| MosaicError::ImageExport {
                path: output_path.to_path_buf(),
                source: e,
            })?;

        tracing::debug!(path = %output_path.display(), "build animation written");
        Ok(())
    }

    fn generate_frames(&self, delay_ms: u32, skip_factor: usize) -> Vec<Frame> {
        let mut canvas = self.background.clone();
        let mut frames = vec![render_frame(&canvas, delay_ms)];

        for (count, &(x, y, tile)) in self.placements.iter().enumerate() {
            if let Some(pixels) = self.tiles.get(&tile) {
                image::imageops::replace(&mut canvas, pixels, i64::from(x), i64::from(y));
            }
            if (count + 1) % skip_factor == 0 {
                frames.push(render_frame(&canvas, delay_ms));
            }
        }

        if self.placements.len() % skip_factor != 0 {
            frames.push(render_frame(&canvas, delay_ms));
        }

        // Final frame displays longer for better visibility
        frames.push(render_frame(&canvas, delay_ms * 25));
        frames
    }
}

fn render_frame(canvas: &RgbImage, delay_ms: u32) -> Frame {
    Frame::from_parts(
        DynamicImage::ImageRgb8(canvas.clone()).to_rgba8(),
        0,
        0,
        image::Delay::from_numer_denom_ms(delay_ms, 1),
    )
}

fn rgb_image(pixels: &PixelBuffer) -> Result<RgbImage> {
    match pixels.space() {
        ColourSpace::Rgb => pixels.to_rgb_image(),
        ColourSpace::Ucs => pixels.to_rgb()?.to_rgb_image(),
    }
}

fn dim(image: &RgbImage, factor: f64) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel.0 = pixel.0.map(|v| (f64::from(v) * factor).round() as u8);
    }
    out
}
