//! Image decoding, PNG/JPEG export and tile source discovery

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::io::error::{MosaicError, Result};

/// Decode an image file, attributing any failure to `path`
///
/// # Errors
///
/// Returns [`MosaicError::Decode`] if the file cannot be opened or decoded
pub fn decode_file(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| MosaicError::Decode {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Whether a path has an extension the codec recognises
pub fn is_image_path(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok()
}

/// List image files directly inside `dir`, sorted by path
///
/// # Errors
///
/// Returns [`MosaicError::FileSystem`] if the directory cannot be read
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_error = |e: std::io::Error| MosaicError::FileSystem {
        path: dir.to_path_buf(),
        operation: "list tile directory",
        source: e,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && is_image_path(&path) {
            files.push(path);
        }
    }
    // Directory order is platform dependent; the pool order must not be
    files.sort();
    Ok(files)
}

/// Save an image, creating parent directories as needed
///
/// The format follows the file extension.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The image cannot be encoded or written to `output_path`
pub fn export_image(image: &RgbImage, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MosaicError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }

    image
        .save(output_path)
        .map_err(|e| MosaicError::ImageExport {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    tracing::debug!(path = %output_path.display(), "image written");
    Ok(())
}
