//! Utility functions for raster images.
//!
//! Plain image files carry no georeferencing, so the transform and CRS are
//! supplied by the caller.

use crate::core::FootprintError;
use crate::domain::raster::{AffineTransform, Crs, InMemoryRaster};
use crate::processors::BinaryMask;
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns `FootprintError::ImageLoad` if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbImage, FootprintError> {
    let img = image::open(path).map_err(FootprintError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Loads an image file as a three-band raster with values in `[0, 1]`.
///
/// # Arguments
///
/// * `path` - Image file in any format supported by the `image` crate
/// * `transform` - Pixel-to-map transform of the image
/// * `crs` - Coordinate reference system of the transform's output
pub fn load_raster_image(
    path: &Path,
    transform: AffineTransform,
    crs: Crs,
) -> Result<InMemoryRaster, FootprintError> {
    let rgb = load_image(path)?;
    InMemoryRaster::from_rgb_image(&rgb, transform, crs)
}

/// Writes a mask as an 8-bit grayscale image (foreground 255).
///
/// The format follows the file extension. Write and encoding failures are
/// reported as `Io` errors naming the path.
pub fn save_mask(mask: &BinaryMask, path: &Path) -> Result<(), FootprintError> {
    mask.as_image().save(path).map_err(|err| {
        let context = format!("writing mask {}", path.display());
        match err {
            image::ImageError::IoError(io) => FootprintError::io_error(&context, io),
            other => FootprintError::io_error(&context, std::io::Error::other(other)),
        }
    })
}
