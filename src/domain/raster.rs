//! Georeferenced raster description and the in-memory raster source.

use crate::core::errors::FootprintError;
use crate::core::traits::RasterSource;
use crate::core::validation::{validate_finite, validate_raster_dimensions};
use crate::domain::window::Window;
use image::RgbImage;
use ndarray::{Array3, s};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Affine mapping from continuous pixel coordinates to the CRS plane.
///
/// Coefficients follow the GDAL geotransform layout
/// `[c, a, b, f, d, e]`:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// Continuous pixel coordinates put the top-left corner of pixel `(0, 0)` at
/// `(0.0, 0.0)`; pixel centers sit at half-integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    /// Builds a transform from the six GDAL geotransform coefficients.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            c: gt[0],
            a: gt[1],
            b: gt[2],
            f: gt[3],
            d: gt[4],
            e: gt[5],
        }
    }

    /// Returns the coefficients in GDAL geotransform order.
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// North-up transform with square pixels of `pixel_size` CRS units and
    /// the raster's top-left corner at `(origin_x, origin_y)`.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self::from_gdal([origin_x, pixel_size, 0.0, origin_y, 0.0, -pixel_size])
    }

    /// Identity mapping; geographic coordinates equal continuous pixel coordinates.
    pub fn identity() -> Self {
        Self::from_gdal([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    /// Maps continuous pixel coordinates to the CRS plane.
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Geographic coordinates of the center of pixel `(col, row)`.
    ///
    /// Also accepts fractional indices, so `(col - 0.5, row - 0.5)` maps the
    /// pixel's top-left corner.
    #[inline]
    pub fn pixel_center_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        self.apply(col + 0.5, row + 0.5)
    }

    /// Inverse of [`pixel_center_to_geo`](Self::pixel_center_to_geo).
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Result<(f64, f64), FootprintError> {
        let (col, row) = self.inverse()?.apply(x, y);
        Ok((col - 0.5, row - 0.5))
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Area of one pixel in CRS units squared.
    pub fn pixel_area(&self) -> f64 {
        self.determinant().abs()
    }

    /// True when the transform flips orientation (the usual north-up case).
    pub fn flips_orientation(&self) -> bool {
        self.determinant() < 0.0
    }

    /// The inverse transform.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the transform is singular or has
    /// non-finite coefficients.
    pub fn inverse(&self) -> Result<AffineTransform, FootprintError> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON * self.scale() {
            return Err(FootprintError::config_error(format!(
                "affine transform {:?} is not invertible",
                self.to_gdal()
            )));
        }

        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Ok(AffineTransform {
            a,
            b,
            c: -(a * self.c + b * self.f),
            d,
            e,
            f: -(d * self.c + e * self.f),
        })
    }

    fn scale(&self) -> f64 {
        let sum = self.a * self.a + self.b * self.b + self.d * self.d + self.e * self.e;
        sum.max(f64::MIN_POSITIVE)
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Coordinate reference system identifier, e.g. `EPSG:32633`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(String);

impl Crs {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Crs {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Immutable description of the raster being processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterSurface {
    width: usize,
    height: usize,
    bands: usize,
    transform: AffineTransform,
    crs: Crs,
    nodata: Option<f32>,
}

impl RasterSurface {
    /// Creates a surface description.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty dimensions and a configuration error
    /// when the transform is not invertible.
    pub fn new(
        width: usize,
        height: usize,
        bands: usize,
        transform: AffineTransform,
        crs: Crs,
    ) -> Result<Self, FootprintError> {
        validate_raster_dimensions(height, width, bands, "raster surface")?;
        for (name, value) in ["c", "a", "b", "f", "d", "e"]
            .iter()
            .zip(transform.to_gdal())
        {
            validate_finite(value, &format!("transform.{name}"))
                .map_err(|e| FootprintError::config_error(e.to_string()))?;
        }
        transform.inverse()?;

        Ok(Self {
            width,
            height,
            bands,
            transform,
            crs,
            nodata: None,
        })
    }

    /// Sets the nodata value.
    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// `(rows, cols)` of the pixel grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// A raster held entirely in memory as a `rows x cols x bands` array.
#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    surface: RasterSurface,
    data: Array3<f32>,
}

impl InMemoryRaster {
    /// Wraps pixel data shaped `rows x cols x bands`.
    pub fn new(
        data: Array3<f32>,
        transform: AffineTransform,
        crs: Crs,
    ) -> Result<Self, FootprintError> {
        let (height, width, bands) = data.dim();
        let surface = RasterSurface::new(width, height, bands, transform, crs)?;
        Ok(Self { surface, data })
    }

    /// Sets the nodata value of the surface.
    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.surface = self.surface.with_nodata(nodata);
        self
    }

    /// Builds a three-band raster from an RGB image, scaling values to `[0, 1]`.
    pub fn from_rgb_image(
        image: &RgbImage,
        transform: AffineTransform,
        crs: Crs,
    ) -> Result<Self, FootprintError> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let data = Array3::from_shape_fn((height, width, 3), |(row, col, band)| {
            image.get_pixel(col as u32, row as u32)[band] as f32 / 255.0
        });
        Self::new(data, transform, crs)
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }
}

impl RasterSource for InMemoryRaster {
    fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    fn read_window(&self, window: &Window) -> Result<Array3<f32>, FootprintError> {
        if window.row_end() > self.surface.height || window.col_end() > self.surface.width {
            return Err(FootprintError::io_error(
                "reading raster window",
                std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "window {} extends past the {}x{} raster",
                        window, self.surface.height, self.surface.width
                    ),
                ),
            ));
        }

        Ok(self
            .data
            .slice(s![
                window.row_offset..window.row_end(),
                window.col_offset..window.col_end(),
                ..
            ])
            .to_owned())
    }
}
