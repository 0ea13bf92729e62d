//! Probe image used to exercise remote endpoints.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::PipelineError;

/// Default text sent with the probe image.
pub const DEFAULT_TEST_TEXT: &str = "test query";

/// Side length of the synthesized probe image.
const PROBE_SIZE: u32 = 224;

/// Bytes of the probe image: the configured file if present, otherwise a
/// solid red JPEG generated in memory.
pub fn probe_image(test_image: Option<&Path>) -> Result<Vec<u8>, PipelineError> {
    if let Some(path) = test_image.filter(|p| p.is_file()) {
        tracing::debug!("Using test image {:?}", path);
        return std::fs::read(path).map_err(|e| PipelineError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        });
    }
    synthetic_probe()
}

/// A 224x224 solid red JPEG.
pub fn synthetic_probe() -> Result<Vec<u8>, PipelineError> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(
        PROBE_SIZE,
        PROBE_SIZE,
        Rgb([255, 0, 0]),
    ));
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Jpeg)
        .map_err(|e| PipelineError::Model {
            message: format!("Failed to encode probe image: {e}"),
        })?;
    Ok(buf.into_inner())
}
