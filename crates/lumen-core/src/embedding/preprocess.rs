//! Image preprocessing for CLIP-style vision encoders.
//!
//! - Resize so the shorter side equals `image_size` (bicubic)
//! - Center-crop to `image_size × image_size`
//! - Channel order RGB, per-channel `(pixel/255 - mean) / std`
//! - Tensor layout NCHW `[1, 3, image_size, image_size]`

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

use crate::config::EmbeddingConfig;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// Converts decoded images into normalized NCHW tensors.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    image_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Preprocessor {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            image_size: config.image_size,
            mean: config.norm_mean,
            std: config.norm_std,
        }
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    /// Preprocess one image into a `[1, 3, S, S]` tensor.
    pub fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let size = self.image_size;
        let (w, h) = (image.width().max(1), image.height().max(1));

        // Scale the short side to `size`, keeping aspect ratio.
        let scale = size as f32 / w.min(h) as f32;
        let new_w = ((w as f32 * scale).round() as u32).max(size);
        let new_h = ((h as f32 * scale).round() as u32).max(size);
        let resized = image.resize_exact(new_w, new_h, FilterType::CatmullRom);

        let left = (new_w - size) / 2;
        let top = (new_h - size) / 2;
        let rgb = resized.crop_imm(left, top, size, size).to_rgb8();

        let size = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, CHANNELS, size, size));
        let plane = size * size;
        // Freshly allocated arrays are always standard layout.
        if let Some(data) = tensor.as_slice_mut() {
            for (i, pixel) in rgb.as_raw().chunks_exact(CHANNELS).enumerate() {
                for (c, &val) in pixel.iter().enumerate() {
                    data[c * plane + i] = (val as f32 / 255.0 - self.mean[c]) / self.std[c];
                }
            }
        }
        tensor
    }
}
