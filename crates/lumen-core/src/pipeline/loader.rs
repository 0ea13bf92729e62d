//! Batch image loader.
//!
//! Splits an ordered candidate list into fixed-size chunks and loads each
//! chunk either as decoded images (local backend) or raw bytes (remote
//! backend). A candidate that fails to load is logged and left out of the
//! chunk; it never fails the chunk or the request.

use image::DynamicImage;
use std::slice::Chunks;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::Candidate;

use super::decode::ImageDecoder;
use super::validate::Validator;

/// Loads candidate images from disk in fixed-size batches.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    batch_size: usize,
    validator: Validator,
    decoder: ImageDecoder,
}

impl BatchLoader {
    /// Create a loader. A `batch_size` of 0 is treated as 1.
    pub fn new(batch_size: usize, limits: LimitsConfig) -> Self {
        Self {
            batch_size: batch_size.max(1),
            validator: Validator::new(limits.clone()),
            decoder: ImageDecoder::new(limits),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Split candidates into chunks of `batch_size`, in input order.
    /// The last chunk may be smaller.
    pub fn chunks<'a>(&self, candidates: &'a [Candidate]) -> Chunks<'a, Candidate> {
        candidates.chunks(self.batch_size)
    }

    /// Number of chunks `chunks` will yield for `len` candidates.
    pub fn batch_count(&self, len: usize) -> usize {
        len.div_ceil(self.batch_size)
    }

    /// Read the raw bytes of every loadable candidate in the chunk.
    pub async fn load_bytes(&self, chunk: &[Candidate]) -> Vec<(Candidate, Vec<u8>)> {
        let mut loaded = Vec::with_capacity(chunk.len());
        for candidate in chunk {
            match self.read(candidate).await {
                Ok(bytes) => loaded.push((candidate.clone(), bytes)),
                Err(e) => log_skip(candidate, &e),
            }
        }
        loaded
    }

    /// Decode every loadable candidate in the chunk.
    pub async fn load_decoded(&self, chunk: &[Candidate]) -> Vec<(Candidate, DynamicImage)> {
        let mut loaded = Vec::with_capacity(chunk.len());
        for candidate in chunk {
            match self.decode(candidate).await {
                Ok(image) => loaded.push((candidate.clone(), image)),
                Err(e) => log_skip(candidate, &e),
            }
        }
        loaded
    }

    /// Read one candidate's bytes after the size check.
    ///
    /// Content is not inspected here; the decoder or the remote endpoint
    /// decides whether the bytes are an image.
    pub async fn read(&self, candidate: &Candidate) -> PipelineResult<Vec<u8>> {
        let path = candidate.as_path();
        let meta = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::FileNotFound(path.to_path_buf())
            } else {
                PipelineError::Read {
                    path: path.to_path_buf(),
                    message: format!("Cannot read metadata: {e}"),
                }
            }
        })?;
        if !meta.is_file() {
            return Err(PipelineError::Read {
                path: path.to_path_buf(),
                message: "Not a regular file".to_string(),
            });
        }
        self.validator.check_size(path, meta.len())?;

        tokio::fs::read(path).await.map_err(|e| PipelineError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    async fn decode(&self, candidate: &Candidate) -> PipelineResult<DynamicImage> {
        let bytes = self.read(candidate).await?;
        let decoded = self
            .decoder
            .decode_from_bytes(bytes, candidate.as_path())
            .await?;
        tracing::trace!(
            "Decoded {} ({}x{}, {:?})",
            candidate,
            decoded.width,
            decoded.height,
            decoded.format
        );
        Ok(decoded.image)
    }
}

fn log_skip(candidate: &Candidate, error: &PipelineError) {
    tracing::error!("Skipping image {candidate}: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::path::Path;

    fn write_png(dir: &Path, name: &str) -> Candidate {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 10, 10])))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        Candidate::from(path)
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n).map(|i| Candidate::new(format!("{i}.jpg"))).collect()
    }

    #[test]
    fn test_chunks_default_size() {
        let loader = BatchLoader::new(10, LimitsConfig::default());
        let all = candidates(23);
        let sizes: Vec<usize> = loader.chunks(&all).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(loader.batch_count(23), 3);
        assert_eq!(loader.batch_count(0), 0);
    }

    #[test]
    fn test_chunks_preserve_order() {
        let loader = BatchLoader::new(2, LimitsConfig::default());
        let all = candidates(5);
        let flat: Vec<Candidate> = loader.chunks(&all).flatten().cloned().collect();
        assert_eq!(flat, all);
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let loader = BatchLoader::new(0, LimitsConfig::default());
        assert_eq!(loader.batch_size(), 1);
    }

    #[tokio::test]
    async fn test_load_decoded_skips_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_png(dir.path(), "good.png");
        let corrupt = dir.path().join("corrupt.jpg");
        std::fs::write(&corrupt, b"not an image at all").unwrap();
        let missing = Candidate::from(dir.path().join("missing.png"));

        let loader = BatchLoader::new(10, LimitsConfig::default());
        let chunk = vec![missing, good.clone(), Candidate::from(corrupt)];
        let loaded = loader.load_decoded(&chunk).await;

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, good);
    }

    #[tokio::test]
    async fn test_load_bytes_all_failing_is_empty() {
        let loader = BatchLoader::new(10, LimitsConfig::default());
        let chunk = [
            Candidate::from("/nonexistent/a.jpg"),
            Candidate::from("/nonexistent/b.jpg"),
        ];
        let loaded = loader.load_bytes(&chunk).await;
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_pnm_is_loaded_and_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.ppm");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 3, Rgb([0, 90, 200])))
            .save_with_format(&path, ImageFormat::Pnm)
            .unwrap();
        let candidate = Candidate::from(path);
        let loader = BatchLoader::new(10, LimitsConfig::default());

        let raw = loader.load_bytes(std::slice::from_ref(&candidate)).await;
        assert_eq!(raw.len(), 1);
        assert!(raw[0].1.starts_with(b"P6"));

        let decoded = loader.load_decoded(std::slice::from_ref(&candidate)).await;
        assert_eq!(decoded.len(), 1);
        assert_eq!((decoded[0].1.width(), decoded[0].1.height()), (5, 3));
    }

    #[tokio::test]
    async fn test_load_bytes_leaves_content_to_the_receiver() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opaque.bin");
        std::fs::write(&path, b"xy").unwrap();

        let loader = BatchLoader::new(10, LimitsConfig::default());
        let loaded = loader.load_bytes(&[Candidate::from(path)]).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].1, b"xy".to_vec());
    }

    #[tokio::test]
    async fn test_read_reports_missing_file() {
        let loader = BatchLoader::new(10, LimitsConfig::default());
        let err = loader
            .read(&Candidate::from("/nonexistent/a.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }
}
