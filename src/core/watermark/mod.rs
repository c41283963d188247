// Watermarking algorithm modules
pub mod chaos;
pub mod colorspace;
pub mod dwt;
pub mod embedder;
pub mod extractor;
pub mod scramble;
pub mod svd;

use std::path::Path;

use image::DynamicImage;

use crate::models::WatermarkError;

pub use embedder::WatermarkEmbedder;
pub use extractor::WatermarkExtractor;

/// Decode an image from disk, mapping failures to `Decode` with the path
pub(crate) fn open_image(path: &Path) -> Result<DynamicImage, WatermarkError> {
    image::open(path).map_err(|e| {
        WatermarkError::Decode(format!("Failed to load image {}: {}", path.display(), e))
    })
}
