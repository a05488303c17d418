use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::core::errors::ImageError;

/// Normalize an uploaded image for transport to the classifier.
///
/// Decodes the buffer, forces a 3-channel representation (JPEG carries no
/// alpha), shrinks it so neither side exceeds `max_dimension` while keeping
/// the aspect ratio (never upscales), and re-encodes as JPEG at the given
/// quality.
pub fn normalize_to_jpeg(
    bytes: &[u8],
    max_dimension: u32,
    quality: u8,
) -> Result<Vec<u8>, ImageError> {
    let decoded = image::load_from_memory(bytes).map_err(ImageError::Decode)?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let bounded = if rgb.width() > max_dimension || rgb.height() > max_dimension {
        rgb.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        rgb
    };

    let mut jpeg_bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, quality);
    bounded
        .write_with_encoder(encoder)
        .map_err(ImageError::Encode)?;
    Ok(jpeg_bytes)
}

/// Asynchronously normalize an upload using spawn_blocking to avoid blocking
/// the async runtime.
///
/// Decoding and JPEG encoding are CPU-intensive synchronous operations.
pub async fn normalize_to_jpeg_async(
    bytes: Vec<u8>,
    max_dimension: u32,
    quality: u8,
) -> Result<Vec<u8>, ImageError> {
    tokio::task::spawn_blocking(move || normalize_to_jpeg(&bytes, max_dimension, quality))
        .await
        .map_err(|e| ImageError::Task(e.to_string()))?
}
