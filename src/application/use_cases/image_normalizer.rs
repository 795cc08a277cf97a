use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::debug;

use crate::domain::error::{AppError, Result};
use crate::domain::prompt::InlineImage;

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// A re-encoded JPEG ready for upload or inline storage.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", JPEG_MIME_TYPE, self.to_base64())
    }

    pub fn to_inline_image(&self) -> InlineImage {
        InlineImage {
            mime_type: JPEG_MIME_TYPE.to_string(),
            data_base64: self.to_base64(),
        }
    }
}

/// Downsamples to a bounded edge length and recompresses as JPEG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageNormalizer {
    max_edge: u32,
    quality: f32,
}

impl ImageNormalizer {
    /// `quality` is in `(0, 1]`, the way the upload pipeline is configured.
    pub fn new(max_edge: u32, quality: f32) -> Self {
        Self {
            max_edge: max_edge.max(1),
            quality,
        }
    }

    /// Bounds applied before an image is sent to the model.
    pub fn for_upload() -> Self {
        Self::new(1024, 0.7)
    }

    /// Bounds applied to thumbnails embedded in saved sessions.
    pub fn for_thumbnail() -> Self {
        Self::new(800, 0.7)
    }

    pub fn max_edge(&self) -> u32 {
        self.max_edge
    }

    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    pub fn normalize(&self, bytes: &[u8]) -> Result<NormalizedImage> {
        if bytes.is_empty() {
            return Err(AppError::ImageReadError("Image data is empty".to_string()));
        }

        let format = image::guess_format(bytes).ok();
        let img = image::load_from_memory(bytes)
            .map_err(|e| AppError::ImageDecodeError(format!("Failed to decode image: {}", e)))?;

        let (source_width, source_height) = (img.width(), img.height());
        if source_width == 0 || source_height == 0 {
            return Err(AppError::ImageRenderError(format!(
                "Cannot render a {}x{} image",
                source_width, source_height
            )));
        }

        let (width, height) = fit_dimensions(source_width, source_height, self.max_edge);
        let rendered = if (width, height) == (source_width, source_height) {
            img
        } else {
            img.resize_exact(width, height, FilterType::Triangle)
        };

        let rgb = rendered.to_rgb8();
        let mut out = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut out, self.jpeg_quality());
            encoder
                .encode_image(&rgb)
                .map_err(|e| AppError::ImageRenderError(format!("JPEG encoding failed: {}", e)))?;
        }
        if out.is_empty() {
            return Err(AppError::ImageRenderError(
                "JPEG encoder produced no data".to_string(),
            ));
        }

        debug!(
            ?format,
            source_width,
            source_height,
            width,
            height,
            bytes_in = bytes.len(),
            bytes_out = out.len(),
            "Normalized image"
        );

        Ok(NormalizedImage {
            bytes: out,
            width,
            height,
        })
    }

    pub fn to_data_url(&self, bytes: &[u8]) -> Result<String> {
        Ok(self.normalize(bytes)?.to_data_url())
    }
}

/// Scales the longer edge down to `max_edge`; never upscales. The other edge
/// is rounded to the nearest pixel.
pub fn fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let scale = |edge: u32, longer: u32| -> u32 {
        ((edge as f64 * max_edge as f64) / longer as f64).round().max(1.0) as u32
    };

    if width > height {
        if width > max_edge {
            return (max_edge, scale(height, width));
        }
    } else if height > max_edge {
        return (scale(width, height), max_edge);
    }
    (width, height)
}
