// SPDX-License-Identifier: GPL-3.0-only

//! Async photo encoding
//!
//! Snapshots are emitted as JPEG with a configurable quality preset.
//! Encoding runs on the blocking pool to keep the preview responsive.

use crate::errors::PhotoError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// MIME type of every emitted snapshot
pub const SNAPSHOT_MIME_TYPE: &str = "image/jpeg";

/// File extension for saved snapshots
pub const SNAPSHOT_EXTENSION: &str = "jpg";

/// Encoding quality settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncodingQuality {
    /// Low quality (high compression)
    Low,
    /// Medium quality (balanced)
    Medium,
    /// High quality (low compression)
    #[default]
    High,
    /// Maximum quality (minimal compression)
    Maximum,
}

impl EncodingQuality {
    /// Get JPEG quality value (0-100)
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            EncodingQuality::Low => 60,
            EncodingQuality::Medium => 80,
            EncodingQuality::High => 92,
            EncodingQuality::Maximum => 98,
        }
    }
}

/// JPEG data ready for emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            SNAPSHOT_MIME_TYPE,
            STANDARD.encode(&self.data)
        )
    }
}

/// Decode the JPEG bytes of a base64 data URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, PhotoError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| PhotoError::EncodingFailed("not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| PhotoError::EncodingFailed("data URI without payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| PhotoError::EncodingFailed("data URI is not base64".to_string()))?;
    if !matches!(mime, "image/jpeg" | "image/jpg") {
        return Err(PhotoError::EncodingFailed(format!(
            "unsupported MIME type {}",
            mime
        )));
    }
    STANDARD
        .decode(payload)
        .map_err(|e| PhotoError::EncodingFailed(format!("invalid base64: {}", e)))
}

/// Photo encoder
#[derive(Debug, Clone, Default)]
pub struct PhotoEncoder {
    quality: EncodingQuality,
}

impl PhotoEncoder {
    /// Create a new encoder with high quality
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quality(quality: EncodingQuality) -> Self {
        Self { quality }
    }

    /// Encode an image asynchronously
    pub async fn encode(&self, image: RgbImage) -> Result<EncodedImage, PhotoError> {
        let quality = self.quality;

        tokio::task::spawn_blocking(move || Self::encode_sync(image, quality))
            .await
            .map_err(|e| PhotoError::EncodingFailed(format!("Encoding task error: {}", e)))?
    }

    /// Encode on the current thread
    pub fn encode_sync(
        image: RgbImage,
        quality: EncodingQuality,
    ) -> Result<EncodedImage, PhotoError> {
        let (width, height) = image.dimensions();
        info!(width, height, quality = ?quality, "Starting encoding");

        let mut data = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut data);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality.jpeg_quality());
        encoder
            .encode(image.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| PhotoError::EncodingFailed(format!("JPEG encoding failed: {}", e)))?;

        debug!(size = data.len(), "Encoding complete");

        Ok(EncodedImage {
            data,
            width,
            height,
        })
    }
}
