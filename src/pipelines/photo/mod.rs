// SPDX-License-Identifier: MPL-2.0

//! Async snapshot pipeline
//!
//! ```text
//! Current frame → Rotate + scale (canvas) → Encoding → Data URI → Host
//!       ↓
//! Preview continues uninterrupted
//! ```
//!
//! Rendering and encoding both run on the blocking pool.

pub mod capture;
pub mod encoding;

pub use capture::{CaptureRenderer, SnapshotCanvas, Transform};
pub use encoding::{
    EncodedImage, EncodingQuality, PhotoEncoder, SNAPSHOT_EXTENSION, SNAPSHOT_MIME_TYPE,
    decode_data_uri,
};

use crate::backends::camera::types::CameraFrame;
use crate::constants::SizeOption;
use crate::errors::PhotoError;
use crate::geometry::Orientation;
use tracing::info;

/// Snapshot pipeline: render then encode
#[derive(Debug, Clone, Default)]
pub struct PhotoPipeline {
    encoder: PhotoEncoder,
}

impl PhotoPipeline {
    /// Create a new photo pipeline with default settings (high quality JPEG)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline encoding at `quality`
    pub fn with_quality(quality: EncodingQuality) -> Self {
        Self {
            encoder: PhotoEncoder::with_quality(quality),
        }
    }

    /// Render `frame` at `orientation` and `size`, then encode it
    pub async fn snapshot(
        &self,
        frame: CameraFrame,
        orientation: Orientation,
        size: SizeOption,
    ) -> Result<EncodedImage, PhotoError> {
        let target = size.target_dimension;
        let rendered = tokio::task::spawn_blocking(move || {
            let source = CaptureRenderer::source_from_frame(&frame)?;
            CaptureRenderer::render(&source, orientation, target)
        })
        .await
        .map_err(|e| PhotoError::RenderFailed(format!("Render task error: {}", e)))??;

        let encoded = self.encoder.encode(rendered).await?;
        info!(
            size = %size.label,
            width = encoded.width,
            height = encoded.height,
            bytes = encoded.data.len(),
            "Snapshot encoded"
        );
        Ok(encoded)
    }
}
