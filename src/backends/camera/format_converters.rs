// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion for raw V4L2 buffers
//!
//! Everything is converted to packed RGB24 before it reaches the widget, so
//! the preview and the snapshot renderer only ever see one layout.

use super::types::{BackendError, BackendResult};
use image::RgbImage;

/// Packed 4:2:2 byte orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packed422 {
    /// Y0 U Y1 V
    Yuyv,
    /// U Y0 V Y1
    Uyvy,
}

/// Convert packed YUV 4:2:2 to RGB24
///
/// Each 4-byte group encodes 2 pixels sharing chroma. `stride` is the row
/// length in bytes as reported by the driver. Uses BT.601 coefficients.
pub fn packed_422_to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    order: Packed422,
) -> BackendResult<RgbImage> {
    let stride = stride.max(width * 2) as usize;
    let required = stride * (height as usize).saturating_sub(1) + width as usize * 2;
    if width == 0 || height == 0 || data.len() < required {
        return Err(BackendError::FormatNotSupported(format!(
            "4:2:2 buffer of {} bytes too small for {}x{}",
            data.len(),
            width,
            height
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for row in 0..height as usize {
        let line = &data[row * stride..row * stride + width as usize * 2];
        for chunk in line.chunks_exact(4) {
            let (y0, u, y1, v) = match order {
                Packed422::Yuyv => (chunk[0], chunk[1], chunk[2], chunk[3]),
                Packed422::Uyvy => (chunk[1], chunk[0], chunk[3], chunk[2]),
            };
            for luma in [y0, y1] {
                let (r, g, b) = yuv_to_rgb(luma, u, v);
                rgb.extend_from_slice(&[r, g, b]);
            }
        }
        // Odd widths leave one trailing pixel with half a chroma pair
        if width % 2 == 1 {
            let tail = &line[line.len() - 2..];
            let (luma, chroma) = match order {
                Packed422::Yuyv => (tail[0], tail[1]),
                Packed422::Uyvy => (tail[1], tail[0]),
            };
            let (r, g, b) = yuv_to_rgb(luma, chroma, 128);
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| BackendError::Other("RGB buffer size mismatch".to_string()))
}

/// Decode a Motion-JPEG buffer to RGB24
pub fn mjpeg_to_rgb(data: &[u8]) -> BackendResult<RgbImage> {
    image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| BackendError::FormatNotSupported(format!("MJPEG decode failed: {}", e)))
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}
