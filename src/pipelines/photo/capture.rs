// SPDX-License-Identifier: MPL-2.0

//! Rotated snapshot rendering
//!
//! Renders a still from the current video frame so that it looks exactly like
//! the rotated live preview. The drawing follows a 2D canvas model: an affine
//! transform is built from a translate to the canvas centre, a quarter-turn
//! rotation and a translate back by half of the (possibly swapped) box, and
//! the source frame is then drawn scaled into that box.

use crate::backends::camera::types::CameraFrame;
use crate::errors::PhotoError;
use crate::geometry::{Orientation, SourceAspect, snapshot_dimensions};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use tracing::debug;

/// Affine transform in canvas convention
///
/// Maps user space `(x, y)` to device space
/// `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Append a translation
    pub fn translate(self, tx: f64, ty: f64) -> Self {
        Self {
            e: self.a * tx + self.c * ty + self.e,
            f: self.b * tx + self.d * ty + self.f,
            ..self
        }
    }

    /// Append a clockwise rotation by whole quarter turns
    ///
    /// Sine and cosine are taken from a table so quarter turns stay exact.
    pub fn rotate_quarter_turns(self, turns: u8) -> Self {
        let (cos, sin) = match turns % 4 {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        Self {
            a: self.a * cos + self.c * sin,
            b: self.b * cos + self.d * sin,
            c: self.c * cos - self.a * sin,
            d: self.d * cos - self.b * sin,
            ..self
        }
    }

    /// Map a user-space point to device space
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Map a device-space point back to user space
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let x0 = x - self.e;
        let y0 = y - self.f;
        Some((
            (self.d * x0 - self.c * y0) / det,
            (self.a * y0 - self.b * x0) / det,
        ))
    }
}

/// Drawing surface for a single snapshot
pub struct SnapshotCanvas {
    image: RgbaImage,
    transform: Transform,
}

impl SnapshotCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            transform: Transform::IDENTITY,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn reset_transform(&mut self) {
        self.transform = Transform::IDENTITY;
    }

    /// Clear every pixel to transparent
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.transform = self.transform.translate(tx, ty);
    }

    pub fn rotate_quarter_turns(&mut self, turns: u8) {
        self.transform = self.transform.rotate_quarter_turns(turns);
    }

    /// Draw the whole `source` scaled into the user-space box
    /// `(dx, dy, dw, dh)` under the current transform
    ///
    /// Each canvas pixel centre is mapped back into the box and sampled
    /// bilinearly from the source.
    pub fn draw_image(&mut self, source: &RgbImage, dx: f64, dy: f64, dw: f64, dh: f64) {
        let (sw, sh) = source.dimensions();
        if sw == 0 || sh == 0 || dw <= 0.0 || dh <= 0.0 {
            return;
        }
        let transform = self.transform;

        for (px, py, pixel) in self.image.enumerate_pixels_mut() {
            let Some((u, v)) = transform.invert(px as f64 + 0.5, py as f64 + 0.5) else {
                return;
            };
            if u < dx || v < dy || u >= dx + dw || v >= dy + dh {
                continue;
            }
            let sx = (u - dx) * sw as f64 / dw;
            let sy = (v - dy) * sh as f64 / dh;
            let Rgb([r, g, b]) = sample_bilinear(source, sx, sy);
            *pixel = Rgba([r, g, b, 255]);
        }
    }

    /// Flatten onto black, dropping alpha
    pub fn into_rgb(self) -> RgbImage {
        image::DynamicImage::ImageRgba8(self.image).to_rgb8()
    }
}

/// Sample at continuous source coordinates (pixel centres at `n + 0.5`)
fn sample_bilinear(source: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = source.dimensions();
    let fx = (x - 0.5).clamp(0.0, (w - 1) as f64);
    let fy = (y - 0.5).clamp(0.0, (h - 1) as f64);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let p00 = source.get_pixel(x0, y0).0;
    let p10 = source.get_pixel(x1, y0).0;
    let p01 = source.get_pixel(x0, y1).0;
    let p11 = source.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for (i, channel) in out.iter_mut().enumerate() {
        let top = p00[i] as f64 * (1.0 - tx) + p10[i] as f64 * tx;
        let bottom = p01[i] as f64 * (1.0 - tx) + p11[i] as f64 * tx;
        *channel = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

/// Renders rotated snapshots at a target size
pub struct CaptureRenderer;

impl CaptureRenderer {
    /// Decode a camera frame into the renderer's source image
    pub fn source_from_frame(frame: &CameraFrame) -> Result<RgbImage, PhotoError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(PhotoError::MetadataNotReady);
        }
        frame.to_rgb_image().ok_or_else(|| {
            PhotoError::RenderFailed(format!(
                "frame buffer of {} bytes too small for {}x{}",
                frame.data.len(),
                frame.width,
                frame.height
            ))
        })
    }

    /// Render `source` rotated by `orientation` at `target_dimension`
    ///
    /// The output is `target × target·h/w` for upright and upside-down
    /// orientations and `target·h/w × target` for quarter turns, where
    /// `w × h` is the source resolution.
    pub fn render(
        source: &RgbImage,
        orientation: Orientation,
        target_dimension: u32,
    ) -> Result<RgbImage, PhotoError> {
        let aspect = SourceAspect::new(source.width(), source.height());
        let (width, height) = snapshot_dimensions(orientation, aspect, target_dimension)
            .ok_or(PhotoError::MetadataNotReady)?;

        let mut canvas = SnapshotCanvas::new(width, height);
        let cw = width as f64;
        let ch = height as f64;

        canvas.reset_transform();
        canvas.clear();
        canvas.translate(cw / 2.0, ch / 2.0);
        canvas.rotate_quarter_turns(orientation.quarter_turns());

        if orientation.swaps_dimensions() {
            // The rotation exchanges the visual axes, so the box is swapped
            canvas.translate(-ch / 2.0, -cw / 2.0);
            canvas.draw_image(source, 0.0, 0.0, ch, cw);
        } else {
            canvas.translate(-cw / 2.0, -ch / 2.0);
            canvas.draw_image(source, 0.0, 0.0, cw, ch);
        }

        debug!(
            source = format!("{}x{}", aspect.video_width, aspect.video_height),
            output = format!("{}x{}", width, height),
            orientation = %orientation,
            "Rendered snapshot"
        );

        Ok(canvas.into_rgb())
    }
}
