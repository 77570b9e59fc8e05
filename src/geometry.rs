// SPDX-License-Identifier: GPL-3.0-only

//! Orientation-aware layout geometry
//!
//! Pure functions that fit a video feed of arbitrary aspect ratio into a
//! viewport rotated by quarter turns, and that size rotated snapshots.
//!
//! The viewport's long side anchors everything:
//!
//! ```text
//!   even orientation (0°/180°)        odd orientation (90°/270°)
//!   ┌──────── long ────────┐          ┌─ w ─┐
//!   │                      │ h        │     │
//!   └──────────────────────┘          │     │ long
//!   h = long · vh / vw                │     │
//!                                     └─────┘
//!                                     w = long · vh / vw
//! ```
//!
//! For odd orientations the element is laid out unrotated (long × w) and then
//! rotated about its centre, so it is shifted by `(long - w) / 2` to keep
//! the visible content inside the window.

use crate::constants::{SizeLabel, SizeOption, size_options};
use serde::{Deserialize, Serialize};

/// Quarter-turn rotation applied uniformly to preview and capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Upright
    #[default]
    Normal,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl Orientation {
    /// Create an orientation from a quarter-turn count, normalised modulo 4
    pub fn from_quarter_turns(turns: i64) -> Self {
        match turns.rem_euclid(4) {
            1 => Orientation::Rotate90,
            2 => Orientation::Rotate180,
            3 => Orientation::Rotate270,
            _ => Orientation::Normal,
        }
    }

    /// Parse a persisted preference value; anything unparsable is upright
    pub fn from_preference(value: &str) -> Self {
        value
            .trim()
            .parse::<i64>()
            .map(Self::from_quarter_turns)
            .unwrap_or_default()
    }

    /// Quarter turns clockwise (0-3)
    pub fn quarter_turns(&self) -> u8 {
        match self {
            Orientation::Normal => 0,
            Orientation::Rotate90 => 1,
            Orientation::Rotate180 => 2,
            Orientation::Rotate270 => 3,
        }
    }

    /// Rotation in degrees clockwise
    pub fn degrees(&self) -> u32 {
        self.quarter_turns() as u32 * 90
    }

    /// Check if the rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Orientation::Rotate90 | Orientation::Rotate270)
    }

    /// One quarter turn counter-clockwise
    pub fn rotated_left(&self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() as i64 + 3)
    }

    /// One quarter turn clockwise
    pub fn rotated_right(&self) -> Self {
        Self::from_quarter_turns(self.quarter_turns() as i64 + 1)
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Native resolution reported by the active stream
///
/// Both fields stay zero until the stream's metadata has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceAspect {
    pub video_width: u32,
    pub video_height: u32,
}

impl SourceAspect {
    pub fn new(video_width: u32, video_height: u32) -> Self {
        Self {
            video_width,
            video_height,
        }
    }

    /// Whether the stream has reported a usable resolution
    pub fn is_ready(&self) -> bool {
        self.video_width > 0 && self.video_height > 0
    }

    /// Height over width
    pub fn ratio(&self) -> f64 {
        self.video_height as f64 / self.video_width as f64
    }
}

/// Size of the hosting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The larger of width and height
    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Pixel dimensions a snapshot at one size preset would have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub label: SizeLabel,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for SizeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}x{})", self.label, self.width, self.height)
    }
}

/// Display layout for the video element
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    /// Visible width after rotation
    pub width: f64,
    /// Visible height after rotation
    pub height: f64,
    /// Width of the element before its rotation transform
    pub element_width: f64,
    /// Height of the element before its rotation transform
    pub element_height: f64,
    /// Vertical shift of the element box
    pub offset_top: f64,
    /// Horizontal shift of the element box
    pub offset_left: f64,
    /// Rotation applied to the element about its own centre
    pub rotation_degrees: u32,
    /// Long side of the viewport the layout was anchored on
    pub long_side: u32,
    /// Snapshot dimensions for every size preset
    pub size_hints: [SizeHint; 4],
}

impl LayoutResult {
    /// Hint for one preset
    pub fn hint(&self, label: SizeLabel) -> Option<&SizeHint> {
        self.size_hints.iter().find(|hint| hint.label == label)
    }

    /// Window size the host should adopt, rounded to whole pixels
    pub fn window_size(&self) -> (u32, u32) {
        (self.width.round() as u32, self.height.round() as u32)
    }
}

/// Compute the display layout for a video feed
///
/// Returns `None` until the source has reported a resolution, and for a
/// viewport without area.
pub fn compute_layout(
    orientation: Orientation,
    source: SourceAspect,
    viewport: ViewportSize,
) -> Option<LayoutResult> {
    if !source.is_ready() {
        return None;
    }

    let long_side = viewport.long_side();
    if long_side == 0 {
        return None;
    }

    let long = long_side as f64;
    let ratio = source.ratio();

    let (width, height, element_width, element_height, offset_top, offset_left) =
        if orientation.swaps_dimensions() {
            // Portrait: the long side becomes the height
            let height = long;
            let width = height * ratio;
            let offset = (height - width) / 2.0;
            (width, height, height, width, offset, -offset)
        } else {
            // Landscape: the long side becomes the width
            let width = long;
            let height = width * ratio;
            (width, height, width, height, 0.0, 0.0)
        };

    let size_hints = size_options().map(|option| size_hint(option, width, height, long));

    Some(LayoutResult {
        width,
        height,
        element_width,
        element_height,
        offset_top,
        offset_left,
        rotation_degrees: orientation.degrees(),
        long_side,
        size_hints,
    })
}

fn size_hint(option: SizeOption, width: f64, height: f64, long: f64) -> SizeHint {
    let factor = option.target_dimension as f64 / long;
    SizeHint {
        label: option.label,
        width: floor_px(width * factor),
        height: floor_px(height * factor),
    }
}

// Tolerate float noise like 639.9999999 so hints agree with the integer
// snapshot dimensions.
fn floor_px(value: f64) -> u32 {
    (value + 1e-6).floor().max(0.0) as u32
}

/// Canvas dimensions of a snapshot taken at `target_dimension`
///
/// Odd orientations fix the height to the target, even ones the width; the
/// other edge follows the source aspect ratio and is truncated to whole
/// pixels (never below one).
pub fn snapshot_dimensions(
    orientation: Orientation,
    source: SourceAspect,
    target_dimension: u32,
) -> Option<(u32, u32)> {
    if !source.is_ready() || target_dimension == 0 {
        return None;
    }

    let other = (target_dimension as u64 * source.video_height as u64
        / source.video_width as u64)
        .clamp(1, u32::MAX as u64) as u32;

    if orientation.swaps_dimensions() {
        Some((other, target_dimension))
    } else {
        Some((target_dimension, other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ORIENTATIONS: [Orientation; 4] = [
        Orientation::Normal,
        Orientation::Rotate90,
        Orientation::Rotate180,
        Orientation::Rotate270,
    ];

    #[test]
    fn test_orientation_normalisation() {
        assert_eq!(Orientation::from_quarter_turns(5), Orientation::Rotate90);
        assert_eq!(Orientation::from_quarter_turns(-1), Orientation::Rotate270);
        assert_eq!(Orientation::from_preference("2"), Orientation::Rotate180);
        assert_eq!(Orientation::from_preference(" 7 "), Orientation::Rotate270);
        assert_eq!(Orientation::from_preference("sideways"), Orientation::Normal);
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Orientation::Normal.rotated_left(), Orientation::Rotate270);
        assert_eq!(Orientation::Rotate270.rotated_right(), Orientation::Normal);
        for o in ALL_ORIENTATIONS {
            assert_eq!(o.rotated_left().rotated_right(), o);
        }
    }

    #[test]
    fn test_no_layout_without_metadata() {
        let viewport = ViewportSize::new(800, 600);
        assert!(compute_layout(Orientation::Normal, SourceAspect::default(), viewport).is_none());
        assert!(compute_layout(Orientation::Normal, SourceAspect::new(0, 480), viewport).is_none());
        assert!(compute_layout(Orientation::Normal, SourceAspect::new(640, 0), viewport).is_none());
    }

    #[test]
    fn test_no_layout_without_viewport() {
        let source = SourceAspect::new(640, 480);
        assert!(compute_layout(Orientation::Normal, source, ViewportSize::new(0, 0)).is_none());
    }

    #[test]
    fn test_landscape_layout() {
        let layout = compute_layout(
            Orientation::Normal,
            SourceAspect::new(1920, 1080),
            ViewportSize::new(400, 800),
        )
        .unwrap();

        assert_eq!(layout.width, 800.0);
        assert_eq!(layout.height, 450.0);
        assert_eq!(layout.element_width, 800.0);
        assert_eq!(layout.element_height, 450.0);
        assert_eq!(layout.offset_top, 0.0);
        assert_eq!(layout.offset_left, 0.0);
        assert_eq!(layout.rotation_degrees, 0);
    }

    #[test]
    fn test_portrait_layout_is_recentred() {
        let layout = compute_layout(
            Orientation::Rotate90,
            SourceAspect::new(1920, 1080),
            ViewportSize::new(800, 450),
        )
        .unwrap();

        assert_eq!(layout.height, 800.0);
        assert_eq!(layout.width, 450.0);
        // element keeps its landscape box and is rotated in place
        assert_eq!(layout.element_width, 800.0);
        assert_eq!(layout.element_height, 450.0);
        assert_eq!(layout.offset_top, 175.0);
        assert_eq!(layout.offset_left, -175.0);
        assert_eq!(layout.rotation_degrees, 90);
        assert_eq!(layout.window_size(), (450, 800));
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        let sources = [
            SourceAspect::new(1920, 1080),
            SourceAspect::new(640, 480),
            SourceAspect::new(1080, 1920),
            SourceAspect::new(333, 777),
        ];
        let viewports = [
            ViewportSize::new(320, 240),
            ViewportSize::new(240, 320),
            ViewportSize::new(1001, 1001),
        ];

        for o in ALL_ORIENTATIONS {
            for source in sources {
                for viewport in viewports {
                    let layout = compute_layout(o, source, viewport).unwrap();
                    assert!(layout.width > 0.0 && layout.height > 0.0);

                    let observed = if o.swaps_dimensions() {
                        layout.width / layout.height
                    } else {
                        layout.height / layout.width
                    };
                    assert!((observed - source.ratio()).abs() < 1e-9);

                    let anchored = if o.swaps_dimensions() {
                        layout.height
                    } else {
                        layout.width
                    };
                    assert_eq!(anchored, viewport.long_side() as f64);
                }
            }
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let source = SourceAspect::new(1280, 720);
        let viewport = ViewportSize::new(640, 360);
        let first = compute_layout(Orientation::Rotate270, source, viewport);
        let second = compute_layout(Orientation::Rotate270, source, viewport);
        assert_eq!(first, second);
    }

    #[test]
    fn test_size_hints_match_snapshot_dimensions() {
        let sources = [
            SourceAspect::new(1920, 1080),
            SourceAspect::new(640, 480),
            SourceAspect::new(1366, 768),
        ];

        for o in ALL_ORIENTATIONS {
            for source in sources {
                let layout = compute_layout(o, source, ViewportSize::new(777, 300)).unwrap();
                for hint in layout.size_hints {
                    let dims = snapshot_dimensions(o, source, hint.label.target_dimension());
                    assert_eq!(Some((hint.width, hint.height)), dims, "{:?} {:?}", o, hint);
                }
            }
        }
    }

    #[test]
    fn test_size_hint_label() {
        let layout = compute_layout(
            Orientation::Normal,
            SourceAspect::new(640, 480),
            ViewportSize::new(320, 240),
        )
        .unwrap();
        assert_eq!(layout.hint(SizeLabel::M).unwrap().to_string(), "M (640x480)");
        assert_eq!(layout.hint(SizeLabel::XL).unwrap().to_string(), "XL (1280x960)");
    }

    #[test]
    fn test_snapshot_dimensions_quarter_turn() {
        let dims = snapshot_dimensions(Orientation::Rotate90, SourceAspect::new(1920, 1080), 640);
        assert_eq!(dims, Some((360, 640)));

        let dims = snapshot_dimensions(Orientation::Rotate180, SourceAspect::new(1920, 1080), 640);
        assert_eq!(dims, Some((640, 360)));
    }

    #[test]
    fn test_snapshot_dimensions_truncate() {
        // 320 * 480 / 700 = 219.43
        let dims = snapshot_dimensions(Orientation::Normal, SourceAspect::new(700, 480), 320);
        assert_eq!(dims, Some((320, 219)));
        assert!(snapshot_dimensions(Orientation::Normal, SourceAspect::default(), 320).is_none());
    }
}
