// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot size presets
///
/// Each preset names the pixel count of the snapshot's governing edge: the
/// width when the orientation is upright or upside down, the height when the
/// feed is turned a quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SizeLabel {
    /// Small (320 px)
    S,
    /// Medium (640 px, default)
    #[default]
    M,
    /// Large (960 px)
    L,
    /// Extra large (1280 px)
    XL,
}

impl SizeLabel {
    /// All presets in display order
    pub const ALL: [SizeLabel; 4] = [SizeLabel::S, SizeLabel::M, SizeLabel::L, SizeLabel::XL];

    /// Short name shown in the size list
    pub fn display_name(&self) -> &'static str {
        match self {
            SizeLabel::S => "S",
            SizeLabel::M => "M",
            SizeLabel::L => "L",
            SizeLabel::XL => "XL",
        }
    }

    /// Target pixel count of the governing edge
    pub fn target_dimension(&self) -> u32 {
        match self {
            SizeLabel::S => 320,
            SizeLabel::M => 640,
            SizeLabel::L => 960,
            SizeLabel::XL => 1280,
        }
    }

    /// Parse a preset from its display name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.display_name().eq_ignore_ascii_case(name.trim()))
    }

    /// The preset paired with its target dimension
    pub fn option(&self) -> SizeOption {
        SizeOption {
            label: *self,
            target_dimension: self.target_dimension(),
        }
    }

    /// Next preset, wrapping from XL back to S
    pub fn next(&self) -> Self {
        let index = Self::ALL.iter().position(|l| l == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A size preset together with its pixel target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeOption {
    pub label: SizeLabel,
    pub target_dimension: u32,
}

/// The fixed size table, in display order
pub fn size_options() -> [SizeOption; 4] {
    SizeLabel::ALL.map(|label| label.option())
}

/// Ideal capture width requested from the host (it may grant less)
pub const IDEAL_CAPTURE_WIDTH: u32 = 1920;

/// Ideal capture height requested from the host (it may grant less)
pub const IDEAL_CAPTURE_HEIGHT: u32 = 1080;

/// Preference key under which the orientation is persisted
pub const ORIENTATION_PREFERENCE_KEY: &str = "orientation";

/// Application directory name used for config, preferences and photos
pub const APP_DIR_NAME: &str = "board-camera";

/// Number of memory-mapped buffers for V4L2 streaming
pub const V4L2_BUFFER_COUNT: u32 = 4;

/// How long the CLI waits for the first frames before capturing
pub const CAMERA_WARMUP: Duration = Duration::from_millis(500);

/// Give up on a camera that delivers no frame within this time
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal host input poll interval (~60 Hz redraw)
pub const TERMINAL_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Label used for devices the host reports without a name
pub fn placeholder_label(index: usize) -> String {
    format!("Camera {}", index + 1)
}
