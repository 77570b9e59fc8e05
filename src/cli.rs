// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Printing the layout of a rotated feed
//! - Taking rotated snapshots

use board_camera::backends::camera::{CameraHost, get_default_host, registry};
use board_camera::config::{self, Config, PREFERENCES_FILE_NAME};
use board_camera::constants::{
    CAMERA_WARMUP, FRAME_TIMEOUT, ORIENTATION_PREFERENCE_KEY, TERMINAL_POLL_INTERVAL,
};
use board_camera::pipelines::photo::PhotoPipeline;
use board_camera::storage::{FileImageSink, JsonPreferenceStore, MemoryPreferenceStore};
use board_camera::{
    CameraSession, Orientation, PreferenceStore, SizeLabel, SourceAspect, ViewportSize,
    compute_layout,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Parse `WIDTHxHEIGHT`
pub fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width = width
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid width '{}': {}", width, e))?;
    let height = height
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid height '{}': {}", height, e))?;
    Ok((width, height))
}

/// Parse a size preset name
pub fn parse_size(value: &str) -> Result<SizeLabel, String> {
    SizeLabel::from_name(value)
        .ok_or_else(|| format!("unknown size '{}', expected one of S, M, L, XL", value))
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let host = get_default_host();
    if !host.is_available() {
        println!("Camera support is not available on this system.");
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let cameras = rt.block_on(registry::enumerate(&host))?;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.label);
        println!("      Device: {}", camera.id);
    }
    println!();

    Ok(())
}

/// Print the layout and size hints for a feed
pub fn print_layout(
    orientation: i64,
    source: (u32, u32),
    viewport: (u32, u32),
) -> Result<(), Box<dyn std::error::Error>> {
    let orientation = Orientation::from_quarter_turns(orientation);
    let source = SourceAspect::new(source.0, source.1);
    let viewport = ViewportSize::new(viewport.0, viewport.1);

    let Some(layout) = compute_layout(orientation, source, viewport) else {
        println!("No layout: the source or the viewport has no area.");
        return Ok(());
    };

    println!("Orientation: {}", orientation);
    println!("Display:     {:.2} x {:.2}", layout.width, layout.height);
    println!(
        "Element:     {:.2} x {:.2} rotated {}°",
        layout.element_width, layout.element_height, layout.rotation_degrees
    );
    println!(
        "Offset:      top {:.2}, left {:.2}",
        layout.offset_top, layout.offset_left
    );
    println!();
    println!("Sizes:");
    for hint in &layout.size_hints {
        println!("  {}", hint);
    }

    Ok(())
}

/// Take a rotated snapshot with the given camera
pub fn take_photo(
    config: Config,
    camera: Option<String>,
    size: Option<SizeLabel>,
    orientation: Option<i64>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Determine output directory
    let output_dir = match output.as_ref() {
        Some(path) if path.is_dir() => path.clone(),
        Some(path) => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
        None => config.photo_dir.clone(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let saved = rt.block_on(async {
        // An explicit orientation is used for this shot only
        let preferences = MemoryPreferenceStore::new();
        let turns = match orientation {
            Some(turns) => Some(turns.to_string()),
            None => {
                let path = config::preferences_path()
                    .unwrap_or_else(|| PathBuf::from(PREFERENCES_FILE_NAME));
                JsonPreferenceStore::new(path)
                    .preference(ORIENTATION_PREFERENCE_KEY)
                    .await
            }
        };
        if let Some(turns) = turns {
            preferences
                .set_preference(ORIENTATION_PREFERENCE_KEY, turns)
                .await?;
        }

        let sink = FileImageSink::new(&output_dir, config.initial_viewport);
        let mut session = CameraSession::new(Arc::new(get_default_host()), preferences, sink)
            .with_pipeline(PhotoPipeline::with_quality(config.jpeg_quality))
            .with_size(size.unwrap_or(config.default_size))
            .with_ideal_resolution(
                config.ideal_resolution.width,
                config.ideal_resolution.height,
            );

        let status = session.start().await?;
        let label = match camera {
            Some(label) if label != status.label => session.select_camera(&label).await?.label,
            _ => status.label,
        };
        println!("Using camera: {}", label);

        // Wait for frames to stabilize (camera warm-up)
        let start = Instant::now();
        while start.elapsed() < FRAME_TIMEOUT {
            session.poll_metadata();
            if session.preview_frame().is_some() && start.elapsed() > CAMERA_WARMUP {
                break;
            }
            tokio::time::sleep(TERMINAL_POLL_INTERVAL).await;
        }

        println!("Capturing...");
        let encoded = session
            .snapshot()
            .await?
            .ok_or("Camera did not report its resolution in time")?;
        println!(
            "Snapshot: {}x{} ({}, {})",
            encoded.width,
            encoded.height,
            session.orientation(),
            session.size()
        );
        session.stop();

        let saved = session
            .widget()
            .saved()
            .pop()
            .ok_or("Failed to save snapshot")?;
        Ok::<_, Box<dyn std::error::Error>>(saved)
    })?;

    // If user specified a specific filename, rename the file
    if let Some(user_path) = output
        && !user_path.is_dir()
    {
        std::fs::rename(&saved, &user_path)?;
        println!("Photo saved: {}", user_path.display());
        return Ok(());
    }

    println!("Photo saved: {}", saved.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_dimensions("640X480"), Ok((640, 480)));
        assert!(parse_dimensions("1920").is_err());
        assert!(parse_dimensions("axb").is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("xl"), Ok(SizeLabel::XL));
        assert!(parse_size("XXL").is_err());
    }
}
