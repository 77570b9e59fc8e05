// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based widget host
//!
//! Renders the rotated camera preview to the terminal using Unicode
//! half-block characters for improved vertical resolution. Each terminal
//! cell counts as one pixel wide and two pixels tall, which is the viewport
//! the session lays out against.

use crate::backends::camera::v4l2::V4l2Host;
use crate::backends::camera::{CameraFrame, get_default_host};
use crate::config::{self, Config, PREFERENCES_FILE_NAME};
use crate::constants::TERMINAL_POLL_INTERVAL;
use crate::errors::CameraError;
use crate::geometry::{LayoutResult, Orientation, ViewportSize};
use crate::host::{ImageObject, WidgetHost};
use crate::pipelines::photo::PhotoPipeline;
use crate::session::{CameraSession, DisplayState};
use crate::storage::{FileImageSink, JsonPreferenceStore};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

/// Widget host backed by the terminal window
///
/// The terminal cannot be resized programmatically, so resize requests are
/// only recorded and shown in the status bar. Emitted images are saved to
/// the photo directory.
#[derive(Debug)]
pub struct TerminalHost {
    viewport: Mutex<ViewportSize>,
    requested: Mutex<Option<(u32, u32)>>,
    sink: FileImageSink,
}

impl TerminalHost {
    pub fn new(photo_dir: impl Into<PathBuf>, viewport: ViewportSize) -> Self {
        Self {
            viewport: Mutex::new(viewport),
            requested: Mutex::new(None),
            sink: FileImageSink::new(photo_dir, viewport),
        }
    }

    /// Track the terminal size; returns whether it changed
    pub fn set_viewport(&self, viewport: ViewportSize) -> bool {
        let mut current = self.viewport.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = *current != viewport;
        *current = viewport;
        changed
    }

    /// Last window size the session asked for
    pub fn requested_size(&self) -> Option<(u32, u32)> {
        *self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Most recently saved snapshot
    pub fn last_saved(&self) -> Option<PathBuf> {
        self.sink.saved().pop()
    }
}

impl WidgetHost for TerminalHost {
    fn viewport(&self) -> ViewportSize {
        *self.viewport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resize(&self, width: u32, height: u32) {
        *self.requested.lock().unwrap_or_else(PoisonError::into_inner) = Some((width, height));
    }

    fn add_object(&self, object: ImageObject) {
        self.sink.add_object(object);
    }
}

/// Run the terminal camera viewer
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = runtime.block_on(run_app(&mut terminal, config));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Preview area in half-block pixels, leaving the status line out
fn preview_viewport(width: u16, height: u16) -> ViewportSize {
    ViewportSize::new(width as u32, height.saturating_sub(1) as u32 * 2)
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let size = terminal.size()?;
    let widget = TerminalHost::new(&config.photo_dir, preview_viewport(size.width, size.height));
    let preferences = JsonPreferenceStore::new(
        config::preferences_path().unwrap_or_else(|| PathBuf::from(PREFERENCES_FILE_NAME)),
    );

    let host = Arc::new(get_default_host());
    let mut session = CameraSession::new(host, preferences, widget)
        .with_pipeline(PhotoPipeline::with_quality(config.jpeg_quality))
        .with_size(config.default_size)
        .with_ideal_resolution(
            config.ideal_resolution.width,
            config.ideal_resolution.height,
        );

    let mut status_message = match session.start().await {
        Ok(status) => {
            info!(camera = %status.label, "Terminal viewer started");
            String::new()
        }
        Err(e) => {
            error!(error = %e, "Failed to start camera");
            format!("Error: {}", e)
        }
    };
    let mut show_help = false;

    loop {
        session.poll_metadata();

        let mut viewport = None;
        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            viewport = Some(preview_viewport(area.width, area.height));

            let preview = PreviewWidget {
                frame: session.preview_frame(),
                layout: session.layout(),
                orientation: session.orientation(),
                state: session.display_state(),
            };
            f.render_widget(&preview, camera_area);

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let message = if show_help {
                HELP_MESSAGE.to_string()
            } else if status_message.is_empty() {
                build_status_message(&session)
            } else {
                status_message.clone()
            };
            f.render_widget(StatusBar { message: &message }, status_area);
        })?;

        if let Some(viewport) = viewport
            && session.widget().set_viewport(viewport)
        {
            session.on_viewport_resize();
        }

        // Handle input with timeout for frame updates
        if !event::poll(TERMINAL_POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Ctrl+C to quit
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            break;
        }

        show_help = false;
        status_message.clear();
        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Char('h') => show_help = true,
            KeyCode::Left | KeyCode::Char('[') => {
                session.rotate_left().await;
            }
            KeyCode::Right | KeyCode::Char(']') => {
                session.rotate_right().await;
            }
            KeyCode::Char('z') => {
                let next = session.size().next();
                session.select_size(next);
            }
            KeyCode::Char(' ') => session.toggle_playback(),
            KeyCode::Char('s') => {
                if let Err(e) = switch_camera(&mut session).await {
                    status_message = format!("Error: {}", e);
                }
            }
            KeyCode::Char('r') => {
                if let Err(e) = session.refresh_devices().await {
                    status_message = format!("Error: {}", e);
                }
            }
            KeyCode::Char('p') => match session.snapshot().await {
                Ok(Some(encoded)) => {
                    status_message = match session.widget().last_saved() {
                        Some(path) => format!(
                            "Saved {}x{}: {}",
                            encoded.width,
                            encoded.height,
                            path.display()
                        ),
                        None => "Snapshot could not be saved".to_string(),
                    };
                }
                Ok(None) => status_message = "Waiting for camera...".to_string(),
                Err(e) => {
                    error!(error = %e, "Failed to take snapshot");
                    status_message = format!("Error: {}", e);
                }
            },
            _ => {}
        }
    }

    session.stop();
    Ok(())
}

type TerminalSession = CameraSession<V4l2Host, JsonPreferenceStore, TerminalHost>;

/// Move to the next camera in the list, re-enumerating first
async fn switch_camera(session: &mut TerminalSession) -> Result<(), CameraError> {
    session.refresh_devices().await?;
    let entries = session.camera_entries();
    if entries.len() < 2 {
        return Ok(());
    }
    let current = entries.iter().position(|e| e.selected).unwrap_or(0);
    let next = &entries[(current + 1) % entries.len()];
    session.select_camera(&next.label).await?;
    Ok(())
}

const HELP_MESSAGE: &str = "[/←: Rotate left | ]/→: Rotate right | z: Size | s: Switch camera | \
                            space: Pause | p: Snapshot | r: Rescan | q/Ctrl+C: Quit";

fn build_status_message(session: &TerminalSession) -> String {
    let camera = match session.display_state() {
        DisplayState::Streaming => session.selected_label().unwrap_or("camera").to_string(),
        DisplayState::NoCamera => "No camera".to_string(),
        DisplayState::Unavailable => "Camera unavailable".to_string(),
        DisplayState::Idle => "Starting".to_string(),
    };
    let size = session
        .size_entries()
        .into_iter()
        .find(|entry| entry.selected)
        .map(|entry| entry.text)
        .unwrap_or_else(|| session.size().to_string());

    let mut msg = format!("{} | {} | {}", camera, session.orientation(), size);
    if !session.is_playing() {
        msg.push_str(" | paused");
    }
    if let Some((w, h)) = session.widget().requested_size() {
        msg.push_str(&format!(" | window {}x{}", w, h));
    }
    msg.push_str(" | 'h' help");
    msg
}

/// Map a normalised point of the rotated preview back into the source frame
///
/// Orientation turns the source clockwise, so the top-left of a quarter-turn
/// preview shows the source's bottom-left.
pub fn rotated_source_point(orientation: Orientation, u: f64, v: f64) -> (f64, f64) {
    match orientation {
        Orientation::Normal => (u, v),
        Orientation::Rotate90 => (v, 1.0 - u),
        Orientation::Rotate180 => (1.0 - u, 1.0 - v),
        Orientation::Rotate270 => (1.0 - v, u),
    }
}

/// Widget that renders the rotated preview using half-block characters
struct PreviewWidget {
    frame: Option<CameraFrame>,
    layout: Option<LayoutResult>,
    orientation: Orientation,
    state: DisplayState,
}

impl PreviewWidget {
    fn placeholder(&self) -> &'static str {
        match self.state {
            DisplayState::NoCamera => "No camera",
            DisplayState::Unavailable => "Camera unavailable",
            _ => "Waiting for camera...",
        }
    }

    fn sample(&self, frame: &CameraFrame, u: f64, v: f64) -> Color {
        let (su, sv) = rotated_source_point(self.orientation, u, v);
        let x = (su * frame.width as f64) as u32;
        let y = (sv * frame.height as f64) as u32;
        let (r, g, b) = frame.pixel_rgb(x, y);
        Color::Rgb(r, g, b)
    }
}

impl Widget for &PreviewWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (Some(frame), Some(layout)) = (&self.frame, &self.layout) else {
            let msg = self.placeholder();
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        // The layout is anchored on the long side; shrink it to fit since
        // the terminal cannot follow resize requests
        let avail_w = area.width as f64;
        let avail_h = (area.height as f64) * 2.0;
        let scale = (avail_w / layout.width)
            .min(avail_h / layout.height)
            .min(1.0);
        let display_width = (layout.width * scale) as u16;
        let display_height = (layout.height * scale / 2.0) as u16;
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;
        let pixel_rows = display_height as f64 * 2.0;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                let u = (tx as f64 + 0.5) / display_width as f64;
                let v_top = (ty as f64 * 2.0 + 0.5) / pixel_rows;
                let v_bottom = (ty as f64 * 2.0 + 1.5) / pixel_rows;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(self.sample(frame, u, v_top));
                    cell.set_bg(self.sample(frame, u, v_bottom));
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}
