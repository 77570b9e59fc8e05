// SPDX-License-Identifier: GPL-3.0-only

use board_camera::{Config, SizeLabel};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "board-camera")]
#[command(about = "Orientation-aware camera widget for whiteboard hosts")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: ~/.config/board-camera/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run in terminal mode (renders the rotated preview to the terminal)
    Terminal,

    /// List available cameras
    List,

    /// Print the layout for a feed without opening a camera
    Layout {
        /// Quarter turns clockwise (normalised modulo 4)
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        orientation: i64,

        /// Source resolution, e.g. 1920x1080
        #[arg(short, long, value_parser = cli::parse_dimensions)]
        source: (u32, u32),

        /// Viewport size, e.g. 800x600
        #[arg(short, long, value_parser = cli::parse_dimensions)]
        viewport: (u32, u32),
    },

    /// Take a rotated snapshot
    Photo {
        /// Camera label to use (from 'board-camera list'); default camera if omitted
        #[arg(short, long)]
        camera: Option<String>,

        /// Size preset: S, M, L or XL
        #[arg(short, long, value_parser = cli::parse_size)]
        size: Option<SizeLabel>,

        /// Quarter turns clockwise; the saved orientation if omitted
        #[arg(short, long, allow_negative_numbers = true)]
        orientation: Option<i64>,

        /// Output file or directory (default: ~/Pictures/board-camera)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=board_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Terminal) | None => board_camera::terminal::run(config),
        Some(Commands::List) => cli::list_cameras(),
        Some(Commands::Layout {
            orientation,
            source,
            viewport,
        }) => cli::print_layout(orientation, source, viewport),
        Some(Commands::Photo {
            camera,
            size,
            orientation,
            output,
        }) => cli::take_photo(config, camera, size, orientation, output),
    }
}
