//! Capburn CLI — Command-line interface for caption burn-in exports.
//!
//! Usage:
//!   capburn burn <VIDEO> <CAPTIONS>     Burn captions into a video
//!   capburn convert <CAPTIONS>          Convert captions to SRT/VTT/TXT
//!   capburn shift <CAPTIONS> <DELTA>    Shift all caption timestamps
//!   capburn validate <CAPTIONS>         Validate a caption document
//!   capburn check                       Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "capburn",
    about = "Word-level caption burn-in for video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Burn captions into a video file
    Burn {
        /// Source video file
        video: PathBuf,

        /// Caption document (captions.json)
        captions: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output resolution: 720p or 1080p
        #[arg(long, default_value = "1080p")]
        resolution: String,

        /// Output frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Video bitrate in kbit/s (default depends on resolution)
        #[arg(long)]
        video_bitrate: Option<u32>,

        /// Skip the source audio track
        #[arg(long)]
        no_audio: bool,

        /// Font file to render captions with (default: system lookup)
        #[arg(long)]
        font: Option<PathBuf>,

        /// Style document overriding the built-in defaults
        #[arg(long)]
        style: Option<PathBuf>,

        /// Pace the frame loop at the output rate instead of free-running
        #[arg(long)]
        realtime: bool,
    },

    /// Convert a caption document to a subtitle file
    Convert {
        /// Caption document (captions.json)
        captions: PathBuf,

        /// Output file; format from extension (.srt, .vtt, .txt)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Shift every caption timestamp by a signed number of seconds
    Shift {
        /// Caption document (captions.json)
        captions: PathBuf,

        /// Offset in seconds (negative shifts earlier, floors at zero)
        #[arg(allow_hyphen_values = true)]
        delta_secs: f64,

        /// Output file (default: rewrite in place)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a caption document
    Validate {
        /// Caption document (captions.json)
        captions: PathBuf,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    capburn_common::logging::init_logging(&capburn_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Burn {
            video,
            captions,
            output,
            resolution,
            fps,
            video_bitrate,
            no_audio,
            font,
            style,
            realtime,
        } => {
            commands::burn::run(
                video,
                captions,
                output,
                resolution,
                fps,
                video_bitrate,
                !no_audio,
                font,
                style,
                realtime,
            )
            .await
        }
        Commands::Convert { captions, output } => commands::convert::run(captions, output),
        Commands::Shift {
            captions,
            delta_secs,
            output,
        } => commands::shift::run(captions, delta_secs, output),
        Commands::Validate { captions } => commands::validate::run(captions),
        Commands::Check => commands::check::run(),
    }
}
