use clap::{Parser, Subcommand};
use hc_core::config::MuxerVariant;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hlscast")]
#[command(author, version, about = "Live Low-Latency HLS muxer and server")]
pub struct Cli {
    /// Path to config file (TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the muxer, the placeholder feeder and the HTTP server
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory where segments and playlists are written
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Number of segments kept in the playlist
        #[arg(long)]
        segment_count: Option<usize>,

        /// Minimum segment duration in seconds
        #[arg(long)]
        segment_duration: Option<f64>,

        /// Muxer variant (fmp4 or low-latency)
        #[arg(long)]
        variant: Option<MuxerVariant>,

        /// Do not start the placeholder frame feeder
        #[arg(long)]
        no_feeder: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
