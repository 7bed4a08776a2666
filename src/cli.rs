use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hlsforge")]
#[command(author, version, about = "On-the-fly HLS packaging of MP4 sources")]
pub struct Cli {
    /// Path to config file
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
    /// Start the HLS server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Read the metadata of a source and list its tracks
    Probe {
        /// Local path or http(s) URL of the source
        #[arg(required = true)]
        source: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Segment a source and print its variant playlist
    Segments {
        /// Local path or http(s) URL of the source
        #[arg(required = true)]
        source: String,

        /// Target segment length in milliseconds (overrides config)
        #[arg(short, long)]
        length: Option<u64>,

        /// 1-based video track index (defaults to the first video track)
        #[arg(long)]
        video: Option<u32>,

        /// 1-based audio track index (defaults to the first audio track)
        #[arg(long)]
        audio: Option<u32>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
