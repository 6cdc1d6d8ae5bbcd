use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "yt-transcript",
    about = "Fetch YouTube video transcripts through a third-party transcript API",
    version,
    long_about = "A CLI tool for fetching YouTube video transcripts. Accepts full video URLs \
(youtube.com or youtu.be) or bare 11-character video IDs, and absorbs transient upstream \
failures with bounded retries."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript for a video URL or video ID
    Fetch {
        /// YouTube video URL or 11-character video ID
        #[arg(value_name = "URL_OR_ID")]
        reference: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Override the transcript API base URL
        #[arg(long, value_name = "URL", env = "TRANSCRIPT_API_BASE_URL")]
        api_url: Option<String>,

        /// Override the maximum number of request attempts
        #[arg(long, value_name = "COUNT")]
        max_attempts: Option<u32>,
    },

    /// Inspect or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain transcript text
    Text,
    /// The decoded API payload as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
