//! YouTube Transcript - A Rust CLI tool for fetching YouTube video transcripts
//!
//! This library retrieves transcripts through a third-party transcript API,
//! absorbing transient upstream failures (rate limiting, server errors,
//! malformed responses) with bounded retries, a rotating client identity and
//! a managed short-lived bearer credential.

pub mod cli;
pub mod config;
pub mod fetcher;
pub mod output;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use fetcher::{FetchError, FetcherConfig, TranscriptFetcher, TranscriptPayload};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
