use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use youtube_transcript::cli::{Cli, Commands};
use youtube_transcript::config::Config;
use youtube_transcript::fetcher::TranscriptFetcher;
use youtube_transcript::output;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "youtube_transcript=debug,yt_transcript=debug"
    } else {
        "youtube_transcript=info,yt_transcript=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Fetch {
            reference,
            output,
            format,
            api_url,
            max_attempts,
        } => {
            let mut fetcher_config = config.fetcher_config();
            if let Some(url) = api_url {
                fetcher_config.base_url = url;
            }
            if let Some(attempts) = max_attempts {
                fetcher_config.max_attempts = attempts.max(1);
            }

            let fetcher = TranscriptFetcher::new(fetcher_config)?;

            tracing::info!("Fetching transcript for: {}", reference);

            let progress = if cli.quiet {
                None
            } else {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {msg}")
                        .unwrap(),
                );
                spinner.set_message("Fetching transcript...");
                spinner.enable_steady_tick(std::time::Duration::from_millis(100));
                Some(spinner)
            };

            let result = fetcher.fetch(&reference).await;

            if let Some(spinner) = progress {
                spinner.finish_and_clear();
            }

            let payload = result?;

            match output {
                Some(path) => {
                    output::save_to_file(&payload, &path, &format).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&payload, &format)?;
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                // Loading already wrote the default file if none existed
                println!("Configuration file is ready. Edit it to change defaults.");
                config.display();
            }
        }
    }

    Ok(())
}
