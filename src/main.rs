use playlist_transcripts::config::log_file_from_env;
use playlist_transcripts::{Downloader, Error, RunConfig, YouTubeClient, logging, run_with_shutdown};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let log_file = log_file_from_env();
    let _guard = match logging::init(&log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("✗ Could not open log file {}: {e}", log_file.display());
            return;
        }
    };

    let config = match RunConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(category = %e.category(), "✗ Error: {e}");
            if let Error::Config { key: Some(key), .. } = &e
                && key.starts_with("PROXY_")
            {
                tracing::info!("  Required: PROXY_USER and PROXY_PASS in .env file");
                tracing::info!("  Or set USE_PROXY=false to run without proxy");
            }
            return;
        }
    };

    let client = match YouTubeClient::new(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("✗ Error configuring HTTP client: {e}");
            return;
        }
    };

    let downloader = Downloader::new(config, client.clone(), client);
    match run_with_shutdown(&downloader).await {
        Ok(report) if report.interrupted => {
            tracing::warn!("Process interrupted by user. Exiting gracefully...");
        }
        Ok(_) => {}
        Err(e) if e.is_fatal() => {
            tracing::error!(category = %e.category(), "✗ Run aborted: {e}");
        }
        Err(e) => {
            tracing::error!(category = %e.category(), "✗ Unexpected error: {e}");
        }
    }
}
