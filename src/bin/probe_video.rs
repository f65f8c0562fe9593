//! Runs the comment pipeline once for a single video and prints the payload.
//!
//! Usage: probe-video <videoId> [pageToken]

use anyhow::{bail, Context, Result};
use dotenv::dotenv;

use comment_insights::api::AppState;
use comment_insights::config::Config;
use comment_insights::error::AppError;
use comment_insights::report::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(video_id) = args.next() else {
        bail!("usage: probe-video <videoId> [pageToken]");
    };
    let page_token = args.next();

    let config = Config::from_env()?;
    let state = AppState::from_config(&config).await?;
    let pipeline = Pipeline {
        platform: state.platform.context(AppError::MissingApiKey.to_string())?,
        language: state.language.context(AppError::MissingCredentials.to_string())?,
        fetch: state.fetch,
        analysis_concurrency: state.analysis_concurrency,
    };

    println!("🔎 Probing comments for {}...", video_id);
    match pipeline.run(&video_id, page_token.as_deref()).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(failure) => {
            println!("{}", serde_json::to_string_pretty(&failure.body())?);
            bail!("pipeline failed with status {}", failure.error.status())
        }
    }
}
