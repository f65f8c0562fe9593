use dotenv::dotenv;
use std::sync::Arc;

use comment_insights::api::{self, AppState};
use comment_insights::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::from_config(&config).await?);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
