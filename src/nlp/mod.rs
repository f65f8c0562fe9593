//! Natural-language analysis backend.

pub mod credentials;
pub mod google;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Entity, SentimentScore};
use credentials::CredentialsError;

pub use google::GoogleLanguageClient;

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("Language API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Language API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Language API authentication failed: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("Unexpected Language API response: {0}")]
    Decode(String),
}

/// Document-level sentiment and entity analysis of plain text.
#[async_trait]
pub trait LanguageService: Send + Sync {
    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentScore, LanguageError>;

    async fn analyze_entities(&self, text: &str) -> Result<Vec<Entity>, LanguageError>;
}
