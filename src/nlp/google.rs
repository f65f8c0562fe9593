//! Google Cloud Natural Language API (v1) client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::credentials::TokenProvider;
use super::{LanguageError, LanguageService};
use crate::models::{Entity, SentimentScore};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    doc_type: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentResponse {
    #[serde(default)]
    document_sentiment: WireSentiment,
}

// Zero-valued fields are omitted from API responses.
#[derive(Debug, Default, Deserialize)]
struct WireSentiment {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    magnitude: f64,
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub struct GoogleLanguageClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenProvider>,
}

impl GoogleLanguageClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    async fn annotate<T>(&self, method: &str, text: &str) -> Result<T, LanguageError>
    where
        T: serde::de::DeserializeOwned,
    {
        let token = self.tokens.access_token().await?;
        let body = AnalyzeRequest {
            document: Document {
                doc_type: "PLAIN_TEXT",
                content: text,
            },
            encoding_type: "UTF8",
        };

        let response = self
            .http
            .post(format!("{}/documents:{}", self.base_url, method))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(LanguageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LanguageError::Decode(e.to_string()))
    }
}

#[async_trait]
impl LanguageService for GoogleLanguageClient {
    async fn analyze_sentiment(&self, text: &str) -> Result<SentimentScore, LanguageError> {
        let response: SentimentResponse = self.annotate("analyzeSentiment", text).await?;
        let sentiment = response.document_sentiment;
        Ok(SentimentScore::new(sentiment.score, sentiment.magnitude))
    }

    async fn analyze_entities(&self, text: &str) -> Result<Vec<Entity>, LanguageError> {
        let response: EntitiesResponse = self.annotate("analyzeEntities", text).await?;
        Ok(response.entities)
    }
}
