//! YouTube Data API v3 client.
//!
//! Only two endpoints are used: `commentThreads` (paged comment listing) and
//! `videos` (per-video snippet, for the category id). Both are keyed by an API
//! key, no OAuth involved.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The API answered with a non-success status.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        details: Option<Value>,
    },
    #[error("YouTube API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected YouTube API response: {0}")]
    Decode(String),
}

/// One page of the comment listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentPage {
    /// Raw text per returned item; `None` when the item had no usable text
    pub texts: Vec<Option<String>>,
    pub next_page_token: Option<String>,
}

impl CommentPage {
    pub fn item_count(&self) -> usize {
        self.texts.len()
    }
}

/// Video platform operations the pipeline depends on.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    async fn list_comments(
        &self,
        video_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<CommentPage, PlatformError>;

    /// Numeric category code of the video, `None` if the video was not found.
    async fn video_category_id(&self, video_id: &str) -> Result<Option<String>, PlatformError>;
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: Option<CommentThreadSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: Option<TopLevelComment>,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: Option<CommentSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: Option<String>,
}

impl CommentThread {
    fn into_text(self) -> Option<String> {
        self.snippet?.top_level_comment?.snippet?.text_display
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    snippet: Option<VideoSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Option<Value>,
}

// ============================================================================
// HTTP client
// ============================================================================

pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T, PlatformError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }
}

/// Build an `Upstream` error from a Google-style error body, falling back to
/// the raw body when it is not the usual envelope.
fn upstream_error(status: u16, body: &str) -> PlatformError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => PlatformError::Upstream {
            status,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| format!("YouTube API returned status {}", status)),
            details: envelope.error.errors,
        },
        Err(_) => PlatformError::Upstream {
            status,
            message: format!("YouTube API returned status {}", status),
            details: (!body.is_empty()).then(|| Value::String(body.to_string())),
        },
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn list_comments(
        &self,
        video_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<CommentPage, PlatformError> {
        let max_results = max_results.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
            ("textFormat", "plainText"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response: CommentThreadListResponse = self.get_json("commentThreads", &query).await?;
        Ok(CommentPage {
            texts: response.items.into_iter().map(CommentThread::into_text).collect(),
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn video_category_id(&self, video_id: &str) -> Result<Option<String>, PlatformError> {
        let response: VideoListResponse = self
            .get_json("videos", &[("part", "snippet"), ("id", video_id)])
            .await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|video| video.snippet)
            .and_then(|snippet| snippet.category_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_comments_parses_page() {
        let mut server = Server::new_async().await;
        let body = json!({
            "nextPageToken": "CURSOR2",
            "items": [
                { "snippet": { "topLevelComment": { "snippet": { "textDisplay": "Great video" } } } },
                { "snippet": { "topLevelComment": { "snippet": { "textDisplay": "" } } } },
                { "snippet": {} }
            ]
        });
        let mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("videoId".into(), "vid123".into()),
                Matcher::UrlEncoded("maxResults".into(), "100".into()),
                Matcher::UrlEncoded("pageToken".into(), "CURSOR1".into()),
                Matcher::UrlEncoded("key".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = YouTubeClient::new(reqwest::Client::new(), server.url(), "secret");
        let page = client.list_comments("vid123", Some("CURSOR1"), 100).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.item_count(), 3);
        assert_eq!(page.texts[0].as_deref(), Some("Great video"));
        assert_eq!(page.texts[1].as_deref(), Some(""));
        assert_eq!(page.texts[2], None);
        assert_eq!(page.next_page_token.as_deref(), Some("CURSOR2"));
    }

    #[tokio::test]
    async fn test_list_comments_forwards_api_error() {
        let mut server = Server::new_async().await;
        let body = json!({
            "error": {
                "code": 403,
                "message": "The video has disabled comments.",
                "errors": [{ "reason": "commentsDisabled" }]
            }
        });
        server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = YouTubeClient::new(reqwest::Client::new(), server.url(), "secret");
        let err = client.list_comments("vid123", None, 100).await.unwrap_err();

        match err {
            PlatformError::Upstream { status, message, details } => {
                assert_eq!(status, 403);
                assert_eq!(message, "The video has disabled comments.");
                assert_eq!(details, Some(json!([{ "reason": "commentsDisabled" }])));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_video_category_id() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "vid123".into()))
            .with_status(200)
            .with_body(json!({ "items": [{ "snippet": { "categoryId": "28" } }] }).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), "missing".into()))
            .with_status(200)
            .with_body(json!({ "items": [] }).to_string())
            .create_async()
            .await;

        let client = YouTubeClient::new(reqwest::Client::new(), server.url(), "secret");
        assert_eq!(client.video_category_id("vid123").await.unwrap().as_deref(), Some("28"));
        assert_eq!(client.video_category_id("missing").await.unwrap(), None);
    }

    #[test]
    fn test_upstream_error_with_plain_body() {
        match upstream_error(502, "Bad Gateway") {
            PlatformError::Upstream { status, message, details } => {
                assert_eq!(status, 502);
                assert_eq!(message, "YouTube API returned status 502");
                assert_eq!(details, Some(Value::String("Bad Gateway".into())));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
