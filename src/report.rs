//! Runs the fetch → analyse → aggregate pipeline for one video and assembles
//! the response payload.

use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::analyzer::analyze_comments;
use crate::category::resolve_category;
use crate::error::ErrorResponse;
use crate::fetcher::{fetch_comments, FetchOptions};
use crate::models::{AnalyzedComment, Theme};
use crate::nlp::LanguageService;
use crate::themes::extract_themes;
use crate::youtube::VideoPlatform;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentReport {
    #[schema(example = "Successfully fetched and analyzed 42 comments.")]
    pub message: String,
    #[schema(example = "Science & Technology")]
    pub category: String,
    pub comments: Vec<AnalyzedComment>,
    pub themes: Vec<Theme>,
    /// Number of comments whose analysis failed, when any did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_errors: Option<usize>,
}

impl CommentReport {
    pub fn assemble(category: String, comments: Vec<AnalyzedComment>, themes: Vec<Theme>) -> Self {
        let failed = comments.iter().filter(|c| c.error.is_some()).count();
        let message = if failed == 0 {
            format!("Successfully fetched and analyzed {} comments.", comments.len())
        } else {
            format!(
                "Fetched {} comments; analysis failed for {} of them.",
                comments.len(),
                failed
            )
        };

        Self {
            message,
            category,
            comments,
            themes,
            analysis_errors: (failed > 0).then_some(failed),
        }
    }
}

/// Collaborators and tuning for one pipeline run.
#[derive(Clone)]
pub struct Pipeline {
    pub platform: Arc<dyn VideoPlatform>,
    pub language: Arc<dyn LanguageService>,
    pub fetch: FetchOptions,
    pub analysis_concurrency: Option<usize>,
}

impl Pipeline {
    pub async fn run(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentReport, ErrorResponse> {
        let (category, fetched) = tokio::join!(
            resolve_category(self.platform.as_ref(), video_id),
            fetch_comments(self.platform.as_ref(), video_id, page_token, &self.fetch)
        );
        tracing::info!("🏷️ Category for {}: {}", video_id, category);

        let comments = match fetched {
            Ok(comments) => comments,
            Err(e) => return Err(ErrorResponse::new(e.into(), category)),
        };

        let analyzed =
            analyze_comments(self.language.clone(), &comments, self.analysis_concurrency).await;
        let themes = extract_themes(&analyzed);
        tracing::info!("🧩 Extracted {} themes for {}", themes.len(), video_id);

        Ok(CommentReport::assemble(category, analyzed, themes))
    }
}
