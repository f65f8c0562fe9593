use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::Instrument;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::category::UNKNOWN_CATEGORY;
use crate::config::Config;
use crate::error::{AppError, ErrorBody, ErrorResponse};
use crate::fetcher::FetchOptions;
use crate::nlp::credentials::{CredentialSource, TokenProvider, DEFAULT_METADATA_HOST};
use crate::nlp::{GoogleLanguageClient, LanguageService};
use crate::report::{CommentReport, Pipeline};
use crate::youtube::{VideoPlatform, YouTubeClient};

pub const LIVENESS_MESSAGE: &str = "Comment insights service is running.";

#[derive(OpenApi)]
#[openapi(
    paths(root, get_comments),
    components(
        schemas(
            CommentReport,
            ErrorBody,
            crate::models::AnalyzedComment,
            crate::models::SentimentScore,
            crate::models::Entity,
            crate::models::EntityType,
            crate::models::Theme,
            crate::models::SentimentCategory
        )
    ),
    tags(
        (name = "comments", description = "Video comment analysis API")
    )
)]
pub struct ApiDoc;

/// Shared handler state. A missing collaborator means its configuration was
/// absent at startup; requests needing it fail with 500.
pub struct AppState {
    pub platform: Option<Arc<dyn VideoPlatform>>,
    pub language: Option<Arc<dyn LanguageService>>,
    pub fetch: FetchOptions,
    pub analysis_concurrency: Option<usize>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("comment-insights/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let platform: Option<Arc<dyn VideoPlatform>> = match &config.youtube_api_key {
            Some(key) => Some(Arc::new(YouTubeClient::new(
                http.clone(),
                config.youtube_api_base.clone(),
                key.clone(),
            ))),
            None => {
                tracing::warn!("⚠️ YOUTUBE_API_KEY not set; /comments will fail until configured");
                None
            }
        };

        let credentials = match &config.credentials {
            Some(source) => Some(source.clone()),
            None => CredentialSource::probe_metadata_server(&http, DEFAULT_METADATA_HOST).await,
        };
        let language: Option<Arc<dyn LanguageService>> = match &credentials {
            Some(source) => {
                tracing::info!("🔑 Loading language API credentials from {:?}", source);
                let tokens = TokenProvider::from_source(http.clone(), source).await?;
                Some(Arc::new(GoogleLanguageClient::new(
                    http,
                    config.language_api_base.clone(),
                    Arc::new(tokens),
                )))
            }
            None => {
                tracing::warn!("⚠️ No Google Cloud credentials found; /comments will fail until configured");
                None
            }
        };

        Ok(Self {
            platform,
            language,
            fetch: config.fetch.clone(),
            analysis_concurrency: config.analysis_concurrency,
        })
    }

    fn pipeline(&self) -> Result<Pipeline, AppError> {
        Ok(Pipeline {
            platform: self.platform.clone().ok_or(AppError::MissingApiKey)?,
            language: self.language.clone().ok_or(AppError::MissingCredentials)?,
            fetch: self.fetch.clone(),
            analysis_concurrency: self.analysis_concurrency,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CommentsQuery {
    /// Id of the video whose comments are analysed
    pub video_id: Option<String>,
    /// Continuation cursor to start fetching from
    pub page_token: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(root))
        .route("/comments", get(get_comments))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn root() -> &'static str {
    LIVENESS_MESSAGE
}

/// Fetch, analyse and summarise the comments of a video
#[utoipa::path(
    get,
    path = "/comments",
    tag = "comments",
    params(CommentsQuery),
    responses(
        (status = 200, description = "Comments analysed", body = CommentReport),
        (status = 400, description = "videoId missing or query string malformed", body = ErrorBody),
        (status = 500, description = "Server misconfigured or unexpected failure", body = ErrorBody),
        (status = "default", description = "Comment listing failed upstream; status forwarded", body = ErrorBody)
    )
)]
pub async fn get_comments(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CommentsQuery>, QueryRejection>,
) -> Result<Json<CommentReport>, ErrorResponse> {
    let Query(query) = query.map_err(|rejection| AppError::InvalidQuery(rejection.body_text()))?;
    let video_id = query
        .video_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingVideoId)?;
    let pipeline = state.pipeline()?;

    let span = tracing::info_span!("comments", request_id = %Uuid::new_v4(), video_id = %video_id);
    async move {
        tracing::info!("🚀 Analyzing comments");
        let page_token = query.page_token.as_deref().filter(|t| !t.is_empty());
        pipeline.run(&video_id, page_token).await.map(Json)
    }
    .instrument(span)
    .await
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    let body = ErrorResponse::new(AppError::Internal(detail), UNKNOWN_CATEGORY).body();
    tracing::error!("🔥 Handler panicked: {}", body.error);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
