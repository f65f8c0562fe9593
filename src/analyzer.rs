//! Per-comment sentiment and entity enrichment.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::models::{AnalyzedComment, Comment, SentimentScore};
use crate::nlp::LanguageService;

/// Analyse every comment concurrently. The result has one entry per input
/// comment, in input order, and analysis failures are recorded on the
/// affected entry instead of being returned.
///
/// `concurrency` caps the number of comments in flight; `None` launches all
/// of them at once.
pub async fn analyze_comments(
    language: Arc<dyn LanguageService>,
    comments: &[Comment],
    concurrency: Option<usize>,
) -> Vec<AnalyzedComment> {
    let limiter = concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));

    let handles: Vec<_> = comments
        .iter()
        .map(|comment| {
            let language = language.clone();
            let limiter = limiter.clone();
            let text = comment.text.clone();
            tokio::spawn(async move {
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                analyze_one(language.as_ref(), text).await
            })
        })
        .collect();

    let results = join_all(handles).await;

    let analyzed: Vec<AnalyzedComment> = results
        .into_iter()
        .zip(comments)
        .map(|(result, comment)| {
            result.unwrap_or_else(|join_error| {
                tracing::error!("🧠 Comment analysis task failed: {}", join_error);
                AnalyzedComment {
                    text: comment.text.clone(),
                    sentiment: SentimentScore::default(),
                    entities: Vec::new(),
                    error: Some(format!("Analysis failed: {}", join_error)),
                }
            })
        })
        .collect();

    let failed = analyzed.iter().filter(|a| a.error.is_some()).count();
    tracing::info!(
        "🧠 Analyzed {} comments ({} with errors)",
        analyzed.len(),
        failed
    );
    analyzed
}

/// Sentiment and entities for a single text. The two requests run
/// concurrently and neither failure cancels the other.
async fn analyze_one(language: &dyn LanguageService, text: String) -> AnalyzedComment {
    let (sentiment, entities) = tokio::join!(
        language.analyze_sentiment(&text),
        language.analyze_entities(&text)
    );

    let mut error = None;
    let sentiment = sentiment.unwrap_or_else(|e| {
        tracing::warn!("🧠 Sentiment analysis failed: {}", e);
        error = Some(e.to_string());
        SentimentScore::default()
    });
    let entities = entities.unwrap_or_else(|e| {
        tracing::warn!("🧠 Entity analysis failed: {}", e);
        error.get_or_insert_with(|| e.to_string());
        Vec::new()
    });

    AnalyzedComment {
        text,
        sentiment,
        entities,
        error,
    }
}
