use std::time::Duration;
use tokio::time::sleep;

use crate::models::Comment;
use crate::youtube::{PlatformError, VideoPlatform};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// `maxResults` sent with each page request
    pub page_size: u32,
    /// Stop paging once this many items have been fetched
    pub comment_cap: usize,
    /// Pause between page requests (self-imposed rate limit)
    pub page_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            comment_cap: 500,
            page_delay: Duration::from_millis(200),
        }
    }
}

/// Pages through the comment listing of `video_id` until the platform runs
/// out of pages or `comment_cap` items have been fetched.
///
/// A failed page aborts the whole fetch; comments from earlier pages are
/// dropped. The cap is checked after each page, so the result can exceed it
/// by at most one page.
pub async fn fetch_comments(
    platform: &dyn VideoPlatform,
    video_id: &str,
    start_token: Option<&str>,
    options: &FetchOptions,
) -> Result<Vec<Comment>, PlatformError> {
    let mut comments = Vec::new();
    let mut fetched = 0usize;
    let mut page_token = start_token.map(str::to_string);
    let mut page_number = 1u32;

    loop {
        tracing::debug!("📥 Fetching comment page {} for {}", page_number, video_id);
        let page = platform
            .list_comments(video_id, page_token.as_deref(), options.page_size)
            .await?;

        fetched += page.item_count();
        comments.extend(
            page.texts
                .into_iter()
                .flatten()
                .filter(|text| !text.is_empty())
                .map(Comment::new),
        );

        page_token = page.next_page_token;
        if page_token.is_none() || fetched >= options.comment_cap {
            break;
        }

        page_number += 1;
        sleep(options.page_delay).await;
    }

    tracing::info!(
        "📥 Fetched {} comments for {} across {} page(s)",
        comments.len(),
        video_id,
        page_number
    );
    Ok(comments)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::youtube::CommentPage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory platform serving a fixed script of page results.
    pub(crate) struct ScriptedPlatform {
        pub pages: Mutex<Vec<Result<CommentPage, PlatformError>>>,
        pub endless: Option<usize>,
        pub category: Option<String>,
        pub calls: AtomicUsize,
        pub seen_tokens: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedPlatform {
        pub(crate) fn with_pages(pages: Vec<Result<CommentPage, PlatformError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                endless: None,
                category: Some("28".to_string()),
                calls: AtomicUsize::new(0),
                seen_tokens: Mutex::new(Vec::new()),
            }
        }

        /// Every page holds `per_page` comments and carries a next cursor.
        pub(crate) fn endless(per_page: usize) -> Self {
            let mut platform = Self::with_pages(Vec::new());
            platform.endless = Some(per_page);
            platform
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn page(texts: &[&str], next: Option<&str>) -> CommentPage {
        CommentPage {
            texts: texts.iter().map(|t| Some(t.to_string())).collect(),
            next_page_token: next.map(str::to_string),
        }
    }

    pub(crate) fn forbidden() -> PlatformError {
        PlatformError::Upstream {
            status: 403,
            message: "The video has disabled comments.".to_string(),
            details: None,
        }
    }

    #[async_trait]
    impl VideoPlatform for ScriptedPlatform {
        async fn list_comments(
            &self,
            _video_id: &str,
            page_token: Option<&str>,
            max_results: u32,
        ) -> Result<CommentPage, PlatformError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_tokens
                .lock()
                .unwrap()
                .push(page_token.map(str::to_string));
            if let Some(per_page) = self.endless {
                let per_page = per_page.min(max_results as usize);
                return Ok(CommentPage {
                    texts: (0..per_page).map(|i| Some(format!("comment {}-{}", n, i))).collect(),
                    next_page_token: Some(format!("token-{}", n + 1)),
                });
            }
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(CommentPage::default()))
        }

        async fn video_category_id(&self, _video_id: &str) -> Result<Option<String>, PlatformError> {
            Ok(self.category.clone())
        }
    }

    fn fast_options(cap: usize) -> FetchOptions {
        FetchOptions {
            page_size: 100,
            comment_cap: cap,
            page_delay: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn test_follows_cursor_until_exhausted() {
        let platform = ScriptedPlatform::with_pages(vec![
            Ok(page(&["a", "b"], Some("P2"))),
            Ok(page(&["c"], Some("P3"))),
            Ok(page(&["d"], None)),
        ]);

        let comments = fetch_comments(&platform, "vid", None, &fast_options(500)).await.unwrap();

        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d"]);
        assert_eq!(
            *platform.seen_tokens.lock().unwrap(),
            vec![None, Some("P2".to_string()), Some("P3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_starts_from_caller_token() {
        let platform = ScriptedPlatform::with_pages(vec![Ok(page(&["a"], None))]);
        fetch_comments(&platform, "vid", Some("START"), &fast_options(500)).await.unwrap();
        assert_eq!(*platform.seen_tokens.lock().unwrap(), vec![Some("START".to_string())]);
    }

    #[tokio::test]
    async fn test_drops_empty_texts() {
        let mut first = page(&["keep", ""], None);
        first.texts.push(None);
        let platform = ScriptedPlatform::with_pages(vec![Ok(first)]);

        let comments = fetch_comments(&platform, "vid", None, &fast_options(500)).await.unwrap();
        assert_eq!(comments, vec![Comment::new("keep")]);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_not_an_error() {
        let platform = ScriptedPlatform::with_pages(vec![Ok(CommentPage::default())]);
        let comments = fetch_comments(&platform, "vid", None, &fast_options(500)).await.unwrap();
        assert!(comments.is_empty());
        assert_eq!(platform.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stops_within_one_page_of_cap() {
        let platform = ScriptedPlatform::endless(100);
        let comments = fetch_comments(&platform, "vid", None, &fast_options(500)).await.unwrap();
        assert_eq!(comments.len(), 500);
        assert_eq!(platform.call_count(), 5);

        let platform = ScriptedPlatform::endless(30);
        let comments = fetch_comments(&platform, "vid", None, &fast_options(100)).await.unwrap();
        assert!(comments.len() >= 100 && comments.len() < 130);
        assert_eq!(platform.call_count(), 4);
    }

    #[tokio::test]
    async fn test_failed_page_discards_everything() {
        let platform = ScriptedPlatform::with_pages(vec![
            Ok(page(&["a", "b"], Some("P2"))),
            Err(forbidden()),
        ]);

        let err = fetch_comments(&platform, "vid", None, &fast_options(500)).await.unwrap_err();
        assert!(matches!(err, PlatformError::Upstream { status: 403, .. }));
        assert_eq!(platform.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_pages() {
        let platform = ScriptedPlatform::with_pages(vec![
            Ok(page(&["a"], Some("P2"))),
            Ok(page(&["b"], Some("P3"))),
            Ok(page(&["c"], None)),
        ]);
        let options = FetchOptions {
            page_delay: Duration::from_millis(200),
            ..fast_options(500)
        };

        let started = tokio::time::Instant::now();
        fetch_comments(&platform, "vid", None, &options).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(400));
    }
}
