//! Video category lookup.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::youtube::{PlatformError, VideoPlatform};

pub const UNKNOWN_CATEGORY: &str = "Unknown";
pub const CATEGORY_ERROR: &str = "Error fetching category";

/// YouTube video category ids (videoCategories.list, region US).
static CATEGORY_LABELS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    vec![
        ("1", "Film & Animation"),
        ("2", "Autos & Vehicles"),
        ("10", "Music"),
        ("15", "Pets & Animals"),
        ("17", "Sports"),
        ("18", "Short Movies"),
        ("19", "Travel & Events"),
        ("20", "Gaming"),
        ("21", "Videoblogging"),
        ("22", "People & Blogs"),
        ("23", "Comedy"),
        ("24", "Entertainment"),
        ("25", "News & Politics"),
        ("26", "Howto & Style"),
        ("27", "Education"),
        ("28", "Science & Technology"),
        ("29", "Nonprofits & Activism"),
        ("30", "Movies"),
        ("31", "Anime/Animation"),
        ("32", "Action/Adventure"),
        ("33", "Classics"),
        ("34", "Comedy"),
        ("35", "Documentary"),
        ("36", "Drama"),
        ("37", "Family"),
        ("38", "Foreign"),
        ("39", "Horror"),
        ("40", "Sci-Fi/Fantasy"),
        ("41", "Thriller"),
        ("42", "Shorts"),
        ("43", "Shows"),
        ("44", "Trailers"),
    ]
    .into_iter()
    .collect()
});

/// Map a raw category id to its label. Unrecognised ids keep the raw code.
pub fn category_label(code: &str) -> String {
    match CATEGORY_LABELS.get(code) {
        Some(label) => label.to_string(),
        None => format!("Unknown Category (ID: {})", code),
    }
}

/// Resolve the human-readable category of a video. Never fails: a missing
/// video or API error yields `UNKNOWN_CATEGORY`, anything else `CATEGORY_ERROR`.
pub async fn resolve_category(platform: &dyn VideoPlatform, video_id: &str) -> String {
    match platform.video_category_id(video_id).await {
        Ok(Some(code)) => category_label(&code),
        Ok(None) => {
            tracing::warn!("🏷️ No category found for video {}", video_id);
            UNKNOWN_CATEGORY.to_string()
        }
        Err(PlatformError::Upstream { status, message, .. }) => {
            tracing::warn!("🏷️ Category lookup for {} returned {}: {}", video_id, status, message);
            UNKNOWN_CATEGORY.to_string()
        }
        Err(e) => {
            tracing::error!("🏷️ Category lookup for {} failed: {}", video_id, e);
            CATEGORY_ERROR.to_string()
        }
    }
}
