//! Shared data structures for the comment analysis pipeline.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Fetched comments
// ============================================================================

/// A single top-level comment as returned by the video platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

// ============================================================================
// NLP annotations
// ============================================================================

/// Document-level sentiment. Both fields are `None` when analysis failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SentimentScore {
    /// Polarity, roughly -1.0 (negative) to 1.0 (positive)
    pub score: Option<f64>,
    /// Overall emotional strength, >= 0.0
    pub magnitude: Option<f64>,
}

impl SentimentScore {
    pub fn new(score: f64, magnitude: f64) -> Self {
        Self {
            score: Some(score),
            magnitude: Some(magnitude),
        }
    }

    /// Score usable for aggregation (present and finite).
    pub fn usable_score(&self) -> Option<f64> {
        self.score.filter(|s| s.is_finite())
    }
}

/// Entity type tags as reported by the language service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Location,
    Organization,
    Event,
    WorkOfArt,
    ConsumerGood,
    Other,
    PhoneNumber,
    Address,
    Date,
    Number,
    Price,
    Product,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EntityType {
    /// Whether entities of this type may form a discussion theme.
    pub fn is_theme_eligible(self) -> bool {
        matches!(
            self,
            EntityType::WorkOfArt
                | EntityType::ConsumerGood
                | EntityType::Other
                | EntityType::Event
                | EntityType::Product
                | EntityType::Unknown
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: EntityType,
    /// Importance of the entity within its text, 0.0 - 1.0
    #[serde(default)]
    pub salience: f64,
}

/// Analysis result for one fetched comment.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalyzedComment {
    pub text: String,
    pub sentiment: SentimentScore,
    pub entities: Vec<Entity>,
    /// First failure encountered while analysing this comment
    pub error: Option<String>,
}

// ============================================================================
// Themes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SentimentCategory {
    Positive,
    Neutral,
    Negative,
}

impl SentimentCategory {
    pub fn from_average(average: f64) -> Self {
        if average > 0.2 {
            SentimentCategory::Positive
        } else if average < -0.2 {
            SentimentCategory::Negative
        } else {
            SentimentCategory::Neutral
        }
    }
}

/// A recurring entity treated as a discussion topic.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    pub occurrences: u32,
    #[schema(example = 0.42)]
    pub average_sentiment: f64,
    pub sentiment_category: SentimentCategory,
}
