//! Theme extraction from analysed comments.
//!
//! A theme is an entity name that recurs across comments. Only salient
//! entities of "topic-like" types count, and each mention contributes the
//! sentiment of the comment it came from.

use std::collections::HashMap;

use crate::models::{AnalyzedComment, SentimentCategory, Theme};

pub const MIN_SALIENCE: f64 = 0.05;
pub const MIN_OCCURRENCES: u32 = 2;
pub const MAX_THEMES: usize = 5;

#[derive(Debug, Default)]
struct ThemeAccumulator {
    occurrences: u32,
    sentiment_sum: f64,
    sentiment_count: u32,
}

impl ThemeAccumulator {
    fn average_sentiment(&self) -> f64 {
        if self.sentiment_count == 0 {
            return 0.0;
        }
        round_to_hundredths(self.sentiment_sum / self.sentiment_count as f64)
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rank the most frequent themes, at most `MAX_THEMES`. Themes with equal
/// occurrence counts keep the order in which they were first seen.
pub fn extract_themes(analyzed: &[AnalyzedComment]) -> Vec<Theme> {
    // Keys in first-seen order, for a deterministic tie-break.
    let mut order: Vec<String> = Vec::new();
    let mut accumulators: HashMap<String, ThemeAccumulator> = HashMap::new();

    for comment in analyzed {
        let Some(score) = comment.sentiment.usable_score() else {
            continue;
        };

        for entity in &comment.entities {
            if !entity.entity_type.is_theme_eligible() || entity.salience <= MIN_SALIENCE {
                continue;
            }
            let key = entity.name.to_lowercase();
            let acc = accumulators.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                ThemeAccumulator::default()
            });
            acc.occurrences += 1;
            acc.sentiment_sum += score;
            acc.sentiment_count += 1;
        }
    }

    let mut themes: Vec<Theme> = order
        .into_iter()
        .filter_map(|name| {
            let acc = accumulators.remove(&name)?;
            if acc.occurrences < MIN_OCCURRENCES {
                return None;
            }
            // Classified on the rounded value so the label agrees with the number shown.
            let average_sentiment = acc.average_sentiment();
            Some(Theme {
                name,
                occurrences: acc.occurrences,
                average_sentiment,
                sentiment_category: SentimentCategory::from_average(average_sentiment),
            })
        })
        .collect();

    // sort_by is stable, so first-seen order survives among equal counts
    themes.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    themes.truncate(MAX_THEMES);
    themes
}
