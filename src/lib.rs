//! Video comment sentiment and theme analysis.
//!
//! Comments are paged in from the YouTube Data API, each one is annotated by
//! Google Cloud Natural Language (sentiment + entities), and recurring
//! entities are ranked into themes.

pub mod analyzer;
pub mod api;
pub mod category;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod nlp;
pub mod report;
pub mod themes;
pub mod youtube;
