//! Environment-driven service configuration.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::FetchOptions;
use crate::nlp::credentials::CredentialSource;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_LANGUAGE_API_BASE: &str = "https://language.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub youtube_api_key: Option<String>,
    pub youtube_api_base: String,
    pub language_api_base: String,
    pub credentials: Option<CredentialSource>,
    pub fetch: FetchOptions,
    /// Max in-flight comment analyses; `None` means unbounded.
    pub analysis_concurrency: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            youtube_api_key: None,
            youtube_api_base: DEFAULT_YOUTUBE_API_BASE.to_string(),
            language_api_base: DEFAULT_LANGUAGE_API_BASE.to_string(),
            credentials: None,
            fetch: FetchOptions::default(),
            analysis_concurrency: None,
        }
    }
}

impl Config {
    /// Build the configuration from process environment variables.
    /// Call `dotenv().ok()` first to pick up a local `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let port = parse_var(&var, "PORT")?.unwrap_or(defaults.port);
        let cap = parse_var(&var, "COMMENT_CAP")?.unwrap_or(defaults.fetch.comment_cap);
        let page_size: u32 =
            parse_var(&var, "COMMENT_PAGE_SIZE")?.unwrap_or(defaults.fetch.page_size);
        if !(1..=100).contains(&page_size) {
            anyhow::bail!("COMMENT_PAGE_SIZE must be between 1 and 100, got {}", page_size);
        }
        let delay_ms: u64 = parse_var(&var, "PAGE_DELAY_MS")?
            .unwrap_or(defaults.fetch.page_delay.as_millis() as u64);
        let concurrency: usize = parse_var(&var, "ANALYSIS_CONCURRENCY")?.unwrap_or(0);

        let credentials = if let Some(json) = var("GOOGLE_CREDENTIALS_JSON") {
            Some(CredentialSource::Inline(json))
        } else if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            Some(CredentialSource::File(PathBuf::from(path)))
        } else {
            CredentialSource::discover_ambient(&var)
        };

        Ok(Self {
            port,
            youtube_api_key: var("YOUTUBE_API_KEY"),
            youtube_api_base: var("YOUTUBE_API_BASE").unwrap_or(defaults.youtube_api_base),
            language_api_base: var("LANGUAGE_API_BASE").unwrap_or(defaults.language_api_base),
            credentials,
            fetch: FetchOptions {
                page_size,
                comment_cap: cap,
                page_delay: Duration::from_millis(delay_ms),
            },
            analysis_concurrency: (concurrency > 0).then_some(concurrency),
        })
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| raw.parse::<T>().with_context(|| format!("Invalid {} value: {}", key, raw)))
        .transpose()
}
