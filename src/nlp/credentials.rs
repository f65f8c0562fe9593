//! Google Cloud credential loading and OAuth2 access-token minting.
//!
//! Supports:
//! - Inline credential JSON (`GOOGLE_CREDENTIALS_JSON`)
//! - Credential file path (`GOOGLE_APPLICATION_CREDENTIALS`)
//! - Ambient discovery: the gcloud well-known ADC file, or the metadata
//!   server when a Google runtime is detected from the environment or
//!   answers a `Metadata-Flavor: Google` probe
//!
//! JSON credentials may be `service_account` keys (signed JWT grant) or
//! `authorized_user` refresh tokens. Access tokens are cached until shortly
//! before expiry.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const LANGUAGE_SCOPE: &str = "https://www.googleapis.com/auth/cloud-language";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const METADATA_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Refresh this long before the reported expiry
const EXPIRY_MARGIN_SECS: i64 = 60;
/// A failed token request is replayed to callers for this long before retrying
const FAILURE_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Failed to read credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid credentials JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported credential type: {0}")]
    UnsupportedType(String),
    #[error("Failed to sign service account assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },
    #[error("{0} (not retried yet)")]
    RecentFailure(String),
}

/// Where the language service credentials come from.
#[derive(Clone)]
pub enum CredentialSource {
    Inline(String),
    File(PathBuf),
    MetadataServer { host: String },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Inline(_) => f.write_str("Inline(<redacted>)"),
            CredentialSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CredentialSource::MetadataServer { host } => {
                f.debug_struct("MetadataServer").field("host", host).finish()
            }
        }
    }
}

impl CredentialSource {
    /// Application-default discovery when nothing was configured explicitly.
    pub fn discover_ambient<F>(var: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = well_known_adc_file(var).filter(|p| p.exists()) {
            tracing::info!("🔑 Using gcloud application default credentials at {}", path.display());
            return Some(CredentialSource::File(path));
        }

        // Set by GCE, Cloud Run and Cloud Functions runtimes respectively.
        if let Some(host) = var("GCE_METADATA_HOST") {
            return Some(CredentialSource::MetadataServer { host });
        }
        if var("K_SERVICE").is_some() || var("FUNCTION_TARGET").is_some() {
            return Some(CredentialSource::MetadataServer {
                host: DEFAULT_METADATA_HOST.to_string(),
            });
        }
        None
    }

    /// Checks whether a metadata server answers at `host`. Plain GCE VMs and
    /// GKE pods expose one without setting any of the runtime variables.
    pub async fn probe_metadata_server(http: &reqwest::Client, host: &str) -> Option<Self> {
        let response = http
            .get(format!("{}/computeMetadata/v1/", metadata_base(host)))
            .header("Metadata-Flavor", "Google")
            .timeout(METADATA_PROBE_TIMEOUT)
            .send()
            .await
            .ok()?;
        let flavor = response.headers().get("Metadata-Flavor")?;
        if !response.status().is_success() || flavor.as_bytes() != b"Google" {
            return None;
        }
        tracing::info!("🔑 Metadata server found at {}", host);
        Some(CredentialSource::MetadataServer {
            host: host.to_string(),
        })
    }
}

fn metadata_base(host: &str) -> String {
    if host.starts_with("http") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

fn well_known_adc_file<F>(var: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(config_dir) = var("CLOUDSDK_CONFIG") {
        return Some(Path::new(&config_dir).join("application_default_credentials.json"));
    }
    let base = if cfg!(windows) {
        PathBuf::from(var("APPDATA")?).join("gcloud")
    } else {
        PathBuf::from(var("HOME")?).join(".config").join("gcloud")
    };
    Some(base.join("application_default_credentials.json"))
}

// ============================================================================
// Credential file formats
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AuthorizedUser {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: Option<String>,
}

fn parse_credential_json(raw: &str) -> Result<CredentialFile, CredentialsError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    match value.get("type").and_then(|t| t.as_str()) {
        Some("service_account") | Some("authorized_user") => Ok(serde_json::from_value(value)?),
        Some(other) => Err(CredentialsError::UnsupportedType(other.to_string())),
        None => Err(CredentialsError::UnsupportedType("<missing>".to_string())),
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

// ============================================================================
// Token provider
// ============================================================================

enum TokenKind {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    Metadata { host: String },
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct TokenState {
    token: Option<CachedToken>,
    last_failure: Option<(Instant, String)>,
}

/// Mints and caches OAuth2 access tokens for the language API.
pub struct TokenProvider {
    http: reqwest::Client,
    kind: TokenKind,
    state: Mutex<TokenState>,
}

impl TokenProvider {
    pub async fn from_source(
        http: reqwest::Client,
        source: &CredentialSource,
    ) -> Result<Self, CredentialsError> {
        let kind: TokenKind = match source {
            CredentialSource::Inline(json) => parse_credential_json(json)?.into(),
            CredentialSource::File(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CredentialsError::Io {
                        path: path.clone(),
                        source,
                    })?;
                parse_credential_json(&raw)?.into()
            }
            CredentialSource::MetadataServer { host } => TokenKind::Metadata { host: host.clone() },
        };

        Ok(Self {
            http,
            kind,
            state: Mutex::new(TokenState::default()),
        })
    }

    /// A valid bearer token, refreshing it if missing or about to expire.
    ///
    /// Callers queue on the lock while a refresh is in flight. After a failed
    /// refresh they get the same error back until `FAILURE_BACKOFF` passes.
    pub async fn access_token(&self) -> Result<String, CredentialsError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Some(token) = state.token.as_ref() {
            if token.expires_at - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(token.token.clone());
            }
        }
        if let Some((failed_at, message)) = state.last_failure.as_ref() {
            if failed_at.elapsed() < FAILURE_BACKOFF {
                return Err(CredentialsError::RecentFailure(message.clone()));
            }
        }

        let response = match self.request_token().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("⚠️ Language API token request failed: {}", e);
                state.last_failure = Some((Instant::now(), e.to_string()));
                return Err(e);
            }
        };
        tracing::debug!("🔑 Obtained language API access token, expires in {}s", response.expires_in);
        let token = response.access_token.clone();
        state.token = Some(CachedToken {
            token: response.access_token,
            expires_at: now + ChronoDuration::seconds(response.expires_in),
        });
        state.last_failure = None;
        Ok(token)
    }

    async fn request_token(&self) -> Result<TokenResponse, CredentialsError> {
        let request = match &self.kind {
            TokenKind::ServiceAccount(key) => {
                let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
                let assertion = sign_assertion(key, token_uri, Utc::now())?;
                self.http.post(token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            }
            TokenKind::AuthorizedUser(user) => {
                let token_uri = user.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
                self.http.post(token_uri).form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ])
            }
            TokenKind::Metadata { host } => self
                .http
                .get(format!(
                    "{}/computeMetadata/v1/instance/service-accounts/default/token",
                    metadata_base(host)
                ))
                .query(&[("scopes", LANGUAGE_SCOPE)])
                .header("Metadata-Flavor", "Google"),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialsError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<TokenResponse>().await?)
    }
}

impl From<CredentialFile> for TokenKind {
    fn from(file: CredentialFile) -> Self {
        match file {
            CredentialFile::ServiceAccount(key) => TokenKind::ServiceAccount(key),
            CredentialFile::AuthorizedUser(user) => TokenKind::AuthorizedUser(user),
        }
    }
}

fn sign_assertion(
    key: &ServiceAccountKey,
    token_uri: &str,
    now: DateTime<Utc>,
) -> Result<String, CredentialsError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: LANGUAGE_SCOPE,
        aud: token_uri,
        iat: now.timestamp(),
        exp: now.timestamp() + 3600,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&header, &claims, &signing_key)?)
}
