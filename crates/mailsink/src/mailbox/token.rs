//! OAuth2 client-credentials token acquisition and caching.
//!
//! The pipeline only ever asks for "a currently-valid token"; this module
//! owns the expiry bookkeeping. Tokens are cached in memory and refreshed
//! once they come within a safety skew of their expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::{MailboxError, Result};

/// Scope requested for the mailbox API.
const API_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this many seconds before their reported expiry to
/// absorb clock skew and in-flight request time.
const EXPIRY_SKEW_SECONDS: i64 = 300;

/// Maximum length for error bodies quoted in token errors, so a misbehaving
/// endpoint cannot flood the logs or leak token material.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates an HTTP client with appropriate timeouts.
pub(crate) fn create_http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| MailboxError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Truncates an error response body to a loggable length.
pub(crate) fn sanitize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() > MAX_ERROR_BODY_LENGTH {
        format!("{}... (truncated)", &trimmed[..MAX_ERROR_BODY_LENGTH])
    } else {
        trimmed.to_string()
    }
}

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,

    /// Lifetime in seconds of the access token.
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Acquires access tokens via the OAuth2 client-credentials grant and caches
/// them until shortly before expiry.
pub struct TokenManager {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    /// Creates a token manager for the given tenant. `token_url` overrides
    /// the default Microsoft identity endpoint (used for tests and
    /// sovereign-cloud deployments).
    pub fn new(
        tenant_id: &str,
        client_id: &str,
        client_secret: SecretString,
        token_url: Option<String>,
    ) -> Result<Self> {
        if tenant_id.trim().is_empty() {
            return Err(MailboxError::Config("Tenant id must not be empty".into()));
        }
        if client_id.trim().is_empty() {
            return Err(MailboxError::Config("Client id must not be empty".into()));
        }

        let token_url = token_url.unwrap_or_else(|| default_token_url(tenant_id));

        Ok(Self {
            http: create_http_client()?,
            token_url,
            client_id: client_id.to_string(),
            client_secret,
            cached: Mutex::new(None),
        })
    }

    /// Returns a currently-valid access token, fetching a fresh one when the
    /// cache is empty or within the expiry skew.
    pub async fn access_token(&self) -> Result<SecretString> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired(Utc::now()) {
                debug!("Using cached access token");
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        info!("Requesting access token from {}", self.token_url);

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", API_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MailboxError::Token(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Token(format!(
                "Token endpoint returned {}: {}",
                status,
                sanitize_error_body(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MailboxError::Token(format!("Failed to parse token response: {}", e)))?;

        let lifetime = token.expires_in.unwrap_or(3600) as i64;
        let expires_at =
            Utc::now() + chrono::Duration::seconds(lifetime.saturating_sub(EXPIRY_SKEW_SECONDS));

        info!("Obtained access token, valid until {}", expires_at);

        Ok(CachedToken {
            access_token: SecretString::from(token.access_token),
            expires_at,
        })
    }

    /// The token endpoint this manager posts to.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

fn default_token_url(tenant_id: &str) -> String {
    format!(
        "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
        tenant_id
    )
}
