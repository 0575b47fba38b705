//! Google service-account authentication.
//!
//! A service-account key is turned into a short-lived bearer token by signing an RS256
//! JWT-bearer assertion and posting it to the key's `token_uri`. Tokens are cached and
//! re-exchanged shortly before they expire.

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, anyhow};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// Read-only access to Drive files and metadata.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Token endpoint used when a key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// `grant_type=urn:ietf:params:oauth:grant-type:jwt-bearer`, form-encoded.
const JWT_BEARER_GRANT_FORM: &str = "urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer";

const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The parts of a service-account key file needed to mint tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

impl ServiceAccountKey {
    /// Parse a key file's JSON. The file must declare `"type": "service_account"`.
    pub fn from_json(raw: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Kind {
            #[serde(rename = "type")]
            kind: Option<String>,
        }

        let kind: Kind =
            serde_json::from_str(raw).context("service account key is not valid JSON")?;
        if kind.kind.as_deref() != Some("service_account") {
            return Err(anyhow!("credentials JSON is not a service account key").into());
        }

        let key: Self = serde_json::from_str(raw)
            .context("service account key is missing 'client_email' or 'private_key'")?;
        Ok(key)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// A bearer token and the instant it stops being usable.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Instant,
}

impl AccessToken {
    /// Whether the token is still good for at least the refresh margin.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at > now + REFRESH_MARGIN
    }
}

/// Mints and caches access tokens for one service account.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    client: Client,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuth {
    /// Validate the key's PEM up front so a bad key fails before any listing starts.
    pub fn new(key: ServiceAccountKey, scope: impl Into<String>, client: Client) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .with_context(|| format!("invalid private key for {}", key.client_email))?;

        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            client,
            cached: Mutex::new(None),
        })
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    /// Sign the JWT-bearer assertion for a token issued at `issued_at` (unix seconds).
    pub fn assertion(&self, issued_at: u64) -> Result<String> {
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let jwt = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .context("failed to sign service account assertion")?;
        Ok(jwt)
    }

    /// Return a cached token, exchanging a new assertion when it is close to expiry.
    pub fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.token.clone());
        }

        let fresh = self.exchange()?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn exchange(&self) -> Result<AccessToken> {
        debug!(client_email = %self.key.client_email, "exchanging service account assertion");

        let assertion = self.assertion(unix_now()?)?;
        // JWT segments are base64url, so the assertion needs no escaping.
        let body = format!("grant_type={JWT_BEARER_GRANT_FORM}&assertion={assertion}");

        let requested_at = Instant::now();
        let resp = self
            .client
            .post(&self.key.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .with_context(|| format!("token request failed: {}", self.key.token_uri))?
            .error_for_status()
            .with_context(|| format!("token request rejected: {}", self.key.token_uri))?;

        let bytes = resp.bytes()?;
        parse_token_response(&bytes, requested_at)
    }
}

/// Decode a token endpoint response. Lifetimes are measured from `requested_at`.
pub fn parse_token_response(body: &[u8], requested_at: Instant) -> Result<AccessToken> {
    let resp: TokenResponse =
        serde_json::from_slice(body).context("token response has no 'access_token'")?;
    if resp.access_token.trim().is_empty() {
        return Err(anyhow!("token response carried an empty access token").into());
    }

    let lifetime = resp.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
    Ok(AccessToken {
        token: resp.access_token,
        expires_at: requested_at + Duration::from_secs(lifetime),
    })
}

fn unix_now() -> Result<u64> {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?;
    Ok(since_epoch.as_secs())
}
