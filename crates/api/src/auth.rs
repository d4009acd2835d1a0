//! JWT-authenticated HTTP client for the scheduling API server.
//!
//! The plugin proves its identity by posting its PEM public key to the token
//! endpoint; the returned bearer token is cached until its `expired_at`
//! timestamp and attached to every subsequent request. When mutual TLS is
//! enabled the underlying client presents the plugin's certificate and only
//! trusts the private CA.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use gthulhu_core::MtlsConfig;

use crate::error::ApiError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const TOKEN_PATH: &str = "/api/v1/auth/token";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    public_key: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct TokenData {
    #[serde(default)]
    token: String,
    #[serde(default)]
    expired_at: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    success: bool,
    #[serde(default)]
    data: TokenData,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

pub struct JwtClient {
    public_key_path: PathBuf,
    base_url: String,
    auth_enabled: bool,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl JwtClient {
    pub fn new(
        public_key_path: impl Into<PathBuf>,
        base_url: &str,
        auth_enabled: bool,
        mtls: &MtlsConfig,
    ) -> Result<Self, ApiError> {
        let client = if mtls.enable {
            build_mtls_client(mtls)?
        } else {
            reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?
        };

        Ok(Self {
            public_key_path: public_key_path.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_enabled,
            client,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Build a request carrying the JSON content type and, when auth is
    /// enabled, a valid bearer token.
    pub async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let mut builder = self
            .client
            .request(method, url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if self.auth_enabled {
            let token = self.ensure_valid_token().await?;
            builder = builder.bearer_auth(token);
        }

        Ok(builder)
    }

    /// Return the cached token, requesting a new one if missing or expired.
    pub async fn ensure_valid_token(&self) -> Result<String, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref() {
            if !cached.is_expired() {
                return Ok(cached.token.clone());
            }
            debug!("JWT token expired, requesting a new one");
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    async fn load_public_key(&self) -> Result<String, ApiError> {
        let pem = tokio::fs::read_to_string(&self.public_key_path).await?;
        match pem_label(&pem) {
            Some(label) if label.ends_with("PUBLIC KEY") => Ok(pem),
            Some(label) => Err(ApiError::InvalidKey(format!(
                "expected a PUBLIC KEY PEM block, found {label}"
            ))),
            None => Err(ApiError::InvalidKey(
                "failed to decode PEM block containing public key".into(),
            )),
        }
    }

    async fn request_token(&self) -> Result<CachedToken, ApiError> {
        let public_key = self.load_public_key().await?;
        let url = self.endpoint(TOKEN_PATH);

        let response = self
            .client
            .post(&url)
            .json(&TokenRequest { public_key: &public_key })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("status {}: {}", status.as_u16(), body));
            return Err(ApiError::TokenRejected(reason));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        if !parsed.success || parsed.data.token.is_empty() {
            return Err(ApiError::TokenRejected("token request unsuccessful".into()));
        }

        let expires_at = DateTime::from_timestamp(parsed.data.expired_at, 0).unwrap_or_else(Utc::now);
        info!(%url, %expires_at, "obtained JWT token");

        Ok(CachedToken {
            token: parsed.data.token,
            expires_at,
        })
    }
}

/// Client presenting the plugin identity and trusting only the private CA.
fn build_mtls_client(mtls: &MtlsConfig) -> Result<reqwest::Client, ApiError> {
    if pem_label(&mtls.cert_pem).as_deref() != Some("CERTIFICATE") {
        return Err(ApiError::Tls("load mTLS client certificate: no CERTIFICATE block".into()));
    }
    if pem_label(&mtls.ca_pem).as_deref() != Some("CERTIFICATE") {
        return Err(ApiError::Tls("parse mTLS CA certificate".into()));
    }

    let identity_pem = format!("{}\n{}", mtls.cert_pem.trim(), mtls.key_pem.trim());
    let identity = reqwest::Identity::from_pem(identity_pem.as_bytes())
        .map_err(|e| ApiError::Tls(format!("load mTLS client certificate: {e}")))?;
    let ca = reqwest::Certificate::from_pem(mtls.ca_pem.as_bytes())
        .map_err(|e| ApiError::Tls(format!("parse mTLS CA certificate: {e}")))?;

    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(REQUEST_TIMEOUT)
        .identity(identity)
        .tls_built_in_root_certs(false)
        .add_root_certificate(ca)
        .min_tls_version(reqwest::tls::Version::TLS_1_2)
        .build()
        .map_err(|e| ApiError::Tls(format!("build mTLS client: {e}")))
}

/// Label of the first PEM block (`-----BEGIN <label>-----`) with a non-empty
/// body and matching END line.
fn pem_label(pem: &str) -> Option<String> {
    let mut lines = pem.lines().map(str::trim).skip_while(|l| l.is_empty());
    let label = lines
        .next()?
        .strip_prefix("-----BEGIN ")?
        .strip_suffix("-----")?
        .to_string();

    let end = format!("-----END {label}-----");
    let mut body_len = 0;
    for line in lines {
        if line == end {
            return (body_len > 0).then_some(label);
        }
        body_len += line.len();
    }
    None
}
