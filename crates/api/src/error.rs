//! API channel error types.

use gthulhu_core::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read public key file: {0}")]
    KeyFile(#[from] std::io::Error),

    #[error("invalid public key: {0}")]
    InvalidKey(String),

    #[error("invalid TLS material: {0}")]
    Tls(String),

    #[error("token request failed: {0}")]
    TokenRejected(String),

    #[error("request failed with status code: {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<ApiError> for PluginError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Tls(msg) | ApiError::InvalidKey(msg) => PluginError::Config(msg),
            other => PluginError::OverrideFetchFailed(other.to_string()),
        }
    }
}
