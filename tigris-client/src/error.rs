//! Client error type

use std::error::Error as StdError;

use thiserror::Error;
use tigris_auth::SigV4Error;
use tigris_core::{ErrorCode, InvalidBucketName};

use crate::transport::TransportError;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors returned by the bucket operations
#[derive(Debug, Error)]
pub enum TigrisError {
    /// The bucket name breaks the naming rules; nothing was sent.
    #[error(transparent)]
    InvalidBucketName(#[from] InvalidBucketName),

    /// A required input field is empty; nothing was sent.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("failed to sign request: {0}")]
    Signing(#[from] SigV4Error),

    /// The request never produced a response (after all retries).
    #[error("failed to send request: {0}")]
    Transport(#[from] TransportError),

    /// The service answered with a failure.
    #[error("request failed with code {status}{}", describe(.code, .message))]
    Api {
        status: u16,
        code: Option<String>,
        message: Option<String>,
        request_id: Option<String>,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body could not be decoded.
    #[error("failed to decode response (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("bucket not found: {bucket}")]
    NotFound { bucket: String },

    /// A call on the S3-compatible API failed.
    #[error("{operation} failed: {source}")]
    S3 {
        operation: &'static str,
        code: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load configuration: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
}

fn describe(code: &Option<String>, message: &Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!(": {code}: {message}"),
        (Some(text), None) | (None, Some(text)) => format!(": {text}"),
        (None, None) => String::new(),
    }
}

impl TigrisError {
    /// Rejected locally before anything was sent
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidBucketName(_) | Self::MissingField { .. })
    }

    /// Plausibly transient: a server error or a failed exchange
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Api { status, .. } => *status == 404,
            Self::S3 { code, .. } => code.as_deref() == Some(ErrorCode::NoSuchBucket.as_str()),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }

    /// The service error code, when it is one this crate knows
    pub fn service_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } | Self::S3 { code, .. } => code.as_deref()?.parse().ok(),
            _ => None,
        }
    }
}
