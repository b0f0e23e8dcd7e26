//! Error types for the sign-in flow

use thiserror::Error;

/// Errors that can occur while completing a sign-in attempt
#[derive(Error, Debug)]
pub enum AuthError {
    /// The user dismissed or cancelled the hosted sign-in surface.
    /// A normal exit, not a fault.
    #[error("Sign-in was cancelled")]
    UserCancelled,

    /// The provider redirected back with an `error` parameter
    /// (e.g. access_denied)
    #[error("Provider error: {error}{}", .description.as_ref().map(|d| format!(" - {}", d)).unwrap_or_default())]
    ProviderError {
        /// The `error` query parameter
        error: String,
        /// The `error_description` query parameter, when present
        description: Option<String>,
    },

    /// Transport-level failure before any response was received
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(#[source] reqwest::Error),

    /// The token endpoint answered with a non-2xx status
    #[error("Token exchange rejected: {0}")]
    ProviderRejectedExchange(String),

    /// A signed token could not be decoded into claims
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token endpoint answered 2xx with a body that is not a
    /// valid token bundle
    #[error("Malformed token endpoint response: {0}")]
    MalformedResponse(String),

    /// The local token cache could not be written. Non-fatal: the
    /// in-memory session is still adopted.
    #[error("Token cache write failed: {0}")]
    CacheWriteFailed(String),

    /// A sign-in was initiated while another attempt is in progress
    #[error("A sign-in attempt is already in progress")]
    FlowBusy,

    /// The provisioning outputs file could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O error from the cache layer
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML serialization error from the cache layer
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// TOML deserialization error from the cache layer
    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),
}

impl AuthError {
    /// Create a provider error from callback parameters
    pub fn provider_error(error: impl Into<String>, description: Option<String>) -> Self {
        Self::ProviderError {
            error: error.into(),
            description,
        }
    }

    /// Create a rejected-exchange error
    pub fn rejected_exchange(msg: impl Into<String>) -> Self {
        Self::ProviderRejectedExchange(msg.into())
    }

    /// Create a malformed-token error
    pub fn malformed_token(msg: impl Into<String>) -> Self {
        Self::MalformedToken(msg.into())
    }

    /// Create a malformed-response error
    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// The single user-facing message shown when an attempt settles
    /// as a failure: the provider's description when one exists,
    /// otherwise a generic retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            Self::UserCancelled => "Sign-in was cancelled".to_string(),
            Self::ProviderError {
                description: Some(desc),
                ..
            } => desc.clone(),
            Self::ProviderError { error, .. } => error.clone(),
            Self::ProviderRejectedExchange(msg) => msg.clone(),
            _ => "Sign-in failed, please try again".to_string(),
        }
    }
}

/// Result type alias for sign-in operations
pub type AuthResult<T> = Result<T, AuthError>;
