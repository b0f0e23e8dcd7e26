//! Authorization-code exchange against the token endpoint
//!
//! One request-response per attempt, standard authorization-code
//! grant for a public client (no secret). No retries here:
//! authorization codes are single-use and short-lived, so a retry has
//! to restart the whole flow from a fresh authorization URL.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Token bundle returned by the token endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenBundle {
    /// Signed ID token carrying identity claims
    pub id_token: String,
    /// Access token authorizing API calls
    pub access_token: String,
    /// Refresh token for obtaining new tokens later
    pub refresh_token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// Seam between the coordinator and the network
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange an authorization code for a token bundle.
    ///
    /// `redirect_target` must be the exact string used to obtain the
    /// code.
    async fn exchange(&self, code: &str, redirect_target: &str) -> AuthResult<TokenBundle>;
}

/// Exchanger talking to the Hosted UI token endpoint
pub struct HostedUiExchanger {
    client: reqwest::Client,
    token_endpoint: String,
    client_id: String,
}

impl HostedUiExchanger {
    /// Create an exchanger for the configured user pool client
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_endpoint: config.token_endpoint(),
            client_id: config.client_id.clone(),
        }
    }
}

#[async_trait]
impl TokenExchanger for HostedUiExchanger {
    async fn exchange(&self, code: &str, redirect_target: &str) -> AuthResult<TokenBundle> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", code),
            ("redirect_uri", redirect_target),
        ];

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(AuthError::NetworkUnreachable)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(AuthError::NetworkUnreachable)?;

        parse_token_response(status, &body)
    }
}

/// Error body shape the token endpoint uses for rejections
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Map a token endpoint response to a bundle or a classified failure
pub fn parse_token_response(status: StatusCode, body: &str) -> AuthResult<TokenBundle> {
    if !status.is_success() {
        let message = serde_json::from_str::<TokenErrorBody>(body)
            .ok()
            .and_then(|e| e.error_description.or(e.error))
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| format!("token endpoint returned HTTP {}", status.as_u16()));
        return Err(AuthError::rejected_exchange(message));
    }

    serde_json::from_str::<TokenBundle>(body).map_err(|e| {
        // Logged distinctly from provider rejections for diagnosis,
        // surfaced to the user the same way
        tracing::error!("token endpoint returned 2xx with unusable body: {}", e);
        AuthError::malformed_response(format!("invalid token bundle: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let body = r#"{
            "id_token": "h.p.s",
            "access_token": "A",
            "refresh_token": "R",
            "expires_in": 3600,
            "token_type": "Bearer"
        }"#;

        let bundle = parse_token_response(StatusCode::OK, body).unwrap();
        assert_eq!(bundle.id_token, "h.p.s");
        assert_eq!(bundle.access_token, "A");
        assert_eq!(bundle.refresh_token, "R");
        assert_eq!(bundle.expires_in, 3600);
    }

    #[test]
    fn test_parse_rejection_uses_error_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Code expired"}"#;
        let err = parse_token_response(StatusCode::BAD_REQUEST, body).unwrap_err();

        match err {
            AuthError::ProviderRejectedExchange(msg) => assert_eq!(msg, "Code expired"),
            other => panic!("expected ProviderRejectedExchange, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejection_falls_back_to_error_code() {
        let body = r#"{"error":"invalid_grant"}"#;
        let err = parse_token_response(StatusCode::BAD_REQUEST, body).unwrap_err();

        match err {
            AuthError::ProviderRejectedExchange(msg) => assert_eq!(msg, "invalid_grant"),
            other => panic!("expected ProviderRejectedExchange, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejection_falls_back_to_raw_body() {
        let err = parse_token_response(StatusCode::BAD_GATEWAY, "upstream unavailable").unwrap_err();

        match err {
            AuthError::ProviderRejectedExchange(msg) => assert_eq!(msg, "upstream unavailable"),
            other => panic!("expected ProviderRejectedExchange, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejection_generic_for_empty_body() {
        let err = parse_token_response(StatusCode::BAD_REQUEST, "").unwrap_err();

        match err {
            AuthError::ProviderRejectedExchange(msg) => {
                assert_eq!(msg, "token endpoint returned HTTP 400")
            }
            other => panic!("expected ProviderRejectedExchange, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed_success_body() {
        let err = parse_token_response(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));

        // Missing required fields is malformed too
        let err = parse_token_response(StatusCode::OK, r#"{"id_token":"h.p.s"}"#).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }

    #[test]
    fn test_token_bundle_serde_round_trip() {
        let bundle = TokenBundle {
            id_token: "h.p.s".to_string(),
            access_token: "A".to_string(),
            refresh_token: "R".to_string(),
            expires_in: 3600,
        };

        let json = serde_json::to_string(&bundle).unwrap();
        let parsed: TokenBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bundle);
    }
}
