//! Password sign-in forwarding
//!
//! A single pass-through call to the user pool's `InitiateAuth` API
//! (`USER_PASSWORD_AUTH`). No custom logic lives here: the returned
//! token bundle goes through the same session materializer as the
//! redirect flow.

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::exchange::TokenBundle;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

const INITIATE_AUTH_TARGET: &str = "AWSCognitoIdentityProviderService.InitiateAuth";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

/// Exchange a username and password for a token bundle
pub async fn initiate_password_auth(
    client: &reqwest::Client,
    config: &AuthConfig,
    username: &str,
    password: &str,
) -> AuthResult<TokenBundle> {
    let body = json!({
        "AuthFlow": "USER_PASSWORD_AUTH",
        "ClientId": config.client_id,
        "AuthParameters": {
            "USERNAME": username,
            "PASSWORD": password,
        },
    });

    let response = client
        .post(config.user_pool_endpoint())
        .header("content-type", AMZ_JSON)
        .header("x-amz-target", INITIATE_AUTH_TARGET)
        .json(&body)
        .send()
        .await
        .map_err(AuthError::NetworkUnreachable)?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(AuthError::NetworkUnreachable)?;

    parse_initiate_auth_response(status, &text)
}

#[derive(Debug, Deserialize)]
struct InitiateAuthResponse {
    #[serde(rename = "AuthenticationResult")]
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Debug, Deserialize)]
struct AuthenticationResult {
    #[serde(rename = "IdToken")]
    id_token: String,
    #[serde(rename = "AccessToken")]
    access_token: String,
    #[serde(rename = "RefreshToken")]
    refresh_token: String,
    #[serde(rename = "ExpiresIn")]
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(rename = "__type")]
    error_type: Option<String>,
}

/// Map an `InitiateAuth` response to a bundle or a classified failure
pub fn parse_initiate_auth_response(status: StatusCode, body: &str) -> AuthResult<TokenBundle> {
    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|e| e.message.or(e.error_type))
            .unwrap_or_else(|| format!("user pool returned HTTP {}", status.as_u16()));
        return Err(AuthError::rejected_exchange(message));
    }

    let parsed: InitiateAuthResponse = serde_json::from_str(body)
        .map_err(|e| AuthError::malformed_response(format!("invalid InitiateAuth body: {}", e)))?;

    // A 2xx without tokens means the pool wants a challenge round
    // (MFA, new password). Not supported by this client.
    let result = parsed.authentication_result.ok_or_else(|| {
        AuthError::malformed_response("InitiateAuth returned no AuthenticationResult".to_string())
    })?;

    Ok(TokenBundle {
        id_token: result.id_token,
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        expires_in: result.expires_in,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let body = r#"{
            "AuthenticationResult": {
                "IdToken": "h.p.s",
                "AccessToken": "A",
                "RefreshToken": "R",
                "ExpiresIn": 3600,
                "TokenType": "Bearer"
            },
            "ChallengeParameters": {}
        }"#;

        let bundle = parse_initiate_auth_response(StatusCode::OK, body).unwrap();
        assert_eq!(bundle.id_token, "h.p.s");
        assert_eq!(bundle.expires_in, 3600);
    }

    #[test]
    fn test_parse_rejection() {
        let body = r#"{"__type":"NotAuthorizedException","message":"Incorrect username or password."}"#;
        let err = parse_initiate_auth_response(StatusCode::BAD_REQUEST, body).unwrap_err();

        match err {
            AuthError::ProviderRejectedExchange(msg) => {
                assert_eq!(msg, "Incorrect username or password.")
            }
            other => panic!("expected ProviderRejectedExchange, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_challenge_round_is_malformed() {
        let body = r#"{"ChallengeName":"SMS_MFA","ChallengeParameters":{}}"#;
        let err = parse_initiate_auth_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse(_)));
    }
}
