//! Auth configuration
//!
//! Configuration is usually loaded from the app's provisioning
//! outputs file (`amplify_outputs.json`), which carries the user pool
//! identifiers and the Hosted UI OAuth settings. A direct constructor
//! exists for tests and embedding.

use crate::error::{AuthError, AuthResult};
use serde::Deserialize;
use std::path::Path;

/// Custom URI scheme registered by the mobile shell
pub const NATIVE_SCHEME: &str = "tinywinsmobile";

/// Configuration for the Hosted UI OAuth flow
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Hosted UI domain, e.g. "myapp.auth.us-east-1.amazoncognito.com"
    pub oauth_domain: String,
    /// User pool app client ID (public client, no secret)
    pub client_id: String,
    /// User pool ID, e.g. "us-east-1_AbCdEfGh"
    pub user_pool_id: String,
    /// AWS region hosting the user pool
    pub region: String,
    /// Scopes requested during authorization
    pub scopes: Vec<String>,
    /// Custom URI scheme for the native callback
    pub native_scheme: String,
    /// Fixed redirect-proxy URI used when running inside a managed
    /// development sandbox that cannot receive custom-scheme links
    pub dev_proxy_redirect: Option<String>,
}

impl AuthConfig {
    /// Create a configuration directly
    pub fn new(
        oauth_domain: impl Into<String>,
        client_id: impl Into<String>,
        user_pool_id: impl Into<String>,
        region: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            oauth_domain: oauth_domain.into(),
            client_id: client_id.into(),
            user_pool_id: user_pool_id.into(),
            region: region.into(),
            scopes,
            native_scheme: NATIVE_SCHEME.to_string(),
            dev_proxy_redirect: None,
        }
    }

    /// Load configuration from a provisioning outputs file
    pub fn from_outputs_file(path: &Path) -> AuthResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_outputs_json(&content)
    }

    /// Parse configuration from provisioning outputs JSON
    pub fn from_outputs_json(json: &str) -> AuthResult<Self> {
        let outputs: ProvisioningOutputs = serde_json::from_str(json)
            .map_err(|e| AuthError::InvalidConfig(format!("invalid outputs file: {}", e)))?;

        let auth = outputs.auth;
        Ok(Self {
            oauth_domain: auth.oauth.domain,
            client_id: auth.user_pool_client_id,
            user_pool_id: auth.user_pool_id,
            region: auth.aws_region,
            scopes: auth.oauth.scopes,
            native_scheme: NATIVE_SCHEME.to_string(),
            dev_proxy_redirect: None,
        })
    }

    /// Authorization endpoint on the Hosted UI domain
    pub fn authorize_endpoint(&self) -> String {
        format!("https://{}/oauth2/authorize", self.oauth_domain)
    }

    /// Token endpoint on the Hosted UI domain
    pub fn token_endpoint(&self) -> String {
        format!("https://{}/oauth2/token", self.oauth_domain)
    }

    /// Regional user pool API endpoint (for non-OAuth calls such as
    /// password sign-in)
    pub fn user_pool_endpoint(&self) -> String {
        format!("https://cognito-idp.{}.amazonaws.com/", self.region)
    }

    /// Get the scopes as a space-separated string
    pub fn scopes_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Shape of the provisioning outputs file (the subset we consume)
#[derive(Debug, Deserialize)]
struct ProvisioningOutputs {
    auth: AuthOutputs,
}

#[derive(Debug, Deserialize)]
struct AuthOutputs {
    aws_region: String,
    user_pool_id: String,
    user_pool_client_id: String,
    oauth: OAuthOutputs,
}

#[derive(Debug, Deserialize)]
struct OAuthOutputs {
    domain: String,
    scopes: Vec<String>,
}
