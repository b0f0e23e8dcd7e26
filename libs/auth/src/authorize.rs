//! Authorization URL construction
//!
//! Builds the Hosted UI authorization endpoint URL for a federated
//! sign-in attempt. Pure construction: the caller guarantees a
//! non-empty scope set and a well-formed redirect target, so there
//! are no runtime error cases here.

use crate::config::AuthConfig;

/// Federated identity provider selectable on the hosted sign-in page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityProvider {
    /// Sign in with Google
    Google,
}

impl IdentityProvider {
    /// The `identity_provider` query parameter value
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Google => "Google",
        }
    }
}

/// Re-prompt behavior requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptPolicy {
    /// Let the provider decide (no `prompt` parameter)
    #[default]
    None,
    /// Force the account chooser
    SelectAccount,
    /// Force the consent screen
    Consent,
    /// Force both account chooser and consent screen
    SelectAccountAndConsent,
}

impl PromptPolicy {
    /// The `prompt` query parameter value, if any
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::SelectAccount => Some("select_account"),
            Self::Consent => Some("consent"),
            Self::SelectAccountAndConsent => Some("select_account consent"),
        }
    }
}

/// A single sign-in attempt's authorization parameters
///
/// Constructed once per attempt and not mutated afterwards. The
/// `redirect_target` must be the exact string later passed to the
/// code exchange; the provider rejects an exchange whose
/// `redirect_uri` differs byte-for-byte from the one used here.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Which federated provider to preselect
    pub provider: IdentityProvider,
    /// Resolved redirect target for the current platform
    pub redirect_target: String,
    /// Scopes to request
    pub scopes: Vec<String>,
    /// Re-prompt behavior
    pub prompt: PromptPolicy,
}

impl AuthorizationRequest {
    /// Create a request with the configured scopes and no prompt
    pub fn new(provider: IdentityProvider, redirect_target: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            provider,
            redirect_target: redirect_target.into(),
            scopes,
            prompt: PromptPolicy::None,
        }
    }

    /// Build the absolute authorization URL
    pub fn authorization_url(&self, config: &AuthConfig) -> String {
        let mut url = format!(
            "{}?identity_provider={}&redirect_uri={}&response_type=code&client_id={}&scope={}",
            config.authorize_endpoint(),
            self.provider.as_param(),
            urlencoding::encode(&self.redirect_target),
            urlencoding::encode(&config.client_id),
            urlencoding::encode(&self.scopes.join(" ")),
        );

        if let Some(prompt) = self.prompt.as_param() {
            url.push_str("&prompt=");
            url.push_str(&urlencoding::encode(prompt));
        }

        url
    }
}
