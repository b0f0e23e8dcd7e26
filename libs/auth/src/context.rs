//! Process-wide auth context
//!
//! The owned object the app shell and UI layer talk to. It wraps the
//! coordinator (which owns `AuthState`) with an explicit lifecycle:
//! construct, `bootstrap()` at process start, `sign_out()` to tear
//! down. Nothing here mutates auth state directly: every write goes
//! through a coordinator transition.

use crate::authorize::{IdentityProvider, PromptPolicy};
use crate::callback::CallbackPayload;
use crate::config::AuthConfig;
use crate::coordinator::{AuthState, Coordinator, Navigation, SignInHandle};
use crate::error::AuthResult;
use crate::exchange::{HostedUiExchanger, TokenExchanger};
use crate::password::initiate_password_auth;
use crate::redirect::PlatformContext;
use crate::session::{self, Session, TokenCache};
use crate::token::Claims;

/// The app's authentication surface
pub struct AuthContext {
    coordinator: Coordinator,
    client: reqwest::Client,
}

impl AuthContext {
    /// Create a context talking to the configured Hosted UI
    pub fn new(config: AuthConfig, cache: Box<dyn TokenCache>) -> Self {
        let exchanger = HostedUiExchanger::new(&config);
        Self::with_exchanger(config, Box::new(exchanger), cache)
    }

    /// Create a context with a custom exchanger (tests, embedding)
    pub fn with_exchanger(
        config: AuthConfig,
        exchanger: Box<dyn TokenExchanger>,
        cache: Box<dyn TokenCache>,
    ) -> Self {
        Self {
            coordinator: Coordinator::new(config, exchanger, cache),
            client: reqwest::Client::new(),
        }
    }

    /// Initialize at process start: restore a cached session if one
    /// is still valid
    pub fn bootstrap(&mut self) -> AuthResult<()> {
        self.coordinator.refresh_auth_state()
    }

    /// Rederive the auth state from the session source of truth
    pub fn check_auth_state(&mut self) -> AuthResult<()> {
        self.coordinator.refresh_auth_state()
    }

    /// Current auth state snapshot
    pub fn auth_state(&self) -> &AuthState {
        self.coordinator.auth_state()
    }

    /// Whether a valid session is established
    pub fn is_authenticated(&self) -> bool {
        self.coordinator.auth_state().is_authenticated
    }

    /// The established session, if any
    pub fn current_session(&self) -> Option<&Session> {
        self.coordinator.auth_state().current_session.as_ref()
    }

    /// Initiate the federated Google sign-in flow. The caller opens
    /// the returned URL and later feeds the redirect to
    /// `handle_callback`.
    pub fn sign_in_with_google(&mut self, platform: &PlatformContext) -> AuthResult<SignInHandle> {
        self.coordinator
            .begin_sign_in(IdentityProvider::Google, platform, PromptPolicy::None)
    }

    /// Feed an observed redirect URI to the flow
    pub async fn handle_callback(
        &mut self,
        payload: &CallbackPayload,
        platform: &PlatformContext,
    ) -> Navigation {
        self.coordinator.handle_callback(payload, platform).await
    }

    /// The user dismissed the sign-in surface
    pub fn cancel_sign_in(&mut self) -> Navigation {
        self.coordinator.cancel()
    }

    /// Password sign-in: a pass-through `InitiateAuth` call whose
    /// token bundle goes through the same materializer as the
    /// redirect flow
    pub async fn sign_in(&mut self, username: &str, password: &str) -> AuthResult<Session> {
        let config = self.coordinator.config().clone();
        let bundle = initiate_password_auth(&self.client, &config, username, password).await?;
        let claims = Claims::from_id_token(&bundle.id_token)?;

        let session = session::materialize(
            &claims,
            bundle,
            &config.client_id,
            self.coordinator.cache_mut(),
        );
        self.coordinator.adopt_session(session.clone());
        Ok(session)
    }

    /// Tear down the session and its cached tokens
    pub fn sign_out(&mut self) -> AuthResult<()> {
        self.coordinator.sign_out()
    }

    /// User-facing message for the most recently failed attempt
    pub fn last_failure_message(&self) -> Option<String> {
        self.coordinator.last_failure().map(|e| e.user_message())
    }
}
