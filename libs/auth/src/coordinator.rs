//! Callback coordination
//!
//! One state machine owns the end-to-end path from "redirect
//! observed" to "session established or attempt failed", and every
//! platform entry point (page URL, deep-link event, initial launch
//! URL) feeds it through the same two calls: `observe_callback` and
//! `complete_exchange`. The machine is the only writer of
//! `AuthState`, which is what keeps a late callback from racing a
//! user-initiated sign-out.
//!
//! Transitions are synchronous; the suspension points (opening the
//! sign-in surface, the network exchange) happen between them. Each
//! attempt carries a generation number so a completion that arrives
//! after its attempt was cancelled or superseded is dropped without
//! touching any state.

use crate::authorize::{AuthorizationRequest, IdentityProvider, PromptPolicy};
use crate::callback::CallbackPayload;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::exchange::{TokenBundle, TokenExchanger};
use crate::redirect::PlatformContext;
use crate::session::{self, Session, TokenCache};
use crate::token::Claims;

/// Monotonic tag distinguishing sign-in attempts
pub type Generation = u64;

/// Where the coordinator is within the current attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No sign-in in progress
    Idle,
    /// Sign-in surface opened, waiting for the redirect
    AwaitingRedirect,
    /// Authorization code handed to the exchanger
    Exchanging,
    /// Exchange succeeded, building and persisting the session
    Materializing,
}

/// The single navigation decision made when an attempt settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Nothing to do (trigger was ignored or dropped)
    None,
    /// Attempt succeeded: go to the main application surface
    ToMain,
    /// Attempt failed: go back to the sign-in surface
    ToSignIn,
}

/// Process-wide authentication state, owned by the coordinator
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    /// The established session, if any
    pub current_session: Option<Session>,
    /// Whether a state rederivation is in progress
    pub is_loading: bool,
    /// Whether a valid session is established
    pub is_authenticated: bool,
}

/// Everything a platform shell needs to drive one sign-in attempt
#[derive(Debug, Clone)]
pub struct SignInHandle {
    /// URL to open in the browser or web view
    pub authorization_url: String,
    /// Redirect target resolved for this attempt
    pub redirect_target: String,
    /// Generation of this attempt
    pub generation: Generation,
}

/// What an observed callback requires of the caller
#[derive(Debug)]
pub enum CallbackAction {
    /// Unrelated or duplicate trigger: nothing happened
    Ignored,
    /// Run the code exchange, then call `complete_exchange`
    Exchange {
        /// The authorization code to exchange
        code: String,
        /// Redirect target the code was issued for
        redirect_target: String,
        /// Generation to pass back to `complete_exchange`
        generation: Generation,
    },
    /// The attempt settled without an exchange (provider error)
    Settled(Navigation),
}

/// The coordinating state machine for sign-in attempts
pub struct Coordinator {
    config: AuthConfig,
    exchanger: Box<dyn TokenExchanger>,
    cache: Box<dyn TokenCache>,
    state: FlowState,
    generation: Generation,
    redirect_target: Option<String>,
    in_flight_code: Option<String>,
    auth_state: AuthState,
    last_failure: Option<AuthError>,
}

impl Coordinator {
    /// Create a coordinator over the given exchanger and cache
    pub fn new(
        config: AuthConfig,
        exchanger: Box<dyn TokenExchanger>,
        cache: Box<dyn TokenCache>,
    ) -> Self {
        Self {
            config,
            exchanger,
            cache,
            state: FlowState::Idle,
            generation: 0,
            redirect_target: None,
            in_flight_code: None,
            auth_state: AuthState::default(),
            last_failure: None,
        }
    }

    /// Current flow state
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Current auth state (read-only; all writes go through the
    /// coordinator's transitions)
    pub fn auth_state(&self) -> &AuthState {
        &self.auth_state
    }

    /// The failure that settled the most recent attempt, if any
    pub fn last_failure(&self) -> Option<&AuthError> {
        self.last_failure.as_ref()
    }

    /// Rederive the auth state from the local cache
    ///
    /// Called at process start and after any event that may have
    /// changed the stored session. An unreadable or expired cached
    /// session clears the state rather than failing the process.
    pub fn refresh_auth_state(&mut self) -> AuthResult<()> {
        self.auth_state.is_loading = true;

        let result = session::rehydrate(self.cache.as_ref(), &self.config.client_id);
        self.auth_state.is_loading = false;

        match result {
            Ok(Some(restored)) => {
                tracing::debug!("restored cached session for {}", restored.username);
                self.auth_state.current_session = Some(restored);
                self.auth_state.is_authenticated = true;
                Ok(())
            }
            Ok(None) => {
                self.auth_state.current_session = None;
                self.auth_state.is_authenticated = false;
                Ok(())
            }
            Err(e) => {
                // Session validation failed: tear down rather than
                // keep a session we cannot trust
                self.auth_state.current_session = None;
                self.auth_state.is_authenticated = false;
                Err(e)
            }
        }
    }

    /// Initiate a federated sign-in attempt
    ///
    /// Resolves the redirect target for the platform, builds the
    /// authorization URL and moves to `AwaitingRedirect`. The caller
    /// opens the URL; the redirect comes back through
    /// `observe_callback`.
    pub fn begin_sign_in(
        &mut self,
        provider: IdentityProvider,
        platform: &PlatformContext,
        prompt: PromptPolicy,
    ) -> AuthResult<SignInHandle> {
        if self.state != FlowState::Idle {
            return Err(AuthError::FlowBusy);
        }

        self.generation += 1;
        let redirect_target = platform.resolve_redirect_target(&self.config);

        let mut request = AuthorizationRequest::new(
            provider,
            redirect_target.clone(),
            self.config.scopes.clone(),
        );
        request.prompt = prompt;
        let authorization_url = request.authorization_url(&self.config);

        self.state = FlowState::AwaitingRedirect;
        self.redirect_target = Some(redirect_target.clone());
        self.in_flight_code = None;
        tracing::debug!(
            "sign-in attempt {} awaiting redirect via {}",
            self.generation,
            redirect_target
        );

        Ok(SignInHandle {
            authorization_url,
            redirect_target,
            generation: self.generation,
        })
    }

    /// Classify an observed redirect URI
    ///
    /// No network work happens here; when an exchange is required the
    /// caller runs it and reports back through `complete_exchange`.
    ///
    /// A payload with neither `code` nor `error` is ignored without
    /// any transition. A duplicate trigger carrying the code already
    /// in flight is ignored, which is what guarantees a single
    /// exchange when both a deep-link event and an initial-URL check
    /// fire for the same launch.
    ///
    /// `platform` is needed because a full-page browser redirect
    /// restarts the process: the coordinator wakes up `Idle` with the
    /// callback as its first event, and the redirect target must be
    /// re-resolved (deterministically) for the exchange.
    pub fn observe_callback(
        &mut self,
        payload: &CallbackPayload,
        platform: &PlatformContext,
    ) -> CallbackAction {
        if payload.is_noop() {
            return CallbackAction::Ignored;
        }

        if let Some(error) = &payload.error {
            return match self.state {
                FlowState::Idle | FlowState::AwaitingRedirect => {
                    let err =
                        AuthError::provider_error(error.clone(), payload.error_description.clone());
                    CallbackAction::Settled(self.settle_failure(err))
                }
                // An exchange is already running; a straggling error
                // redirect cannot fail it
                FlowState::Exchanging | FlowState::Materializing => CallbackAction::Ignored,
            };
        }

        let Some(code) = payload.code.clone() else {
            return CallbackAction::Ignored;
        };

        if self.in_flight_code.as_deref() == Some(code.as_str()) {
            tracing::debug!("duplicate callback for known code ignored");
            return CallbackAction::Ignored;
        }

        match self.state {
            FlowState::AwaitingRedirect => {
                let redirect_target = self
                    .redirect_target
                    .clone()
                    .unwrap_or_else(|| platform.resolve_redirect_target(&self.config));
                self.state = FlowState::Exchanging;
                self.in_flight_code = Some(code.clone());
                CallbackAction::Exchange {
                    code,
                    redirect_target,
                    generation: self.generation,
                }
            }
            FlowState::Idle => {
                // Cold start after a full-page redirect: begin the
                // attempt implicitly
                self.generation += 1;
                let redirect_target = platform.resolve_redirect_target(&self.config);
                self.state = FlowState::Exchanging;
                self.redirect_target = Some(redirect_target.clone());
                self.in_flight_code = Some(code.clone());
                CallbackAction::Exchange {
                    code,
                    redirect_target,
                    generation: self.generation,
                }
            }
            FlowState::Exchanging | FlowState::Materializing => CallbackAction::Ignored,
        }
    }

    /// Commit or discard the result of an exchange
    ///
    /// A completion is committed only if its generation is still
    /// current and the machine is still in `Exchanging`; anything
    /// else is a stale response from a cancelled or superseded
    /// attempt and is dropped without mutating `AuthState`.
    pub fn complete_exchange(
        &mut self,
        generation: Generation,
        result: AuthResult<TokenBundle>,
    ) -> Navigation {
        if generation != self.generation || self.state != FlowState::Exchanging {
            tracing::debug!("dropping stale exchange completion (attempt {})", generation);
            return Navigation::None;
        }

        let bundle = match result {
            Ok(bundle) => bundle,
            Err(e) => return self.settle_failure(e),
        };

        self.state = FlowState::Materializing;

        let claims = match Claims::from_id_token(&bundle.id_token) {
            Ok(claims) => claims,
            Err(e) => return self.settle_failure(e),
        };

        let session =
            session::materialize(&claims, bundle, &self.config.client_id, self.cache.as_mut());
        tracing::debug!("session established for {}", session.username);

        self.auth_state.current_session = Some(session);
        self.auth_state.is_authenticated = true;
        self.auth_state.is_loading = false;

        self.settle_success()
    }

    /// Drive one observed callback end to end: classify, exchange if
    /// needed, commit.
    pub async fn handle_callback(
        &mut self,
        payload: &CallbackPayload,
        platform: &PlatformContext,
    ) -> Navigation {
        match self.observe_callback(payload, platform) {
            CallbackAction::Ignored => Navigation::None,
            CallbackAction::Settled(navigation) => navigation,
            CallbackAction::Exchange {
                code,
                redirect_target,
                generation,
            } => {
                let result = self.exchanger.exchange(&code, &redirect_target).await;
                self.complete_exchange(generation, result)
            }
        }
    }

    /// The user dismissed or cancelled the sign-in surface
    pub fn cancel(&mut self) -> Navigation {
        if self.state == FlowState::Idle {
            return Navigation::None;
        }
        self.settle_failure(AuthError::UserCancelled)
    }

    /// Adopt a session established outside the redirect flow
    /// (password sign-in goes through here so the coordinator remains
    /// the only `AuthState` writer)
    pub(crate) fn adopt_session(&mut self, session: Session) {
        self.auth_state.current_session = Some(session);
        self.auth_state.is_authenticated = true;
        self.auth_state.is_loading = false;
    }

    /// Mutable access to the cache for non-flow writers (the password
    /// sign-in materialization)
    pub(crate) fn cache_mut(&mut self) -> &mut dyn TokenCache {
        self.cache.as_mut()
    }

    /// Configuration this coordinator was built with
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Tear down the session: clear auth state and stored tokens.
    /// Also invalidates any in-flight attempt so a late completion
    /// cannot resurrect the session.
    pub fn sign_out(&mut self) -> AuthResult<()> {
        self.generation += 1;
        self.state = FlowState::Idle;
        self.in_flight_code = None;
        self.redirect_target = None;

        let session = self.auth_state.current_session.take();
        self.auth_state.is_authenticated = false;

        if let Some(session) = session {
            session::clear(self.cache.as_mut(), &self.config.client_id, &session.username)?;
        }
        Ok(())
    }

    /// Settle the attempt as failed. The settled state makes exactly
    /// one navigation decision and immediately resets to `Idle`.
    fn settle_failure(&mut self, err: AuthError) -> Navigation {
        tracing::debug!("sign-in attempt {} failed: {}", self.generation, err);
        self.last_failure = Some(err);
        self.state = FlowState::Idle;
        self.redirect_target = None;
        Navigation::ToSignIn
    }

    /// Settle the attempt as succeeded and reset to `Idle`.
    fn settle_success(&mut self) -> Navigation {
        self.last_failure = None;
        self.state = FlowState::Idle;
        self.redirect_target = None;
        Navigation::ToMain
    }
}
