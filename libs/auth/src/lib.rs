//! Client-side sign-in flow for the TinyWins app
//!
//! Converts a Cognito Hosted UI OAuth redirect into a locally valid,
//! persisted session, across browser, web-view and native-shell
//! flows, with idempotent callback handling.
//!
//! # Architecture
//!
//! - `config`: Hosted UI / user pool configuration
//! - `error`: error taxonomy for the flow
//! - `token`: signed-token payload decoding (no verification; see
//!   module docs for the trust boundary)
//! - `authorize`: authorization URL construction
//! - `redirect`: per-platform redirect target resolution
//! - `callback`: callback URI parsing
//! - `exchange`: authorization-code exchange
//! - `session`: session materialization and the local token cache
//! - `coordinator`: the state machine owning the end-to-end attempt
//! - `context`: the consumer-facing auth surface
//! - `password`: pass-through password sign-in
//!
//! # Example
//!
//! ```rust,ignore
//! use tinywins_auth::{AuthConfig, AuthContext, CallbackPayload, FileTokenCache, PlatformContext};
//!
//! let config = AuthConfig::from_outputs_file(std::path::Path::new("amplify_outputs.json"))?;
//! let cache = FileTokenCache::from_default_dir()?;
//! let mut auth = AuthContext::new(config, Box::new(cache));
//! auth.bootstrap()?;
//!
//! let handle = auth.sign_in_with_google(&PlatformContext::Native)?;
//! // User visits handle.authorization_url; the redirect comes back:
//! let payload = CallbackPayload::parse("tinywinsmobile://callback?code=...");
//! let navigation = auth.handle_callback(&payload, &PlatformContext::Native).await;
//! ```

pub mod authorize;
pub mod callback;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod exchange;
pub mod password;
pub mod redirect;
pub mod session;
pub mod token;

// Re-export commonly used types
pub use authorize::{AuthorizationRequest, IdentityProvider, PromptPolicy};
pub use callback::CallbackPayload;
pub use config::AuthConfig;
pub use context::AuthContext;
pub use coordinator::{
    AuthState, CallbackAction, Coordinator, FlowState, Generation, Navigation, SignInHandle,
};
pub use error::{AuthError, AuthResult};
pub use exchange::{HostedUiExchanger, TokenBundle, TokenExchanger};
pub use redirect::{CallbackChannel, PlatformContext};
pub use session::{FileTokenCache, Session, TokenCache, TokenKind};
pub use token::Claims;
