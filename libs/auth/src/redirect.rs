//! Redirect target resolution
//!
//! Picks exactly one redirect target for the current runtime context.
//! The resolved string must be threaded unchanged from the
//! authorization URL into the code exchange; the provider rejects an
//! exchange whose `redirect_uri` is not byte-for-byte the one the
//! code was issued for. The target lives only in flow state and is
//! never persisted with the session.

use crate::config::AuthConfig;

/// Redirect-proxy registration used by the managed dev sandbox, which
/// cannot deliver custom-scheme links directly to the app
const DEV_PROXY_REDIRECT: &str = "https://auth.expo.io/@anonymous/tinywins";

/// Where the flow is running, which decides the redirect target and
/// how the callback comes back. Adding a platform is a one-case
/// addition here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformContext {
    /// Page-rendering browser context
    Browser {
        /// Current page origin, e.g. "https://app.tinywins.io"
        origin: String,
    },
    /// Managed development sandbox proxying deep links through a
    /// third-party redirect service
    DevSandbox,
    /// Installed native shell with a registered custom URI scheme
    Native,
}

/// How the eventual callback reaches the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackChannel {
    /// Callback URI observed as the page URL (query parameters)
    UrlQuery,
    /// Callback URI delivered as a deep-link event
    DeepLink,
}

impl PlatformContext {
    /// Resolve the redirect target for this platform
    pub fn resolve_redirect_target(&self, config: &AuthConfig) -> String {
        match self {
            Self::Browser { origin } => {
                format!("{}/callback", origin.trim_end_matches('/'))
            }
            Self::DevSandbox => config
                .dev_proxy_redirect
                .clone()
                .unwrap_or_else(|| DEV_PROXY_REDIRECT.to_string()),
            Self::Native => format!("{}://callback", config.native_scheme),
        }
    }

    /// The side channel that will carry the callback back to us
    pub fn callback_channel(&self) -> CallbackChannel {
        match self {
            Self::Browser { .. } => CallbackChannel::UrlQuery,
            Self::DevSandbox | Self::Native => CallbackChannel::DeepLink,
        }
    }
}
