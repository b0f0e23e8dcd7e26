pub mod login;
pub mod logout;
pub mod status;

use std::path::Path;
use tinywins_auth::{AuthConfig, AuthContext, FileTokenCache};

/// Build the auth context shared by every command
pub fn build_context(config_path: &Path) -> Result<AuthContext, String> {
    let config = AuthConfig::from_outputs_file(config_path)
        .map_err(|e| format!("Failed to load {}: {}", config_path.display(), e))?;
    let cache =
        FileTokenCache::from_default_dir().map_err(|e| format!("Failed to open token cache: {}", e))?;
    tracing::debug!("token cache at {}", cache.cache_path().display());
    Ok(AuthContext::new(config, Box::new(cache)))
}
