//! Session materialization and the local token cache
//!
//! A successful exchange (or password sign-in) is turned into a
//! `Session` and mirrored into a local cache so it survives a process
//! restart. Cache entries use the provider's own key format
//! (`CognitoIdentityServiceProvider.{clientId}.{username}.{kind}`
//! plus a `LastAuthUser` marker), so the stored state matches what
//! the provider SDKs expect to find. A cache write failure degrades
//! gracefully: the in-memory session is still adopted, it just will
//! not survive a restart.

use crate::error::{AuthError, AuthResult};
use crate::exchange::TokenBundle;
use crate::token::Claims;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Provider namespace prefixing every cache key
const CACHE_NAMESPACE: &str = "CognitoIdentityServiceProvider";

/// Marker entry recording which username signed in last
const LAST_AUTH_USER: &str = "LastAuthUser";

/// File name of the on-disk token cache
pub const CACHE_FILE_NAME: &str = "token-cache.toml";

/// Which of the three tokens a cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// The signed ID token
    Id,
    /// The access token
    Access,
    /// The refresh token
    Refresh,
}

impl TokenKind {
    /// Key suffix used in the cache key format
    pub fn key_suffix(&self) -> &'static str {
        match self {
            Self::Id => "idToken",
            Self::Access => "accessToken",
            Self::Refresh => "refreshToken",
        }
    }
}

/// Cache key for one token of one user
pub fn token_key(client_id: &str, username: &str, kind: TokenKind) -> String {
    format!(
        "{}.{}.{}.{}",
        CACHE_NAMESPACE,
        client_id,
        username,
        kind.key_suffix()
    )
}

/// Cache key of the last-authenticated-user marker
pub fn last_user_key(client_id: &str) -> String {
    format!("{}.{}.{}", CACHE_NAMESPACE, client_id, LAST_AUTH_USER)
}

/// An established local session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Resolved username (see `Claims::resolved_username`)
    pub username: String,
    /// The token bundle backing this session
    pub tokens: TokenBundle,
    /// When this session was established
    pub established_at: DateTime<Utc>,
}

/// Key-value store for opaque token strings
pub trait TokenCache: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> AuthResult<Option<String>>;
    /// Write a value, overwriting unconditionally
    fn put(&mut self, key: &str, value: &str) -> AuthResult<()>;
    /// Remove a value if present
    fn remove(&mut self, key: &str) -> AuthResult<()>;
}

/// Build a session from decoded claims and persist its tokens
///
/// Writes are last-writer-wins; any prior entries for the same user
/// are overwritten. A failed write is logged and swallowed; storage
/// faults must not block sign-in.
pub fn materialize(
    claims: &Claims,
    tokens: TokenBundle,
    client_id: &str,
    cache: &mut dyn TokenCache,
) -> Session {
    let username = claims.resolved_username().to_string();

    let entries = [
        (token_key(client_id, &username, TokenKind::Id), tokens.id_token.as_str()),
        (
            token_key(client_id, &username, TokenKind::Access),
            tokens.access_token.as_str(),
        ),
        (
            token_key(client_id, &username, TokenKind::Refresh),
            tokens.refresh_token.as_str(),
        ),
        (last_user_key(client_id), username.as_str()),
    ];

    for (key, value) in entries {
        if let Err(e) = cache.put(&key, value) {
            let degraded = AuthError::CacheWriteFailed(e.to_string());
            tracing::warn!(
                "{}; session will not survive a restart ({})",
                degraded,
                key
            );
        }
    }

    Session {
        username,
        tokens,
        established_at: Utc::now(),
    }
}

/// Rebuild a session from the cache, if a usable one is stored
///
/// Returns `Ok(None)` when no user is recorded, any token entry is
/// missing, or the stored ID token has expired.
pub fn rehydrate(cache: &dyn TokenCache, client_id: &str) -> AuthResult<Option<Session>> {
    let Some(username) = cache.get(&last_user_key(client_id))? else {
        return Ok(None);
    };

    let Some(id_token) = cache.get(&token_key(client_id, &username, TokenKind::Id))? else {
        return Ok(None);
    };
    let Some(access_token) = cache.get(&token_key(client_id, &username, TokenKind::Access))? else {
        return Ok(None);
    };
    let Some(refresh_token) = cache.get(&token_key(client_id, &username, TokenKind::Refresh))?
    else {
        return Ok(None);
    };

    let claims = Claims::from_id_token(&id_token)?;
    if claims.is_expired() {
        tracing::debug!("cached session for {} has expired", username);
        return Ok(None);
    }

    let now = Utc::now();
    let expires_in = claims.exp.map(|exp| exp - now.timestamp()).unwrap_or(0);
    let established_at = claims
        .iat
        .and_then(|iat| Utc.timestamp_opt(iat, 0).single())
        .unwrap_or(now);

    Ok(Some(Session {
        username,
        tokens: TokenBundle {
            id_token,
            access_token,
            refresh_token,
            expires_in,
        },
        established_at,
    }))
}

/// Drop all cache entries for a user (sign-out)
pub fn clear(cache: &mut dyn TokenCache, client_id: &str, username: &str) -> AuthResult<()> {
    cache.remove(&token_key(client_id, username, TokenKind::Id))?;
    cache.remove(&token_key(client_id, username, TokenKind::Access))?;
    cache.remove(&token_key(client_id, username, TokenKind::Refresh))?;
    cache.remove(&last_user_key(client_id))?;
    Ok(())
}

/// Token cache backed by a TOML file in the config directory
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    cache_path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileTokenCache {
    /// Load the cache for the given config directory
    pub fn new(config_dir: &Path) -> AuthResult<Self> {
        let cache_path = config_dir.join(CACHE_FILE_NAME);
        let entries = if cache_path.exists() {
            let content = std::fs::read_to_string(&cache_path)?;
            toml::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            cache_path,
            entries,
        })
    }

    /// Load the cache from the default config directory (~/.tinywins/)
    pub fn from_default_dir() -> AuthResult<Self> {
        Self::new(&default_config_dir()?)
    }

    /// Path of the backing file
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    fn save(&self) -> AuthResult<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self.entries)?;

        // Write to a temp file first, then rename for atomicity
        let temp_path = self.cache_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content)?;

        // Tokens are credentials: owner read/write only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&temp_path, permissions)?;
        }

        std::fs::rename(&temp_path, &self.cache_path)?;

        Ok(())
    }
}

impl TokenCache for FileTokenCache {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> AuthResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn remove(&mut self, key: &str) -> AuthResult<()> {
        if self.entries.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}

/// Default config directory for the app
pub fn default_config_dir() -> AuthResult<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        AuthError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".tinywins"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use tempfile::TempDir;

    fn make_id_token(payload_json: &str) -> String {
        format!("header.{}.signature", URL_SAFE_NO_PAD.encode(payload_json))
    }

    fn bundle_with_id_token(id_token: &str) -> TokenBundle {
        TokenBundle {
            id_token: id_token.to_string(),
            access_token: "A".to_string(),
            refresh_token: "R".to_string(),
            expires_in: 3600,
        }
    }

    fn temp_cache() -> (FileTokenCache, TempDir) {
        let temp = TempDir::new().unwrap();
        let cache = FileTokenCache::new(temp.path()).unwrap();
        (cache, temp)
    }

    #[test]
    fn test_key_format() {
        assert_eq!(
            token_key("client-123", "alice", TokenKind::Id),
            "CognitoIdentityServiceProvider.client-123.alice.idToken"
        );
        assert_eq!(
            token_key("client-123", "alice", TokenKind::Access),
            "CognitoIdentityServiceProvider.client-123.alice.accessToken"
        );
        assert_eq!(
            token_key("client-123", "alice", TokenKind::Refresh),
            "CognitoIdentityServiceProvider.client-123.alice.refreshToken"
        );
        assert_eq!(
            last_user_key("client-123"),
            "CognitoIdentityServiceProvider.client-123.LastAuthUser"
        );
    }

    #[test]
    fn test_materialize_username_claim_wins_over_email() {
        let id_token =
            make_id_token(r#"{"cognito:username":"alice","email":"alice@x.com","sub":"uuid-1"}"#);
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        let session = materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);
        assert_eq!(session.username, "alice");
    }

    #[test]
    fn test_materialize_email_wins_over_sub() {
        let id_token = make_id_token(r#"{"email":"alice@x.com","sub":"uuid-1"}"#);
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        let session = materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);
        assert_eq!(session.username, "alice@x.com");
    }

    #[test]
    fn test_materialize_writes_all_entries() {
        let id_token = make_id_token(r#"{"cognito:username":"alice","sub":"uuid-1"}"#);
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);

        assert_eq!(
            cache.get(&token_key("client-123", "alice", TokenKind::Id)).unwrap(),
            Some(id_token)
        );
        assert_eq!(
            cache.get(&token_key("client-123", "alice", TokenKind::Access)).unwrap(),
            Some("A".to_string())
        );
        assert_eq!(
            cache.get(&token_key("client-123", "alice", TokenKind::Refresh)).unwrap(),
            Some("R".to_string())
        );
        assert_eq!(
            cache.get(&last_user_key("client-123")).unwrap(),
            Some("alice".to_string())
        );
    }

    #[test]
    fn test_materialize_overwrites_prior_entries() {
        let id_token = make_id_token(r#"{"cognito:username":"alice","sub":"uuid-1"}"#);
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);

        let mut newer = bundle_with_id_token(&id_token);
        newer.access_token = "A2".to_string();
        materialize(&claims, newer, "client-123", &mut cache);

        assert_eq!(
            cache.get(&token_key("client-123", "alice", TokenKind::Access)).unwrap(),
            Some("A2".to_string())
        );
    }

    /// Cache that refuses every write
    struct BrokenCache;

    impl TokenCache for BrokenCache {
        fn get(&self, _key: &str) -> AuthResult<Option<String>> {
            Ok(None)
        }
        fn put(&mut self, _key: &str, _value: &str) -> AuthResult<()> {
            Err(AuthError::CacheWriteFailed("disk full".to_string()))
        }
        fn remove(&mut self, _key: &str) -> AuthResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_materialize_survives_cache_failure() {
        let id_token = make_id_token(r#"{"cognito:username":"alice","sub":"uuid-1"}"#);
        let claims = Claims::from_id_token(&id_token).unwrap();
        let mut cache = BrokenCache;

        // The session is still built even though nothing persisted
        let session = materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);
        assert_eq!(session.username, "alice");
    }

    #[test]
    fn test_rehydrate_round_trip() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let id_token = make_id_token(&format!(
            r#"{{"cognito:username":"alice","sub":"uuid-1","iat":1735600000,"exp":{}}}"#,
            exp
        ));
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);

        let session = rehydrate(&cache, "client-123").unwrap().unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(session.tokens.id_token, id_token);
        assert_eq!(session.established_at.timestamp(), 1735600000);
        assert!(session.tokens.expires_in > 0);
    }

    #[test]
    fn test_rehydrate_empty_cache() {
        let (cache, _temp) = temp_cache();
        assert_eq!(rehydrate(&cache, "client-123").unwrap(), None);
    }

    #[test]
    fn test_rehydrate_rejects_expired_token() {
        let exp = chrono::Utc::now().timestamp() - 60;
        let id_token = make_id_token(&format!(
            r#"{{"cognito:username":"alice","sub":"uuid-1","exp":{}}}"#,
            exp
        ));
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);
        assert_eq!(rehydrate(&cache, "client-123").unwrap(), None);
    }

    #[test]
    fn test_rehydrate_missing_token_entry() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let id_token = make_id_token(&format!(
            r#"{{"cognito:username":"alice","sub":"uuid-1","exp":{}}}"#,
            exp
        ));
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);
        cache
            .remove(&token_key("client-123", "alice", TokenKind::Refresh))
            .unwrap();

        assert_eq!(rehydrate(&cache, "client-123").unwrap(), None);
    }

    #[test]
    fn test_clear_removes_all_entries() {
        let id_token = make_id_token(r#"{"cognito:username":"alice","sub":"uuid-1"}"#);
        let claims = Claims::from_id_token(&id_token).unwrap();
        let (mut cache, _temp) = temp_cache();

        materialize(&claims, bundle_with_id_token(&id_token), "client-123", &mut cache);
        clear(&mut cache, "client-123", "alice").unwrap();

        assert_eq!(cache.get(&last_user_key("client-123")).unwrap(), None);
        assert_eq!(
            cache.get(&token_key("client-123", "alice", TokenKind::Id)).unwrap(),
            None
        );
    }

    #[test]
    fn test_file_cache_persistence() {
        let temp = TempDir::new().unwrap();

        {
            let mut cache = FileTokenCache::new(temp.path()).unwrap();
            cache.put("some.key", "some-value").unwrap();
        }

        {
            let cache = FileTokenCache::new(temp.path()).unwrap();
            assert_eq!(cache.get("some.key").unwrap(), Some("some-value".to_string()));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_file_cache_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut cache = FileTokenCache::new(temp.path()).unwrap();
        cache.put("some.key", "some-value").unwrap();

        let metadata = std::fs::metadata(cache.cache_path()).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}
