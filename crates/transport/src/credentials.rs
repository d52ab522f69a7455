//! Bearer-token sources.
//!
//! Every provider here is read-only from the dispatcher's point of view and
//! is consulted afresh on each call, so a token written by some other process
//! (a login flow, a secrets agent) is picked up without a restart. Empty or
//! whitespace-only values count as absent.

use std::io;
use std::path::{Path, PathBuf};

use dispatch::CredentialProvider;

/// Key under which the bearer token is stored.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Environment variable read by [`EnvCredentials::default`].
pub const DEFAULT_TOKEN_ENV: &str = "ACCESS_TOKEN";

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------

/// Never supplies a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------

/// Supplies the same token on every call.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        non_blank(self.0.clone())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

// ---------------------------------------------------------------------------

/// Reads the token from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV)
    }
}

impl CredentialProvider for EnvCredentials {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_blank)
    }
}

// ---------------------------------------------------------------------------

/// A directory of small files, one per key.
///
/// Keys must be plain file names; anything containing a path separator or a
/// leading dot is treated as missing.
#[derive(Debug, Clone)]
pub struct KeyedFileStore {
    dir: PathBuf,
}

impl KeyedFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the trimmed value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        if !is_plain_key(key) {
            tracing::warn!(key, "Rejected credential store key");
            return None;
        }
        let path = self.dir.join(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => non_blank(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Credential store unreadable");
                None
            }
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && !key.contains(['/', '\\'])
}

/// The token held in a [`KeyedFileStore`] under [`ACCESS_TOKEN_KEY`].
#[derive(Debug, Clone)]
pub struct StoredToken {
    store: KeyedFileStore,
    key: String,
}

impl StoredToken {
    pub fn new(store: KeyedFileStore) -> Self {
        Self::with_key(store, ACCESS_TOKEN_KEY)
    }

    pub fn with_key(store: KeyedFileStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }
}

impl CredentialProvider for StoredToken {
    fn bearer_token(&self) -> Option<String> {
        self.store.get(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_trims_and_rejects_blank() {
        assert_eq!(StaticToken::new(" t0k \n").bearer_token().as_deref(), Some("t0k"));
        assert_eq!(StaticToken::new("   ").bearer_token(), None);
    }

    #[test]
    fn static_token_debug_is_redacted() {
        let text = format!("{:?}", StaticToken::new("secret"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn missing_env_var_is_absent() {
        let creds = EnvCredentials::new("COURIER_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert_eq!(creds.bearer_token(), None);
    }

    #[test]
    fn stored_token_is_read_fresh_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let creds = StoredToken::new(KeyedFileStore::new(dir.path()));
        assert_eq!(creds.bearer_token(), None);

        std::fs::write(dir.path().join(ACCESS_TOKEN_KEY), "first\n").unwrap();
        assert_eq!(creds.bearer_token().as_deref(), Some("first"));

        std::fs::write(dir.path().join(ACCESS_TOKEN_KEY), "second").unwrap();
        assert_eq!(creds.bearer_token().as_deref(), Some("second"));

        std::fs::remove_file(dir.path().join(ACCESS_TOKEN_KEY)).unwrap();
        assert_eq!(creds.bearer_token(), None);
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = KeyedFileStore::new(dir.path());
        assert_eq!(store.get("../access_token"), None);
        assert_eq!(store.get(".hidden"), None);
        assert_eq!(store.get(""), None);
    }
}
