//! Single-session authentication gate.
//!
//! At most one token is valid at a time. Logging in replaces it; logging out
//! or letting the TTL lapse clears it. Authentication proves knowledge of the
//! shared password only; there are no user identities.

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use notebook_core::defaults::TOKEN_BYTES;
use notebook_core::{Error, Result, TokenStore};

/// Issues and checks the session token.
#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn TokenStore>,
    hashed_password: Option<String>,
    ttl: Duration,
}

impl SessionGate {
    /// `hashed_password` is an Argon2 PHC string; `None` refuses every login.
    pub fn new(store: Arc<dyn TokenStore>, hashed_password: Option<String>, ttl: Duration) -> Self {
        Self {
            store,
            hashed_password,
            ttl,
        }
    }

    /// Verify `password` and open a new session, replacing any active one.
    pub async fn authenticate(&self, password: &str) -> Result<String> {
        let hash = self
            .hashed_password
            .as_deref()
            .ok_or_else(|| Error::Auth("login is not configured".to_string()))?;
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::Auth(format!("stored password hash is invalid: {e}")))?;

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            warn!(subsystem = "auth", op = "authenticate", "Password mismatch");
            return Err(Error::Auth("invalid password".to_string()));
        }

        let token = generate_token();
        self.store.set(&token, self.ttl).await?;
        info!(
            subsystem = "auth",
            op = "authenticate",
            ttl_secs = self.ttl.as_secs(),
            "Session opened"
        );
        Ok(token)
    }

    /// Whether `token` is the active session token.
    ///
    /// Store failures count as unauthenticated.
    pub async fn is_authenticated(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        match self.store.get().await {
            Ok(Some(active)) => bool::from(active.as_bytes().ct_eq(token.as_bytes())),
            Ok(None) => false,
            Err(e) => {
                warn!(
                    subsystem = "auth",
                    op = "is_authenticated",
                    error = %e,
                    "Token lookup failed, treating caller as unauthenticated"
                );
                false
            }
        }
    }

    /// Close the active session. Succeeds when none is open.
    pub async fn logout(&self) -> Result<()> {
        self.store.delete().await?;
        info!(subsystem = "auth", op = "logout", "Session closed");
        Ok(())
    }
}

/// 32 bytes from the OS RNG, standard base64.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Hash `password` into an Argon2id PHC string for `AUTH_HASHED_PASSWORD`.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| Error::Internal(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(e.to_string()))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::token_store::MemoryTokenStore;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl TokenStore for BrokenStore {
        async fn get(&self) -> Result<Option<String>> {
            Err(Error::Cache("connection refused".to_string()))
        }
        async fn set(&self, _token: &str, _ttl: Duration) -> Result<()> {
            Err(Error::Cache("connection refused".to_string()))
        }
        async fn delete(&self) -> Result<()> {
            Err(Error::Cache("connection refused".to_string()))
        }
    }

    fn gate(ttl: Duration) -> SessionGate {
        let hash = hash_password("hunter2").unwrap();
        SessionGate::new(Arc::new(MemoryTokenStore::new()), Some(hash), ttl)
    }

    #[tokio::test]
    async fn test_login_check_logout() {
        let gate = gate(Duration::from_secs(60));

        let token = gate.authenticate("hunter2").await.unwrap();
        assert!(gate.is_authenticated(&token).await);
        assert!(!gate.is_authenticated("forged").await);
        assert!(!gate.is_authenticated("").await);

        gate.logout().await.unwrap();
        assert!(!gate.is_authenticated(&token).await);
        gate.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_password_is_auth_error() {
        let gate = gate(Duration::from_secs(60));
        let err = gate.authenticate("hunter3").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_new_login_replaces_previous_token() {
        let gate = gate(Duration::from_secs(60));
        let first = gate.authenticate("hunter2").await.unwrap();
        let second = gate.authenticate("hunter2").await.unwrap();
        assert_ne!(first, second);
        assert!(!gate.is_authenticated(&first).await);
        assert!(gate.is_authenticated(&second).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_expires_after_ttl() {
        let gate = gate(Duration::from_secs(3 * 24 * 3600));
        let token = gate.authenticate("hunter2").await.unwrap();

        tokio::time::advance(Duration::from_secs(3 * 24 * 3600 - 1)).await;
        assert!(gate.is_authenticated(&token).await);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!gate.is_authenticated(&token).await);
    }

    #[tokio::test]
    async fn test_unset_or_malformed_hash_refuses_login() {
        let unset = SessionGate::new(Arc::new(MemoryTokenStore::new()), None, Duration::from_secs(1));
        assert!(matches!(unset.authenticate("x").await, Err(Error::Auth(_))));

        let malformed = SessionGate::new(
            Arc::new(MemoryTokenStore::new()),
            Some("not-a-phc-string".to_string()),
            Duration::from_secs(1),
        );
        assert!(matches!(malformed.authenticate("x").await, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn test_store_failure_fails_closed() {
        let gate = SessionGate::new(Arc::new(BrokenStore), None, Duration::from_secs(1));
        assert!(!gate.is_authenticated("anything").await);
        assert!(matches!(gate.logout().await, Err(Error::Cache(_))));
    }

    #[test]
    fn test_generated_token_shape() {
        let token = generate_token();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&token)
            .unwrap();
        assert_eq!(decoded.len(), TOKEN_BYTES);
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn test_near_miss_tokens_rejected() {
        let gate = gate(Duration::from_secs(60));
        let token = gate.authenticate("hunter2").await.unwrap();

        let mut altered = token.clone().into_bytes();
        let last = altered.len() - 1;
        altered[last] = if altered[last] == b'A' { b'B' } else { b'A' };
        let altered = String::from_utf8(altered).unwrap();

        assert!(!gate.is_authenticated(&altered).await);
        assert!(!gate.is_authenticated(&token[..token.len() - 1]).await);
        assert!(!gate.is_authenticated(&format!("{token}=")).await);
        assert!(gate.is_authenticated(&token).await);
    }
}
