//! Storage for the current session's auth token.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::Clock;
use crate::error::TokenStoreError;

/// Where the current auth token lives.
///
/// The choice between a short-lived session token and a remembered one is
/// expressed through the TTL passed to `set_token`.
pub trait TokenStore: Send + Sync {
    /// The stored token, unless it has expired.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError` if the backing store is unavailable.
    fn get_token(&self) -> Result<Option<String>, TokenStoreError>;

    /// Replace the stored token. `None` keeps it until cleared.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError` if the backing store is unavailable.
    fn set_token(&self, token: String, ttl: Option<Duration>) -> Result<(), TokenStoreError>;

    /// # Errors
    ///
    /// Returns `TokenStoreError` if the backing store is unavailable.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

#[derive(Debug)]
struct StoredToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct TokenState {
    clock: Clock,
    current: Option<StoredToken>,
}

/// Process-local token store that honors TTLs against its clock.
#[derive(Debug)]
pub struct InMemoryTokenStore {
    state: Mutex<TokenState>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            state: Mutex::new(TokenState {
                clock,
                current: None,
            }),
        }
    }

    /// Move a fixed clock forward. Has no effect on the system clock.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError` if the lock is poisoned.
    pub fn advance_clock(&self, delta: Duration) -> Result<(), TokenStoreError> {
        self.lock()?.clock.advance(delta);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, TokenState>, TokenStoreError> {
        self.state
            .lock()
            .map_err(|e| TokenStoreError::Poisoned(e.to_string()))
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get_token(&self) -> Result<Option<String>, TokenStoreError> {
        let mut state = self.lock()?;
        let now = state.clock.now();
        let expired = state
            .current
            .as_ref()
            .and_then(|stored| stored.expires_at)
            .is_some_and(|expires_at| expires_at <= now);
        if expired {
            tracing::debug!("auth token expired");
            state.current = None;
        }
        Ok(state.current.as_ref().map(|stored| stored.token.clone()))
    }

    fn set_token(&self, token: String, ttl: Option<Duration>) -> Result<(), TokenStoreError> {
        let mut state = self.lock()?;
        let expires_at = ttl.map(|ttl| state.clock.now() + ttl);
        state.current = Some(StoredToken { token, expires_at });
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        self.lock()?.current = None;
        Ok(())
    }
}
