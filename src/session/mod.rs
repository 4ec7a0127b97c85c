//! Client-held session credential: a bearer token and its expiry, always
//! persisted and cleared as a pair.

mod clock;
mod cookie_store;
pub mod guard;
mod memory;
pub mod watch;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SharedClock, SystemClock};
pub use cookie_store::CookieSessionStore;
pub use guard::{guard_protected, guard_public_only};
pub use memory::MemorySessionStore;
pub use watch::{ExpiryMonitor, SessionNotice, expiry_events};

use chrono::Duration;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "authToken";
pub const EXPIRY_KEY: &str = "authTokenExpiry";
pub const SESSION_TTL_HOURS: i64 = 5;

pub fn session_ttl() -> Duration {
    Duration::hours(SESSION_TTL_HOURS)
}

/// The two persisted entries as read back from a store. Either half may be
/// missing when the store was tampered with or partially expired.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredCredential {
    pub token: Option<String>,
    pub expiry: Option<String>,
}

/// Persistence seam for the credential. Implementations write and clear both
/// entries together; nothing outside [`SessionManager`] should call them.
pub trait SessionStore {
    fn save(&mut self, token: &str, expiry_ms: i64);
    fn read(&self) -> StoredCredential;
    fn clear(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// A credential was present but past its expiry (or unreadable). Both
    /// entries have been removed.
    Expired,
    Absent,
}

pub struct SessionManager<S, C> {
    store: S,
    clock: C,
}

impl<S: SessionStore, C: Clock> SessionManager<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Persist a freshly issued token with a fixed five hour lifetime.
    pub fn save(&mut self, token: &str) {
        let expires_at = self.clock.now_ms() + session_ttl().num_milliseconds();
        self.store.save(token, expires_at);
        debug!(expires_at, "session credential saved");
    }

    /// Check the credential and clean it up when it is no longer usable.
    ///
    /// Not read-only: an expired or corrupt credential is cleared as part of
    /// the check, so every later call reports [`SessionState::Absent`].
    pub fn check(&mut self) -> SessionState {
        let StoredCredential { token, expiry } = self.store.read();

        let (token, expiry) = match (token, expiry) {
            (Some(token), Some(expiry)) => (token, expiry),
            (None, None) => return SessionState::Absent,
            _ => {
                warn!("session store held only half of the credential; clearing it");
                self.store.clear();
                return SessionState::Absent;
            }
        };

        if token.is_empty() {
            self.store.clear();
            return SessionState::Absent;
        }

        let Ok(expires_at) = expiry.trim().parse::<i64>() else {
            warn!("unparsable session expiry; treating session as expired");
            self.store.clear();
            return SessionState::Expired;
        };

        if self.clock.now_ms() > expires_at {
            debug!(expires_at, "session credential expired");
            self.store.clear();
            return SessionState::Expired;
        }

        SessionState::Active
    }

    pub fn is_valid(&mut self) -> bool {
        self.check() == SessionState::Active
    }

    /// Bearer token for authenticated upstream calls, if the session is valid.
    pub fn token(&mut self) -> Option<String> {
        if self.is_valid() {
            self.store.read().token
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Copy the current credential into an in-memory store, sharing this
    /// manager's clock.
    pub fn snapshot(&self) -> SessionManager<MemorySessionStore, C>
    where
        C: Clone,
    {
        SessionManager::new(
            MemorySessionStore::from_credential(self.store.read()),
            self.clock.clone(),
        )
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn manager_at(now: i64) -> (SessionManager<MemorySessionStore, ManualClock>, ManualClock) {
        let clock = ManualClock::at(now);
        (
            SessionManager::new(MemorySessionStore::default(), clock.clone()),
            clock,
        )
    }

    #[test]
    fn save_then_check_is_valid() {
        let (mut session, _clock) = manager_at(T0);
        session.save("token-abc");
        assert!(session.is_valid());
        assert_eq!(session.token().as_deref(), Some("token-abc"));
    }

    #[test]
    fn save_writes_both_entries() {
        let (mut session, _clock) = manager_at(T0);
        session.save("token-abc");
        let stored = session.store().read();
        assert_eq!(stored.token.as_deref(), Some("token-abc"));
        let expected = (T0 + 5 * 60 * 60 * 1000).to_string();
        assert_eq!(stored.expiry.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn ttl_boundary() {
        let ttl = session_ttl().num_milliseconds();

        let (mut session, clock) = manager_at(T0);
        session.save("t");
        clock.set(T0 + ttl - 1);
        assert!(session.is_valid());

        clock.set(T0 + ttl + 1);
        assert!(!session.is_valid());
    }

    #[test]
    fn expiry_clears_store_and_stays_invalid() {
        let (mut session, clock) = manager_at(T0);
        session.save("t");
        clock.advance_ms(session_ttl().num_milliseconds() + 10);

        assert_eq!(session.check(), SessionState::Expired);
        assert_eq!(session.store().read(), StoredCredential::default());

        for _ in 0..3 {
            assert!(!session.is_valid());
            assert_eq!(session.check(), SessionState::Absent);
            assert_eq!(session.store().read(), StoredCredential::default());
        }
    }

    #[test]
    fn absent_session_is_invalid_without_side_effects() {
        let (mut session, _clock) = manager_at(T0);
        assert_eq!(session.check(), SessionState::Absent);
        assert!(session.token().is_none());
    }

    #[test]
    fn half_credential_is_cleared() {
        let store = MemorySessionStore::from_credential(StoredCredential {
            token: Some("orphan".to_string()),
            expiry: None,
        });
        let mut session = SessionManager::new(store, ManualClock::at(T0));
        assert!(!session.is_valid());
        assert_eq!(session.store().read(), StoredCredential::default());
    }

    #[test]
    fn unparsable_expiry_counts_as_expired() {
        let store = MemorySessionStore::from_credential(StoredCredential {
            token: Some("t".to_string()),
            expiry: Some("tomorrow-ish".to_string()),
        });
        let mut session = SessionManager::new(store, ManualClock::at(T0));
        assert_eq!(session.check(), SessionState::Expired);
        assert_eq!(session.store().read(), StoredCredential::default());
    }

    #[test]
    fn clear_is_idempotent() {
        let (mut session, _clock) = manager_at(T0);
        session.save("t");
        session.clear();
        session.clear();
        assert!(!session.is_valid());
    }

    #[test]
    fn snapshot_tracks_shared_clock() {
        let (mut session, clock) = manager_at(T0);
        session.save("t");
        let mut copy = session.snapshot();
        assert!(copy.is_valid());

        clock.advance_ms(session_ttl().num_milliseconds() + 1);
        assert!(!copy.is_valid());
    }
}
