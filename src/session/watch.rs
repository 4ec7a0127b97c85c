use std::time::Duration;

use futures::{Stream, stream};
use serde::Serialize;
use tokio::time::{Instant, interval_at};

use super::{Clock, MemorySessionStore, SessionManager};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionNotice {
    SessionExpired,
}

impl SessionNotice {
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionNotice::SessionExpired => "session_expired",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SessionNotice::SessionExpired => "Session Expired",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            SessionNotice::SessionExpired => "Please log in again.",
        }
    }
}

/// Remembers the last observed validity so a lapse is reported exactly once.
#[derive(Clone, Copy, Debug)]
pub struct ExpiryMonitor {
    authenticated: bool,
}

impl ExpiryMonitor {
    pub fn new(authenticated: bool) -> Self {
        Self { authenticated }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn observe(&mut self, valid: bool) -> Option<SessionNotice> {
        let notice = (self.authenticated && !valid).then_some(SessionNotice::SessionExpired);
        self.authenticated = valid;
        notice
    }
}

/// Re-check `session` every `every` and yield a notice when it lapses.
///
/// The stream ends right after the notice, or immediately when the session
/// is not valid to begin with. Dropping it cancels the poll.
pub fn expiry_events<C>(
    mut session: SessionManager<MemorySessionStore, C>,
    every: Duration,
) -> impl Stream<Item = SessionNotice> + Send
where
    C: Clock + Send + 'static,
{
    let monitor = ExpiryMonitor::new(session.is_valid());
    let ticker = interval_at(Instant::now() + every, every);

    stream::unfold(
        (session, monitor, ticker),
        |(mut session, mut monitor, mut ticker)| async move {
            loop {
                if !monitor.is_authenticated() {
                    return None;
                }
                ticker.tick().await;
                if let Some(notice) = monitor.observe(session.is_valid()) {
                    return Some((notice, (session, monitor, ticker)));
                }
            }
        },
    )
}
