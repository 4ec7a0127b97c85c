use axum::{
    Json,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use axum_extra::extract::cookie::CookieJar;
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::{ExpiryMonitor, SessionNotice, expiry_events};

use super::{AppState, responses::SessionStatus};

#[derive(Debug, Default, Deserialize)]
pub struct SessionPollQuery {
    #[serde(default)]
    pub was_authenticated: bool,
}

#[derive(Serialize)]
struct NoticePayload {
    notice: SessionNotice,
    title: &'static str,
    message: &'static str,
}

impl From<SessionNotice> for NoticePayload {
    fn from(notice: SessionNotice) -> Self {
        Self {
            notice,
            title: notice.title(),
            message: notice.message(),
        }
    }
}

/// One-shot poll: reports validity, plus the expiry notice when the caller
/// says it was signed in and no longer is.
pub async fn session_status(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(poll): Query<SessionPollQuery>,
) -> (CookieJar, Json<SessionStatus>) {
    let mut session = state.session(jar);
    let valid = session.is_valid();
    let notice = ExpiryMonitor::new(poll.was_authenticated).observe(valid);

    let status = SessionStatus {
        authenticated: valid,
        notice: notice.map(|notice| notice.event_name()),
        title: notice.map(|notice| notice.title()),
        message: notice.map(|notice| notice.message()),
    };
    (session.into_store().into_jar(), Json(status))
}

/// Server-sent events that fire once when the session lapses.
///
/// The poll runs over a snapshot of the request's credential and stops as
/// soon as the client goes away.
pub async fn session_events(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let session = state.session(jar);
    let mut snapshot = session.snapshot();

    // Only signed-in pages open this stream, so a credential that is already
    // gone lapsed between render and connect.
    let notices = if snapshot.is_valid() {
        expiry_events(snapshot, state.config().session_poll_interval).left_stream()
    } else {
        debug!("session event stream opened without a valid credential");
        stream::once(async { SessionNotice::SessionExpired }).right_stream()
    };

    let events = notices.map(|notice| {
        Event::default()
            .event(notice.event_name())
            .json_data(NoticePayload::from(notice))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
