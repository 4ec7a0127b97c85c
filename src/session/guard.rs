use axum::response::Redirect;

use super::{Clock, SessionManager, SessionState, SessionStore};

pub const LOGIN_PATH: &str = "/auth/login";
pub const HOME_PATH: &str = "/";
pub const EXPIRED_LOGIN_PATH: &str = "/auth/login?notice=session_expired";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderDecision {
    Render,
    /// `expired` is set only when this very check observed the credential
    /// lapsing, so the login page can say so once.
    RedirectToLogin { expired: bool },
    RedirectToHome,
}

impl RenderDecision {
    pub fn redirect(self) -> Option<Redirect> {
        match self {
            RenderDecision::Render => None,
            RenderDecision::RedirectToLogin { expired: false } => Some(Redirect::to(LOGIN_PATH)),
            RenderDecision::RedirectToLogin { expired: true } => {
                Some(Redirect::to(EXPIRED_LOGIN_PATH))
            }
            RenderDecision::RedirectToHome => Some(Redirect::to(HOME_PATH)),
        }
    }
}

/// Gate for views that need a signed-in user.
pub fn guard_protected<S: SessionStore, C: Clock>(
    session: &mut SessionManager<S, C>,
) -> RenderDecision {
    match session.check() {
        SessionState::Active => RenderDecision::Render,
        state => {
            session.clear();
            RenderDecision::RedirectToLogin {
                expired: state == SessionState::Expired,
            }
        }
    }
}

/// Gate for login/signup style views that make no sense once signed in.
pub fn guard_public_only<S: SessionStore, C: Clock>(
    session: &mut SessionManager<S, C>,
) -> RenderDecision {
    if session.is_valid() {
        RenderDecision::RedirectToHome
    } else {
        RenderDecision::Render
    }
}
