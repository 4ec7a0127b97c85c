use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    session::{
        SessionNotice, SessionState, guard::EXPIRED_LOGIN_PATH, guard::LOGIN_PATH, guard_protected,
        guard_public_only,
    },
    upstream::{LoginResponse, UpstreamError},
};

use super::{
    AppState, WebSession,
    flash::FlashQuery,
    templates::{PageLayout, escape_html, flash_error, flash_notice, render_page},
    validation::{MIN_PASSWORD_LEN, is_valid_email},
};

/// Either the rendered page or a redirect, both carrying the cookie jar so
/// any cleanup done by the session check reaches the browser.
pub type PageResult = Result<(CookieJar, Html<String>), (CookieJar, Redirect)>;

/// What an unguarded page knows about the caller.
pub struct Visitor {
    pub jar: CookieJar,
    pub authenticated: bool,
    /// The credential lapsed during this very request.
    pub lapsed: bool,
}

impl Visitor {
    pub fn flash(&self, query: &FlashQuery) -> String {
        if self.lapsed {
            let notice = SessionNotice::SessionExpired;
            return flash_notice(notice.title(), notice.message());
        }
        query.render()
    }
}

pub fn visit(state: &AppState, jar: CookieJar) -> Visitor {
    let mut session = state.session(jar);
    let observed = session.check();
    Visitor {
        authenticated: observed == SessionState::Active,
        lapsed: observed == SessionState::Expired,
        jar: session.into_store().into_jar(),
    }
}

/// Gate for protected views. Hands back the live session and its bearer
/// token, or the redirect to login.
pub fn require_session(
    state: &AppState,
    jar: CookieJar,
) -> Result<(WebSession, String), (CookieJar, Redirect)> {
    let mut session = state.session(jar);
    if let Some(redirect) = guard_protected(&mut session).redirect() {
        return Err((session.into_store().into_jar(), redirect));
    }
    match session.token() {
        Some(token) => Ok((session, token)),
        None => Err((session.into_store().into_jar(), Redirect::to(LOGIN_PATH))),
    }
}

/// Gate for login, signup and password recovery.
pub fn public_only(state: &AppState, jar: CookieJar) -> Result<CookieJar, (CookieJar, Redirect)> {
    let mut session = state.session(jar);
    let decision = guard_public_only(&mut session);
    let jar = session.into_store().into_jar();
    match decision.redirect() {
        Some(redirect) => Err((jar, redirect)),
        None => Ok(jar),
    }
}

/// The upstream API refused our token: drop it and send the user to login.
pub fn session_ended(mut session: WebSession) -> (CookieJar, Redirect) {
    warn!("upstream rejected the session token; clearing credential");
    session.clear();
    (
        session.into_store().into_jar(),
        Redirect::to(EXPIRED_LOGIN_PATH),
    )
}

/// Redirect for a failed upstream call made on behalf of a signed-in user.
pub fn redirect_after_failure(
    session: WebSession,
    err: UpstreamError,
    target: &str,
) -> (CookieJar, Redirect) {
    let code = match &err {
        UpstreamError::Unauthorized => return session_ended(session),
        UpstreamError::Rejected { status, .. } if *status == StatusCode::FORBIDDEN => {
            "not_authorized"
        }
        UpstreamError::Rejected { status, .. } if *status == StatusCode::NOT_FOUND => "not_found",
        _ => "upstream",
    };
    error!(?err, target, "upstream call failed");

    let separator = if target.contains('?') { '&' } else { '?' };
    let location = format!("{target}{separator}error={code}");
    (session.into_store().into_jar(), Redirect::to(&location))
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(flash): Query<FlashQuery>,
) -> PageResult {
    let jar = public_only(&state, jar)?;
    Ok((jar, Html(render_login_page(&flash.render(), ""))))
}

pub async fn process_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect), (StatusCode, CookieJar, Html<String>)> {
    let jar = match public_only(&state, jar) {
        Ok(jar) => jar,
        Err(redirect) => return Ok(redirect),
    };

    let email = form.email.trim();
    if !is_valid_email(email) {
        return Err(login_failure(
            jar,
            StatusCode::BAD_REQUEST,
            "Please enter a valid email address.",
            email,
        ));
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Err(login_failure(
            jar,
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters.",
            email,
        ));
    }

    match state.api().login(email, &form.password).await {
        Ok(LoginResponse {
            token: Some(token),
            role,
            user,
            message,
        }) if !token.is_empty() => {
            let mut session = state.session(jar);
            session.save(&token);
            info!(
                role = role.as_deref().unwrap_or("unknown"),
                user = user.as_ref().map(|user| user.display_name()).unwrap_or("unknown"),
                message = message.as_deref().unwrap_or(""),
                "user logged in"
            );
            Ok((
                session.into_store().into_jar(),
                Redirect::to("/?status=logged_in"),
            ))
        }
        Ok(_) => {
            warn!("login response carried no token");
            Err(login_failure(
                jar,
                StatusCode::BAD_GATEWAY,
                "Login failed. Try again.",
                email,
            ))
        }
        Err(err @ UpstreamError::Rejected { .. }) => Err(login_failure(
            jar,
            StatusCode::UNAUTHORIZED,
            &err.user_message(),
            email,
        )),
        Err(err) => {
            error!(?err, "login request failed");
            Err(login_failure(
                jar,
                StatusCode::BAD_GATEWAY,
                &err.user_message(),
                email,
            ))
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let mut session = state.session(jar);
    session.clear();
    (
        session.into_store().into_jar(),
        Redirect::to("/?status=logged_out"),
    )
}

fn login_failure(
    jar: CookieJar,
    status: StatusCode,
    message: &str,
    email: &str,
) -> (StatusCode, CookieJar, Html<String>) {
    (
        status,
        jar,
        Html(render_login_page(&flash_error(message), email)),
    )
}

fn render_login_page(flash_html: &str, email: &str) -> String {
    let body = format!(
        r#"        <section class="panel narrow">
            <h1>Welcome back</h1>
            <p class="muted">Log in to share and manage resources.</p>
            <form method="post" action="/auth/login">
                <label for="email">Email</label>
                <input id="email" type="email" name="email" value="{email}" required>
                <label for="password">Password</label>
                <input id="password" type="password" name="password" minlength="8" required>
                <div class="form-actions">
                    <button type="submit">Log in</button>
                    <a href="/auth/forgot">Forgot password?</a>
                </div>
            </form>
            <p class="muted">New here? <a href="/auth/signup">Create an account</a></p>
        </section>"#,
        email = escape_html(email),
    );

    render_page(PageLayout::new("Log in", false, body).with_flash(flash_html.to_string()))
}
