use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

use crate::upstream::UpstreamError;

use super::{
    AppState,
    auth::{PageResult, public_only},
    flash::FlashQuery,
    templates::{PageLayout, escape_html, flash_error, flash_success, render_page},
    validation::{is_strong_password, is_valid_email},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResetStep {
    RequestCode,
    ChoosePassword,
    Done,
}

#[derive(Debug, Deserialize)]
pub struct ForgotQuery {
    #[serde(default)]
    pub done: Option<String>,
    #[serde(flatten)]
    pub flash: FlashQuery,
}

#[derive(Debug, Deserialize)]
pub struct RequestCodeForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

pub async fn forgot_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ForgotQuery>,
) -> PageResult {
    let jar = public_only(&state, jar)?;
    let step = if query.done.is_some() {
        ResetStep::Done
    } else {
        ResetStep::RequestCode
    };
    Ok((jar, Html(render_forgot_page(step, "", &query.flash.render()))))
}

pub async fn request_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RequestCodeForm>,
) -> Response {
    let jar = match public_only(&state, jar) {
        Ok(jar) => jar,
        Err(redirect) => return redirect.into_response(),
    };

    let email = form.email.trim();
    if !is_valid_email(email) {
        return failure(
            jar,
            StatusCode::BAD_REQUEST,
            ResetStep::RequestCode,
            email,
            "Please enter a valid email address.",
        );
    }

    match state.api().request_password_reset(email).await {
        Ok(()) => {
            info!("password reset code requested");
            let flash = flash_success("We sent a verification code to your email.");
            (
                jar,
                Html(render_forgot_page(ResetStep::ChoosePassword, email, &flash)),
            )
                .into_response()
        }
        Err(err) => failure(
            jar,
            upstream_status(&err),
            ResetStep::RequestCode,
            email,
            &err.user_message(),
        ),
    }
}

pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ResetForm>,
) -> Response {
    let jar = match public_only(&state, jar) {
        Ok(jar) => jar,
        Err(redirect) => return redirect.into_response(),
    };

    let email = form.email.trim();
    let code = form.code.trim();
    if !is_valid_email(email) {
        return failure(
            jar,
            StatusCode::BAD_REQUEST,
            ResetStep::RequestCode,
            email,
            "Please start again with a valid email address.",
        );
    }
    if code.is_empty() {
        return failure(
            jar,
            StatusCode::BAD_REQUEST,
            ResetStep::ChoosePassword,
            email,
            "Please enter the code from your email.",
        );
    }
    if !is_strong_password(&form.new_password) {
        return failure(
            jar,
            StatusCode::BAD_REQUEST,
            ResetStep::ChoosePassword,
            email,
            "Password needs 8+ characters with upper and lower case letters, a number and one of @$!%*?&.",
        );
    }

    match state
        .api()
        .reset_password(email, code, &form.new_password)
        .await
    {
        Ok(()) => (jar, Redirect::to("/auth/forgot?done=1")).into_response(),
        Err(err) => failure(
            jar,
            upstream_status(&err),
            ResetStep::ChoosePassword,
            email,
            &err.user_message(),
        ),
    }
}

fn upstream_status(err: &UpstreamError) -> StatusCode {
    match err {
        UpstreamError::Rejected { .. } => StatusCode::BAD_REQUEST,
        other => {
            error!(err = ?other, "password reset request failed");
            StatusCode::BAD_GATEWAY
        }
    }
}

fn failure(
    jar: CookieJar,
    status: StatusCode,
    step: ResetStep,
    email: &str,
    message: &str,
) -> Response {
    (
        status,
        jar,
        Html(render_forgot_page(step, email, &flash_error(message))),
    )
        .into_response()
}

fn render_forgot_page(step: ResetStep, email: &str, flash_html: &str) -> String {
    let content = match step {
        ResetStep::RequestCode => format!(
            r#"<p class="muted">Enter your account email and we will send you a verification code.</p>
            <form method="post" action="/auth/forgot">
                <label for="email">Email</label>
                <input id="email" type="email" name="email" value="{email}" required>
                <div class="form-actions">
                    <button type="submit">Send code</button>
                </div>
            </form>"#,
            email = escape_html(email),
        ),
        ResetStep::ChoosePassword => format!(
            r#"<p class="muted">Code sent to <strong>{email}</strong>.</p>
            <form method="post" action="/auth/forgot/reset">
                <input type="hidden" name="email" value="{email}">
                <label for="code">Verification code</label>
                <input id="code" name="code" autocomplete="one-time-code" required>
                <label for="new_password">New password</label>
                <input id="new_password" type="password" name="new_password" minlength="8" required>
                <div class="form-actions">
                    <button type="submit">Reset password</button>
                    <a href="/auth/forgot">Use a different email</a>
                </div>
            </form>"#,
            email = escape_html(email),
        ),
        ResetStep::Done => r#"<p>Your password has been reset.</p>
            <div class="form-actions">
                <a class="pill" href="/auth/login?status=password_reset">Back to login</a>
            </div>"#
            .to_string(),
    };

    let step_number = match step {
        ResetStep::RequestCode => 1,
        ResetStep::ChoosePassword => 2,
        ResetStep::Done => 3,
    };
    let bars = (1..=3)
        .map(|n| {
            if n <= step_number {
                r#"<span class="done"></span>"#
            } else {
                "<span></span>"
            }
        })
        .collect::<String>();

    let body = format!(
        r#"        <section class="panel narrow">
            <h1>Forgot password</h1>
            <div class="steps">{bars}</div>
            {content}
        </section>"#
    );

    render_page(PageLayout::new("Forgot password", false, body).with_flash(flash_html.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_step_keeps_email_hidden() {
        let html = render_forgot_page(ResetStep::ChoosePassword, "a@b.co", "");
        assert!(html.contains(r#"type="hidden" name="email" value="a@b.co""#));
        assert!(html.contains("/auth/forgot/reset"));
    }

    #[test]
    fn done_step_links_to_login() {
        let html = render_forgot_page(ResetStep::Done, "", "");
        assert!(html.contains("/auth/login?status=password_reset"));
        assert!(!html.contains("<form"));
    }
}
