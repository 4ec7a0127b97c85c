use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

use crate::upstream::{NewUser, UpstreamError};

use super::{
    AppState,
    auth::{PageResult, public_only},
    flash::FlashQuery,
    templates::{PageLayout, escape_html, flash_error, render_page},
    validation::{is_strong_password, is_valid_email, is_valid_username},
};

const LAST_STEP: u8 = 3;

/// All wizard fields. Values entered on earlier steps travel back and forth
/// as hidden inputs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub step: u8,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub profile_image_link: String,
}

impl SignupForm {
    fn current_step(&self) -> u8 {
        self.step.clamp(1, LAST_STEP)
    }

    fn check_step(&self, step: u8) -> Result<(), &'static str> {
        match step {
            1 => {
                if self.full_name.trim().is_empty() {
                    return Err("Please enter your full name.");
                }
                if !is_valid_username(self.username.trim()) {
                    return Err("Username may only contain lowercase letters and numbers.");
                }
                Ok(())
            }
            2 => {
                if !is_valid_email(self.email.trim()) {
                    return Err("Please enter a valid email address.");
                }
                if !is_strong_password(&self.password) {
                    return Err(
                        "Password needs 8+ characters with upper and lower case letters, a number and one of @$!%*?&.",
                    );
                }
                Ok(())
            }
            _ => {
                let link = self.profile_image_link.trim();
                if !link.is_empty() && !(link.starts_with("http://") || link.starts_with("https://"))
                {
                    return Err("Profile image link must be an http(s) URL.");
                }
                Ok(())
            }
        }
    }

    /// Re-check every step up to and including `through`; hidden fields can
    /// be edited by the client.
    fn check_through(&self, through: u8) -> Result<(), (u8, &'static str)> {
        (1..=through).try_for_each(|step| self.check_step(step).map_err(|msg| (step, msg)))
    }

    fn to_new_user(&self) -> NewUser {
        NewUser {
            full_name: self.full_name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            pwhash: self.password.clone(),
            profile_image_link: self.profile_image_link.trim().to_string(),
        }
    }
}

pub async fn signup_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(flash): Query<FlashQuery>,
) -> PageResult {
    let jar = public_only(&state, jar)?;
    let form = SignupForm {
        step: 1,
        ..SignupForm::default()
    };
    Ok((jar, Html(render_signup_page(&form, &flash.render()))))
}

pub async fn process_signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(mut form): Form<SignupForm>,
) -> Response {
    let jar = match public_only(&state, jar) {
        Ok(jar) => jar,
        Err(redirect) => return redirect.into_response(),
    };

    let step = form.current_step();

    if form.action == "back" {
        form.step = step.saturating_sub(1).max(1);
        return (jar, Html(render_signup_page(&form, ""))).into_response();
    }

    if let Err((failed_step, message)) = form.check_through(step) {
        form.step = failed_step;
        return (
            StatusCode::BAD_REQUEST,
            jar,
            Html(render_signup_page(&form, &flash_error(message))),
        )
            .into_response();
    }

    if step < LAST_STEP {
        form.step = step + 1;
        return (jar, Html(render_signup_page(&form, ""))).into_response();
    }

    form.step = LAST_STEP;
    match state.api().register(&form.to_new_user()).await {
        Ok(()) => {
            info!(username = %form.username.trim(), "account registered");
            (jar, Redirect::to("/auth/login?status=registered")).into_response()
        }
        Err(err) => {
            let status = match &err {
                UpstreamError::Rejected { .. } => StatusCode::BAD_REQUEST,
                _ => {
                    error!(?err, "registration request failed");
                    StatusCode::BAD_GATEWAY
                }
            };
            let flash = flash_error(&format!("Registration failed. {}", err.user_message()));
            (status, jar, Html(render_signup_page(&form, &flash))).into_response()
        }
    }
}

fn hidden(name: &str, value: &str) -> String {
    format!(
        r#"<input type="hidden" name="{name}" value="{}">"#,
        escape_html(value)
    )
}

fn progress(step: u8) -> String {
    let bars = (1..=LAST_STEP)
        .map(|n| {
            if n <= step {
                r#"<span class="done"></span>"#
            } else {
                "<span></span>"
            }
        })
        .collect::<String>();
    format!(r#"<div class="steps">{bars}</div><p class="muted">Step {step} of {LAST_STEP}</p>"#)
}

fn render_signup_page(form: &SignupForm, flash_html: &str) -> String {
    let step = form.current_step();

    let (fields, carried) = match step {
        1 => (
            format!(
                r#"<label for="full_name">Full name</label>
                <input id="full_name" name="full_name" value="{full_name}" required>
                <label for="username">Username</label>
                <input id="username" name="username" value="{username}" pattern="[a-z0-9]+" required>
                <p class="muted">Lowercase letters and numbers only.</p>"#,
                full_name = escape_html(&form.full_name),
                username = escape_html(&form.username),
            ),
            [
                hidden("email", &form.email),
                hidden("password", &form.password),
                hidden("profile_image_link", &form.profile_image_link),
            ]
            .concat(),
        ),
        2 => (
            format!(
                r#"<label for="email">Email</label>
                <input id="email" type="email" name="email" value="{email}" required>
                <label for="password">Password</label>
                <input id="password" type="password" name="password" minlength="8" required>
                <p class="muted">At least 8 characters with upper and lower case letters, a number and one of @$!%*?&amp;.</p>"#,
                email = escape_html(&form.email),
            ),
            [
                hidden("full_name", &form.full_name),
                hidden("username", &form.username),
                hidden("profile_image_link", &form.profile_image_link),
            ]
            .concat(),
        ),
        _ => (
            format!(
                r#"<label for="profile_image_link">Profile image link (optional)</label>
                <input id="profile_image_link" type="url" name="profile_image_link" value="{link}">
                <h3>Review</h3>
                <table>
                    <tr><th>Full name</th><td>{full_name}</td></tr>
                    <tr><th>Username</th><td>{username}</td></tr>
                    <tr><th>Email</th><td>{email}</td></tr>
                </table>"#,
                link = escape_html(&form.profile_image_link),
                full_name = escape_html(form.full_name.trim()),
                username = escape_html(form.username.trim()),
                email = escape_html(form.email.trim()),
            ),
            [
                hidden("full_name", &form.full_name),
                hidden("username", &form.username),
                hidden("email", &form.email),
                hidden("password", &form.password),
            ]
            .concat(),
        ),
    };

    let back_button = if step > 1 {
        r#"<button class="pill secondary" type="submit" name="action" value="back" formnovalidate>Back</button>"#
    } else {
        ""
    };
    let submit_label = if step == LAST_STEP {
        "Create account"
    } else {
        "Next"
    };

    let body = format!(
        r#"        <section class="panel narrow">
            <h1>Create your account</h1>
            {progress}
            <form method="post" action="/auth/signup">
                <input type="hidden" name="step" value="{step}">
                {carried}
                {fields}
                <div class="form-actions">
                    {back_button}
                    <button type="submit" name="action" value="next">{submit_label}</button>
                </div>
            </form>
            <p class="muted">Already registered? <a href="/auth/login">Log in</a></p>
        </section>"#,
        progress = progress(step),
    );

    render_page(PageLayout::new("Sign up", false, body).with_flash(flash_html.to_string()))
}
