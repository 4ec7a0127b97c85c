use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    resources::parse_timestamp,
    upstream::{ProfileUpdate, UpstreamError, UserProfile},
};

use super::{
    AppState,
    auth::{require_session, session_ended},
    flash::FlashQuery,
    templates::{PageLayout, escape_html, flash_error, render_page},
    validation::{is_valid_email, is_valid_username},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
}

impl ProfileForm {
    fn from_profile(profile: &UserProfile) -> Self {
        Self {
            name: profile.name().unwrap_or_default().to_string(),
            username: profile.username.clone().unwrap_or_default(),
            email: profile.email.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
            avatar_url: profile.avatar().unwrap_or_default().to_string(),
        }
    }

    fn validate(&self) -> Result<ProfileUpdate, &'static str> {
        let name = self.name.trim();
        let username = self.username.trim();
        let email = self.email.trim();
        let avatar_url = self.avatar_url.trim();

        if name.is_empty() {
            return Err("Please enter your name.");
        }
        if !is_valid_username(username) {
            return Err("Username may only contain lowercase letters and numbers.");
        }
        if !is_valid_email(email) {
            return Err("Please enter a valid email address.");
        }
        if !avatar_url.is_empty()
            && !(avatar_url.starts_with("http://") || avatar_url.starts_with("https://"))
        {
            return Err("Avatar link must be an http(s) URL.");
        }

        Ok(ProfileUpdate {
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            bio: self.bio.trim().to_string(),
            avatar_url: (!avatar_url.is_empty()).then(|| avatar_url.to_string()),
        })
    }
}

pub async fn profile_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(flash): Query<FlashQuery>,
) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };

    match state.api().current_user(&token).await {
        Ok(profile) => {
            let page = render_profile_page(&state, &profile, &flash.render());
            (session.into_store().into_jar(), Html(page)).into_response()
        }
        Err(UpstreamError::Unauthorized) => session_ended(session).into_response(),
        Err(err) => {
            error!(?err, "failed to load profile");
            let page = render_page(
                PageLayout::new("Profile", true, "")
                    .with_flash(flash_error(&err.user_message()))
                    .with_session_poll(state.config().session_poll_interval),
            );
            (
                StatusCode::BAD_GATEWAY,
                session.into_store().into_jar(),
                Html(page),
            )
                .into_response()
        }
    }
}

pub async fn edit_profile_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };

    match state.api().current_user(&token).await {
        Ok(profile) => {
            let page = render_edit_page(&state, &ProfileForm::from_profile(&profile), "");
            (session.into_store().into_jar(), Html(page)).into_response()
        }
        Err(UpstreamError::Unauthorized) => session_ended(session).into_response(),
        Err(err) => {
            error!(?err, "failed to load profile for editing");
            (
                session.into_store().into_jar(),
                Redirect::to("/profile?error=upstream"),
            )
                .into_response()
        }
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };

    let update = match form.validate() {
        Ok(update) => update,
        Err(message) => {
            let page = render_edit_page(&state, &form, &flash_error(message));
            return (
                StatusCode::BAD_REQUEST,
                session.into_store().into_jar(),
                Html(page),
            )
                .into_response();
        }
    };

    match state.api().update_profile(&token, &update).await {
        Ok(()) => {
            info!(username = %update.username, "profile updated");
            (
                session.into_store().into_jar(),
                Redirect::to("/profile?status=profile_updated"),
            )
                .into_response()
        }
        Err(UpstreamError::Unauthorized) => session_ended(session).into_response(),
        Err(err) => {
            error!(?err, "failed to update profile");
            let page = render_edit_page(&state, &form, &flash_error(&err.user_message()));
            (
                StatusCode::BAD_GATEWAY,
                session.into_store().into_jar(),
                Html(page),
            )
                .into_response()
        }
    }
}

fn render_profile_page(state: &AppState, profile: &UserProfile, flash_html: &str) -> String {
    let avatar = match profile.avatar() {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => format!(
            r#"<img src="{}" alt="" width="96" height="96" style="border-radius: 50%; object-fit: cover;">"#,
            escape_html(url)
        ),
        _ => String::new(),
    };
    let bio = match profile.bio.as_deref().map(str::trim) {
        Some(bio) if !bio.is_empty() => escape_html(bio),
        _ => r#"<span class="muted">No bio yet.</span>"#.to_string(),
    };

    let member_since = profile
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .map(|at| format!(r#"<p class="muted">Member since {}</p>"#, at.format("%B %Y")))
        .unwrap_or_default();

    let body = format!(
        r#"        <section class="panel">
            {avatar}
            <h1>{name}</h1>
            <p class="muted">@{username} · {email}</p>
            {member_since}
            <p>{bio}</p>
            <div class="form-actions">
                <a class="pill" href="/profile/edit">Edit profile</a>
                <a class="pill secondary" href="/upload">Share a resource</a>
            </div>
        </section>"#,
        name = escape_html(profile.display_name()),
        username = escape_html(profile.username.as_deref().unwrap_or("")),
        email = escape_html(profile.email.as_deref().unwrap_or("")),
    );

    render_page(
        PageLayout::new("Profile", true, body)
            .with_flash(flash_html.to_string())
            .with_session_poll(state.config().session_poll_interval),
    )
}

fn render_edit_page(state: &AppState, form: &ProfileForm, flash_html: &str) -> String {
    let body = format!(
        r#"        <section class="panel narrow">
            <h1>Edit profile</h1>
            <form method="post" action="/profile/edit">
                <label for="name">Name</label>
                <input id="name" name="name" value="{name}" required>
                <label for="username">Username</label>
                <input id="username" name="username" value="{username}" pattern="[a-z0-9]+" required>
                <label for="email">Email</label>
                <input id="email" type="email" name="email" value="{email}" required>
                <label for="bio">Bio</label>
                <textarea id="bio" name="bio">{bio}</textarea>
                <label for="avatar_url">Avatar URL</label>
                <input id="avatar_url" type="url" name="avatar_url" value="{avatar_url}">
                <div class="form-actions">
                    <button type="submit">Save changes</button>
                    <a href="/profile">Cancel</a>
                </div>
            </form>
        </section>"#,
        name = escape_html(&form.name),
        username = escape_html(&form.username),
        email = escape_html(&form.email),
        bio = escape_html(&form.bio),
        avatar_url = escape_html(&form.avatar_url),
    );

    render_page(
        PageLayout::new("Edit profile", true, body)
            .with_flash(flash_html.to_string())
            .with_session_poll(state.config().session_poll_interval),
    )
}
