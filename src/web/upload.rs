use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    resources::UPLOAD_CATEGORIES,
    upstream::{NewResource, UpstreamError},
};

use super::{
    AppState,
    auth::{PageResult, require_session, session_ended},
    flash::FlashQuery,
    templates::{PageLayout, escape_html, flash_error, render_page},
    validation::{check_upload, parse_tags},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub tags: String,
}

impl UploadForm {
    fn to_new_resource(&self) -> NewResource {
        NewResource {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            file_url: self.file_url.trim().to_string(),
            tags: parse_tags(&self.tags),
        }
    }
}

pub async fn upload_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(flash): Query<FlashQuery>,
) -> PageResult {
    let (session, _token) = require_session(&state, jar)?;
    let page = render_upload_page(&state, &UploadForm::default(), &flash.render());
    Ok((session.into_store().into_jar(), Html(page)))
}

pub async fn submit_upload(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<UploadForm>,
) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };

    if let Err(problem) = check_upload(&form.title, &form.category, &form.file_url) {
        let page = render_upload_page(&state, &form, &flash_error(problem.message()));
        return (
            StatusCode::BAD_REQUEST,
            session.into_store().into_jar(),
            Html(page),
        )
            .into_response();
    }

    let resource = form.to_new_resource();
    match state.api().upload_resource(&token, &resource).await {
        Ok(()) => {
            info!(category = %resource.category, tags = resource.tags.len(), "resource uploaded");
            (
                session.into_store().into_jar(),
                Redirect::to("/upload?status=uploaded"),
            )
                .into_response()
        }
        Err(UpstreamError::Unauthorized) => session_ended(session).into_response(),
        Err(err) => {
            error!(?err, "failed to upload resource");
            let message = format!("Upload failed. {}", err.user_message());
            let page = render_upload_page(&state, &form, &flash_error(&message));
            (
                StatusCode::BAD_GATEWAY,
                session.into_store().into_jar(),
                Html(page),
            )
                .into_response()
        }
    }
}

fn render_upload_page(state: &AppState, form: &UploadForm, flash_html: &str) -> String {
    let category_options = UPLOAD_CATEGORIES
        .iter()
        .map(|category| {
            let selected = form.category.trim() == *category;
            format!(
                r#"<option value="{category}"{selected}>{category}</option>"#,
                selected = if selected { " selected" } else { "" },
            )
        })
        .collect::<String>();

    let body = format!(
        r#"        <section class="panel">
            <h1>Share a resource</h1>
            <p class="muted">Uploads are reviewed before they appear publicly.</p>
            <form method="post" action="/upload">
                <label for="title">Title</label>
                <input id="title" name="title" value="{title}" required>
                <label for="category">Category</label>
                <select id="category" name="category" required>
                    <option value="">Choose a category</option>
                    {category_options}
                </select>
                <label for="file_url">File link</label>
                <input id="file_url" type="url" name="file_url" value="{file_url}" placeholder="https://.../notes.pdf" required>
                <p class="muted">PDF, DOC, DOCX or ZIP.</p>
                <label for="description">Description (optional)</label>
                <textarea id="description" name="description">{description}</textarea>
                <label for="tags">Tags (optional, comma separated)</label>
                <input id="tags" name="tags" value="{tags}" placeholder="algorithms, graphs">
                <div class="form-actions">
                    <button type="submit">Upload</button>
                </div>
            </form>
        </section>"#,
        title = escape_html(&form.title),
        file_url = escape_html(&form.file_url),
        description = escape_html(&form.description),
        tags = escape_html(&form.tags),
    );

    render_page(
        PageLayout::new("Upload", true, body)
            .with_flash(flash_html.to_string())
            .with_session_poll(state.config().session_poll_interval),
    )
}
