use axum::{
    extract::{Query, State},
    response::Html,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::resources::{
    ALL_CATEGORIES, QueryParams, ResourceRecord, SortKey, categories, featured, query,
};

use super::{
    AppState,
    auth::visit,
    catalog::render_resource_grid,
    flash::FlashQuery,
    templates::{PageLayout, encode_query, escape_html, render_page},
};

pub async fn landing_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(flash): Query<FlashQuery>,
) -> (CookieJar, Html<String>) {
    let visitor = visit(&state, jar);
    let flash_html = visitor.flash(&flash);

    let featured_html = match state.api().list_resources().await {
        Ok(records) => render_featured(&records, state.config().featured_count),
        Err(err) => {
            error!(?err, "failed to load featured resources");
            r#"<div class="flash error">Featured resources are unavailable right now.</div>"#
                .to_string()
        }
    };

    let cta = if visitor.authenticated {
        r#"<a class="pill" href="/upload">Share a resource</a>"#
    } else {
        r#"<a class="pill" href="/auth/signup">Join the community</a>"#
    };

    let body = format!(
        r#"        <section class="panel">
            <h1>Learn together, share what you know</h1>
            <p class="muted">Lecture notes, assignments, research papers and more, shared by CSE students and faculty.</p>
            <div class="form-actions">
                <a class="pill secondary" href="/resources">Browse resources</a>
                {cta}
            </div>
        </section>
{featured_html}"#
    );

    let page = render_page(
        PageLayout::new("Home", visitor.authenticated, body)
            .with_flash(flash_html)
            .with_session_poll(state.config().session_poll_interval),
    );
    (visitor.jar, Html(page))
}

fn render_featured(records: &[ResourceRecord], count: usize) -> String {
    let approved = query(records, &QueryParams::default());
    let chips = categories(approved.iter().copied())
        .into_iter()
        .filter(|category| category != ALL_CATEGORIES)
        .map(|category| {
            format!(
                r#"<a class="chip" href="/resources?category={}">{}</a>"#,
                encode_query(&category),
                escape_html(&category)
            )
        })
        .collect::<String>();
    let top = featured(approved, SortKey::MostDownloads, count);

    format!(
        r#"        <section>
            <h2>Featured resources</h2>
            <div class="chips">{chips}</div>
            {grid}
            <p><a href="/resources">See all resources</a></p>
        </section>"#,
        grid = render_resource_grid(&top, false),
    )
}
