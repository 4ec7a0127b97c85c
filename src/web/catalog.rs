use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::error;

use crate::resources::{
    CategoryFilter, MISSING_FILE_URL, QueryParams, ResourceRecord, ResourceStatus, SortKey,
    StatusGate, categories, format_count, query,
};

use super::{
    AppState,
    auth::visit,
    flash::FlashQuery,
    templates::{
        PageLayout, encode_query, escape_html, flash_error, render_not_found_page, render_page,
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub category: Option<String>,
    #[serde(flatten)]
    pub flash: FlashQuery,
}

impl ListingQuery {
    fn params(&self) -> QueryParams {
        QueryParams {
            search: self.search.as_deref().unwrap_or("").trim().to_string(),
            sort: SortKey::from_param(self.sort.as_deref()),
            category: CategoryFilter::from_param(self.category.as_deref()),
            status: StatusGate::ApprovedOnly,
        }
    }
}

pub async fn resources_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(listing): Query<ListingQuery>,
) -> (CookieJar, Html<String>) {
    let visitor = visit(&state, jar);
    let mut flash_html = visitor.flash(&listing.flash);
    let params = listing.params();

    let records = match state.api().list_resources().await {
        Ok(records) => records,
        Err(err) => {
            error!(?err, "failed to load resources");
            flash_html.push_str(&flash_error(
                "Resources could not be loaded right now. Try again shortly.",
            ));
            Vec::new()
        }
    };

    let body = render_listing(&records, &params);
    let page = render_page(
        PageLayout::new("Resources", visitor.authenticated, body)
            .with_flash(flash_html)
            .with_session_poll(state.config().session_poll_interval),
    );
    (visitor.jar, Html(page))
}

pub async fn resource_details(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(resource_id): Path<String>,
) -> Response {
    let visitor = visit(&state, jar);

    let record = match state.api().get_resource(&resource_id).await {
        Ok(Some(record))
            if record.status == ResourceStatus::Approved || visitor.authenticated =>
        {
            record
        }
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                visitor.jar,
                Html(render_not_found_page(visitor.authenticated)),
            )
                .into_response();
        }
        Err(err) => {
            error!(?err, resource_id, "failed to load resource");
            let page = render_page(
                PageLayout::new("Resource", visitor.authenticated, "")
                    .with_flash(flash_error("This resource could not be loaded. Try again.")),
            );
            return (StatusCode::BAD_GATEWAY, visitor.jar, Html(page)).into_response();
        }
    };

    let page = render_page(
        PageLayout::new(display_title(&record), visitor.authenticated, render_details(&record))
            .with_flash(visitor.flash(&FlashQuery::default()))
            .with_session_poll(state.config().session_poll_interval),
    );
    (visitor.jar, Html(page)).into_response()
}

fn render_listing(records: &[ResourceRecord], params: &QueryParams) -> String {
    let public = QueryParams {
        status: StatusGate::ApprovedOnly,
        ..QueryParams::default()
    };
    let approved = query(records, &public);
    let visible = query(records, params);

    let sort_options = SortKey::ALL
        .iter()
        .map(|key| {
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = key.as_param(),
                selected = if *key == params.sort { " selected" } else { "" },
                label = key.label(),
            )
        })
        .collect::<String>();

    let category_options = categories(approved.iter().copied())
        .into_iter()
        .map(|category| {
            let selected = category == params.category.as_param();
            format!(
                r#"<option value="{value}"{selected}>{value}</option>"#,
                value = escape_html(&category),
                selected = if selected { " selected" } else { "" },
            )
        })
        .collect::<String>();

    let summary = if params.is_filtered() {
        format!(
            "Showing {} resources (filtered from {} total)",
            visible.len(),
            approved.len()
        )
    } else {
        format!("Showing {} resources", visible.len())
    };

    format!(
        r#"        <section class="panel">
            <h1>Resources</h1>
            <form class="filters" method="get" action="/resources">
                <label>Search
                    <input type="search" name="search" value="{search}" placeholder="Title, description or category">
                </label>
                <label>Sort by
                    <select name="sort">{sort_options}</select>
                </label>
                <label>Category
                    <select name="category">{category_options}</select>
                </label>
                <div class="form-actions">
                    <button type="submit">Apply</button>
                    <a href="/resources">Reset</a>
                </div>
            </form>
        </section>
        <p class="muted">{summary}</p>
        {grid}"#,
        search = escape_html(&params.search),
        grid = render_resource_grid(&visible, false),
    )
}

pub fn render_resource_grid(records: &[&ResourceRecord], show_status: bool) -> String {
    if records.is_empty() {
        return r#"<div class="panel empty"><p>No resources found.</p><p>Try a different search or category.</p></div>"#
            .to_string();
    }

    let cards = records
        .iter()
        .map(|record| render_resource_card(record, show_status))
        .collect::<String>();
    format!(r#"<div class="grid">{cards}</div>"#)
}

fn render_resource_card(record: &ResourceRecord, show_status: bool) -> String {
    let file_type = record.file_type();
    let status_badge = if show_status {
        status_badge(record.status)
    } else {
        String::new()
    };

    format!(
        r#"<article class="card">
    <div class="badges"><span class="badge {type_class}">{type_label}</span><span class="badge">{category}</span>{status_badge}</div>
    <h3>{title}</h3>
    <p>{description}</p>
    <div class="meta"><span>By {uploader}</span><span>{created}</span></div>
    <div class="meta"><span>{downloads} downloads</span><span>{views} views</span><span>Rating {rating}</span></div>
    <div class="form-actions"><a class="pill" href="{href}" target="_blank" rel="noopener">Download</a></div>
</article>"#,
        type_class = file_type.css_class(),
        type_label = file_type.label(),
        category = escape_html(record.category()),
        title = title_link(record),
        description = escape_html(record.description()),
        uploader = escape_html(record.uploader()),
        created = escape_html(&record.created_label()),
        downloads = format_count(record.downloads()),
        views = format_count(record.views()),
        rating = escape_html(&record.rating_label()),
        href = escape_html(safe_href(record.file_url())),
    )
}

fn render_details(record: &ResourceRecord) -> String {
    let file_type = record.file_type();
    format!(
        r#"        <section class="panel">
            <div class="badges"><span class="badge {type_class}">{type_label}</span><a class="badge" href="/resources?category={category_param}">{category}</a>{status}</div>
            <h1>{title}</h1>
            <p>{description}</p>
            <div class="meta"><span>Uploaded by {uploader}</span><span>{created}</span></div>
            <div class="stats">
                <div class="stat"><strong>{downloads}</strong>Downloads</div>
                <div class="stat"><strong>{views}</strong>Views</div>
                <div class="stat"><strong>{rating}</strong>Rating</div>
            </div>
            <div class="form-actions">
                <a class="pill" href="{href}" target="_blank" rel="noopener">Download</a>
                <a href="/resources">Back to resources</a>
            </div>
        </section>"#,
        type_class = file_type.css_class(),
        type_label = file_type.label(),
        category_param = encode_query(record.category()),
        category = escape_html(record.category()),
        status = status_badge(record.status),
        title = escape_html(display_title(record)),
        description = escape_html(record.description()),
        uploader = escape_html(record.uploader()),
        created = escape_html(&record.created_label()),
        downloads = format_count(record.downloads()),
        views = format_count(record.views()),
        rating = escape_html(&record.rating_label()),
        href = escape_html(safe_href(record.file_url())),
    )
}

pub fn status_badge(status: ResourceStatus) -> String {
    format!(
        r#"<span class="badge {class}">{label}</span>"#,
        class = status.as_str().to_ascii_lowercase(),
        label = status.label(),
    )
}

fn display_title(record: &ResourceRecord) -> &str {
    match record.title() {
        "" => "Untitled resource",
        title => title,
    }
}

fn title_link(record: &ResourceRecord) -> String {
    let id = record.id.to_string();
    let title = escape_html(display_title(record));
    if id.is_empty() {
        title
    } else {
        format!(
            r#"<a href="/resource/{}">{title}</a>"#,
            encode_query(&id)
        )
    }
}

/// Only web links are rendered as download targets.
fn safe_href(url: &str) -> &str {
    if url.starts_with("https://") || url.starts_with("http://") {
        url
    } else {
        MISSING_FILE_URL
    }
}
