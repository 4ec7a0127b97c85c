use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    resources::{
        CategoryFilter, QueryParams, ResourceRecord, ResourceStatus, SortKey, StatusCounts,
        StatusGate, query,
    },
    upstream::{UpstreamError, UserProfile},
    web::{
        AppState,
        auth::{require_session, session_ended},
        catalog::status_badge,
        flash::compose_flash_message,
        templates::{PageLayout, escape_html, render_page},
    },
};

use super::types::ManageQuery;

pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<ManageQuery>,
) -> Response {
    let (session, token) = match require_session(&state, jar) {
        Ok(signed_in) => signed_in,
        Err(redirect) => return redirect.into_response(),
    };

    let api = state.api();
    let (resources, users) = tokio::join!(api.list_all_resources(&token), api.list_users(&token));

    if matches!(resources, Err(UpstreamError::Unauthorized))
        || matches!(users, Err(UpstreamError::Unauthorized))
    {
        return session_ended(session).into_response();
    }

    let mut flash_html = params.flash.render();
    let resources = resources.unwrap_or_else(|err| {
        error!(?err, "failed to load resources for moderation");
        flash_html.push_str(&load_failure(&err));
        Vec::new()
    });
    let users = users.unwrap_or_else(|err| {
        error!(?err, "failed to load users");
        flash_html.push_str(&load_failure(&err));
        Vec::new()
    });

    let filter = QueryParams {
        search: params.search.as_deref().unwrap_or("").trim().to_string(),
        sort: SortKey::NewestFirst,
        category: CategoryFilter::All,
        status: StatusGate::from_admin_param(params.filter.as_deref()),
    };

    let body = render_dashboard(&resources, &users, &filter);
    let page = render_page(
        PageLayout::new("Manage", true, body)
            .with_flash(flash_html)
            .with_session_poll(state.config().session_poll_interval),
    );
    (session.into_store().into_jar(), Html(page)).into_response()
}

fn load_failure(err: &UpstreamError) -> String {
    match err {
        UpstreamError::Rejected { status, .. } if *status == StatusCode::FORBIDDEN => {
            compose_flash_message(None, Some("not_authorized"))
        }
        _ => compose_flash_message(None, Some("upstream")),
    }
}

fn render_dashboard(
    resources: &[ResourceRecord],
    users: &[UserProfile],
    filter: &QueryParams,
) -> String {
    let counts = StatusCounts::tally(resources);
    let visible = query(resources, filter);

    format!(
        r#"        <h1>Manage</h1>
        <section class="stats">
            <div class="stat"><strong>{total}</strong>Total resources</div>
            <div class="stat"><strong>{approved}</strong>Approved</div>
            <div class="stat"><strong>{pending}</strong>Pending</div>
            <div class="stat"><strong>{declined}</strong>Declined</div>
            <div class="stat"><strong>{user_count}</strong>Users</div>
        </section>
        <section class="panel" style="margin-top: 1.5rem;">
            <h2>Resource moderation</h2>
            {filters}
            {resource_table}
        </section>
        <section class="panel">
            <h2>Users</h2>
            {user_table}
        </section>"#,
        total = counts.total,
        approved = counts.approved,
        pending = counts.pending,
        declined = counts.declined,
        user_count = users.len(),
        filters = render_filters(filter),
        resource_table = render_resource_table(&visible, filter),
        user_table = render_user_table(users),
    )
}

fn render_filters(filter: &QueryParams) -> String {
    let selected_status = filter.status.as_param();
    let options = std::iter::once(StatusGate::Any)
        .chain(ResourceStatus::ALL.into_iter().map(StatusGate::Only))
        .map(|gate| {
            let label = match gate {
                StatusGate::Only(status) => status.label(),
                _ => "All",
            };
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = gate.as_param(),
                selected = if gate.as_param() == selected_status {
                    " selected"
                } else {
                    ""
                },
            )
        })
        .collect::<String>();

    format!(
        r#"<form class="filters" method="get" action="/manage">
                <label>Search
                    <input type="search" name="search" value="{search}" placeholder="Title, description or category">
                </label>
                <label>Status
                    <select name="filter">{options}</select>
                </label>
                <div></div>
                <div class="form-actions">
                    <button type="submit">Filter</button>
                    <a href="/manage">Reset</a>
                </div>
            </form>"#,
        search = escape_html(&filter.search),
    )
}

fn render_resource_table(visible: &[&ResourceRecord], filter: &QueryParams) -> String {
    if visible.is_empty() {
        return r#"<p class="empty">No resources match this view.</p>"#.to_string();
    }

    let return_fields = format!(
        r#"<input type="hidden" name="filter" value="{}"><input type="hidden" name="search" value="{}">"#,
        filter.status.as_param(),
        escape_html(&filter.search),
    );

    let rows = visible
        .iter()
        .map(|record| {
            let id = escape_html(&record.id.to_string());
            let actions = ResourceStatus::ALL
                .iter()
                .filter(|status| **status != record.status)
                .map(|status| {
                    format!(
                        r#"<form method="post" action="/manage/resources/status"><input type="hidden" name="id" value="{id}"><input type="hidden" name="status" value="{value}">{return_fields}<button type="submit">{verb}</button></form> "#,
                        value = status.as_str(),
                        verb = match status {
                            ResourceStatus::Approved => "Approve",
                            ResourceStatus::Pending => "Mark pending",
                            ResourceStatus::Declined => "Decline",
                        },
                    )
                })
                .collect::<String>();

            format!(
                r#"<tr><td><a href="/resource/{id}">{title}</a><div class="muted">{category}</div></td><td>{uploader}</td><td>{created}</td><td>{badge}</td><td>{actions}<form method="post" action="/manage/resources/delete" onsubmit="return confirm('Delete this resource?');"><input type="hidden" name="id" value="{id}">{return_fields}<button class="danger" type="submit">Delete</button></form></td></tr>"#,
                title = escape_html(match record.title() {
                    "" => "Untitled resource",
                    title => title,
                }),
                category = escape_html(record.category()),
                uploader = escape_html(record.uploader()),
                created = escape_html(&record.created_label()),
                badge = status_badge(record.status),
            )
        })
        .collect::<String>();

    format!(
        r#"<table>
                <thead><tr><th>Resource</th><th>Uploader</th><th>Uploaded</th><th>Status</th><th>Actions</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>"#
    )
}

fn render_user_table(users: &[UserProfile]) -> String {
    if users.is_empty() {
        return r#"<p class="empty">No users to show.</p>"#.to_string();
    }

    let rows = users
        .iter()
        .map(|user| {
            let action = match user.id_string() {
                Some(id) => format!(
                    r#"<form method="post" action="/manage/users/delete" onsubmit="return confirm('Delete this user?');"><input type="hidden" name="id" value="{}"><button class="danger" type="submit">Delete</button></form>"#,
                    escape_html(&id)
                ),
                None => String::new(),
            };
            format!(
                "<tr><td>{name}</td><td>{username}</td><td>{email}</td><td>{action}</td></tr>",
                name = escape_html(user.display_name()),
                username = escape_html(user.username.as_deref().unwrap_or("")),
                email = escape_html(user.email.as_deref().unwrap_or("")),
            )
        })
        .collect::<String>();

    format!(
        r#"<table>
                <thead><tr><th>Name</th><th>Username</th><th>Email</th><th></th></tr></thead>
                <tbody>{rows}</tbody>
            </table>"#
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn resources() -> Vec<ResourceRecord> {
        serde_json::from_value(json!([
            {"id": 1, "title": "Graphs", "category": "Lecture Notes", "status": "APPROVED"},
            {"id": 2, "title": "Draft notes", "category": "Lecture Notes", "status": "PENDING"},
            {"id": 3, "title": "Spam", "category": "Projects", "status": "REJECTED"},
            {"id": 4, "title": "Mystery", "status": "ARCHIVED"}
        ]))
        .expect("resources")
    }

    fn users() -> Vec<UserProfile> {
        serde_json::from_value(json!([
            {"id": 10, "fullName": "Nadia Rahman", "username": "nadia", "email": "nadia@example.com"},
            {"username": "ghost"}
        ]))
        .expect("users")
    }

    #[test]
    fn stats_count_every_status() {
        let filter = QueryParams {
            status: StatusGate::Any,
            ..QueryParams::default()
        };
        let html = render_dashboard(&resources(), &users(), &filter);
        assert!(html.contains("<strong>4</strong>Total resources"));
        assert!(html.contains("<strong>1</strong>Approved"));
        assert!(html.contains("<strong>2</strong>Pending"));
        assert!(html.contains("<strong>1</strong>Declined"));
        assert!(html.contains("<strong>2</strong>Users"));
    }

    #[test]
    fn status_filter_limits_table() {
        let all = resources();
        let filter = QueryParams {
            status: StatusGate::Only(ResourceStatus::Pending),
            ..QueryParams::default()
        };
        let visible = query(&all, &filter);
        let html = render_resource_table(&visible, &filter);
        assert!(html.contains("Draft notes"));
        assert!(html.contains("Mystery"));
        assert!(!html.contains("Graphs"));
        assert!(html.contains(r#"name="filter" value="PENDING""#));
        assert!(html.contains(r#"value="APPROVED"><input type="hidden" name="filter""#));
    }

    #[test]
    fn users_without_id_have_no_delete() {
        let html = render_user_table(&users());
        assert_eq!(html.matches("/manage/users/delete").count(), 1);
        assert!(html.contains("Nadia Rahman"));
        assert!(html.contains("ghost"));
    }
}
