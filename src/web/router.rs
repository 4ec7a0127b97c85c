use axum::{
    Router,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;

use crate::web::{
    AppState, admin, auth, catalog, landing, password, profile, registration,
    responses::json_error, session_api, templates::render_not_found_page, upload,
};

const ROBOTS_TXT_BODY: &str = include_str!("../../robots.txt");

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing::landing_page))
        .route("/resources", get(catalog::resources_page))
        .route("/resource/:id", get(catalog::resource_details))
        .route(
            "/auth/login",
            get(auth::login_page).post(auth::process_login),
        )
        .route(
            "/auth/signup",
            get(registration::signup_page).post(registration::process_signup),
        )
        .route(
            "/auth/forgot",
            get(password::forgot_page).post(password::request_code),
        )
        .route("/auth/forgot/reset", post(password::reset_password))
        .route("/auth/logout", post(auth::logout))
        .route("/profile", get(profile::profile_page))
        .route(
            "/profile/edit",
            get(profile::edit_profile_page).post(profile::update_profile),
        )
        .route(
            "/upload",
            get(upload::upload_page).post(upload::submit_upload),
        )
        .route("/manage", get(admin::dashboard))
        .route("/manage/users/delete", post(admin::delete_user))
        .route(
            "/manage/resources/status",
            post(admin::change_resource_status),
        )
        .route("/manage/resources/delete", post(admin::delete_resource))
        .route("/api/session", get(session_api::session_status))
        .route("/api/session/events", get(session_api::session_events))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(State(state): State<AppState>, jar: CookieJar, uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        return json_error(StatusCode::NOT_FOUND, "Not found").into_response();
    }

    let mut session = state.session(jar);
    let authenticated = session.is_valid();
    (
        StatusCode::NOT_FOUND,
        session.into_store().into_jar(),
        Html(render_not_found_page(authenticated)),
    )
        .into_response()
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::Body,
        http::{HeaderValue, Request},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::PortalConfig,
        session::{EXPIRY_KEY, ManualClock, TOKEN_KEY, session_ttl},
    };

    const T0: i64 = 1_700_000_000_000;

    fn app(clock: &ManualClock) -> Router {
        // Nothing listens here; these tests only hit routes that never reach it.
        app_with_upstream(clock, "http://127.0.0.1:9")
    }

    fn app_with_upstream(clock: &ManualClock, upstream: &str) -> Router {
        let config = PortalConfig {
            port: 0,
            upstream_base_url: upstream.to_string(),
            upstream_timeout: Duration::from_millis(200),
            session_poll_interval: Duration::from_secs(60),
            secure_cookies: true,
            featured_count: 6,
        };
        let state = AppState::new(config)
            .expect("state")
            .with_clock(Arc::new(clock.clone()));
        build_router(state)
    }

    /// Upstream that refuses every request with 401.
    async fn refusing_upstream() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("upstream addr");
        let upstream = Router::new().fallback(|| async {
            (
                StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({ "error": "Invalid token" })),
            )
        });
        tokio::spawn(async move {
            let _ = axum::serve(listener, upstream).await;
        });
        format!("http://{addr}")
    }

    fn assert_credential_removed(response: &Response) {
        let cookies = set_cookies(response);
        assert!(cookies.iter().any(|c| c.starts_with(&format!("{TOKEN_KEY}=;"))));
        assert!(cookies.iter().any(|c| c.starts_with(&format!("{EXPIRY_KEY}=;"))));
    }

    fn credential_cookie(token: &str, expiry_ms: i64) -> HeaderValue {
        HeaderValue::from_str(&format!("{TOKEN_KEY}={token}; {EXPIRY_KEY}={expiry_ms}"))
            .expect("cookie header")
    }

    fn get_request(uri: &str, cookie: Option<HeaderValue>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).expect("request")
    }

    fn location(response: &Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn protected_route_without_session_redirects_to_login() {
        let clock = ManualClock::at(T0);
        for path in ["/profile", "/profile/edit", "/upload", "/manage"] {
            let response = app(&clock).oneshot(get_request(path, None)).await.expect("response");
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(location(&response), "/auth/login", "{path}");
        }
    }

    #[tokio::test]
    async fn expired_session_is_cleared_with_notice() {
        let clock = ManualClock::at(T0);
        let cookie = credential_cookie("abc", T0 - 1);
        let response = app(&clock)
            .oneshot(get_request("/upload", Some(cookie)))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login?notice=session_expired");
        assert_credential_removed(&response);
    }

    #[tokio::test]
    async fn upstream_401_ends_the_session() {
        let clock = ManualClock::at(T0);
        let upstream = refusing_upstream().await;
        let expiry = T0 + session_ttl().num_milliseconds();

        let response = app_with_upstream(&clock, &upstream)
            .oneshot(get_request("/profile", Some(credential_cookie("abc", expiry))))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login?notice=session_expired");
        assert_credential_removed(&response);

        let moderation = Request::builder()
            .method("POST")
            .uri("/manage/resources/status")
            .header(header::COOKIE, credential_cookie("abc", expiry))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("id=7&status=APPROVED&filter=PENDING&search="))
            .expect("request");
        let response = app_with_upstream(&clock, &upstream)
            .oneshot(moderation)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth/login?notice=session_expired");
        assert_credential_removed(&response);
    }

    #[tokio::test]
    async fn unknown_moderation_status_returns_to_view() {
        let clock = ManualClock::at(T0);
        let request = Request::builder()
            .method("POST")
            .uri("/manage/resources/status")
            .header(header::COOKIE, credential_cookie("abc", T0 + 1_000))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("id=7&status=ARCHIVED&filter=PENDING&search=graphs"))
            .expect("request");
        let response = app(&clock).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/manage?filter=PENDING&search=graphs&error=invalid_status"
        );
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn rejected_login_keeps_cookies_untouched() {
        let clock = ManualClock::at(T0);
        let upstream = refusing_upstream().await;
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=nadia%40example.com&password=Secret%40123"))
            .expect("request");
        let response = app_with_upstream(&clock, &upstream)
            .oneshot(request)
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookies(&response).is_empty());
        let html = body_text(response).await;
        assert!(html.contains("Invalid email or password."));
        assert!(!html.contains("Session Expired"));
    }

    #[tokio::test]
    async fn upload_page_renders_for_valid_session() {
        let clock = ManualClock::at(T0);
        let expiry = T0 + session_ttl().num_milliseconds();
        let response = app(&clock)
            .oneshot(get_request("/upload", Some(credential_cookie("abc", expiry))))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Share a resource"));
        assert!(html.contains("Lab Manuals"));
        assert!(html.contains("EventSource"));
    }

    #[tokio::test]
    async fn public_only_routes_redirect_signed_in_users_home() {
        let clock = ManualClock::at(T0);
        let expiry = T0 + 1_000;
        for path in ["/auth/login", "/auth/signup", "/auth/forgot"] {
            let response = app(&clock)
                .oneshot(get_request(path, Some(credential_cookie("abc", expiry))))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(location(&response), "/", "{path}");
        }
    }

    #[tokio::test]
    async fn login_page_shows_expiry_notice() {
        let clock = ManualClock::at(T0);
        let response = app(&clock)
            .oneshot(get_request("/auth/login?notice=session_expired", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Session Expired"));
        assert!(html.contains(r#"action="/auth/login""#));
    }

    #[tokio::test]
    async fn login_rejects_malformed_email_before_upstream() {
        let clock = ManualClock::at(T0);
        let request = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("email=not-an-email&password=Secret%40123"))
            .expect("request");
        let response = app(&clock).oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("valid email"));
    }

    #[tokio::test]
    async fn logout_clears_cookies() {
        let clock = ManualClock::at(T0);
        let request = Request::builder()
            .method("POST")
            .uri("/auth/logout")
            .header(header::COOKIE, credential_cookie("abc", T0 + 1_000))
            .body(Body::empty())
            .expect("request");
        let response = app(&clock).oneshot(request).await.expect("response");
        assert_eq!(location(&response), "/?status=logged_out");
        assert_eq!(set_cookies(&response).len(), 2);
    }

    #[tokio::test]
    async fn session_poll_reports_transition() {
        let clock = ManualClock::at(T0);
        let response = app(&clock)
            .oneshot(get_request(
                "/api/session?was_authenticated=true",
                Some(credential_cookie("abc", T0 - 5)),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("json");
        assert_eq!(body["authenticated"], false);
        assert_eq!(body["notice"], "session_expired");

        let quiet = app(&clock)
            .oneshot(get_request("/api/session", None))
            .await
            .expect("response");
        let body: serde_json::Value = serde_json::from_str(&body_text(quiet).await).expect("json");
        assert_eq!(body["authenticated"], false);
        assert!(body.get("notice").is_none());
    }

    #[tokio::test]
    async fn unknown_routes_get_404() {
        let clock = ManualClock::at(T0);
        let page = app(&clock)
            .oneshot(get_request("/no/such/page", None))
            .await
            .expect("response");
        assert_eq!(page.status(), StatusCode::NOT_FOUND);
        assert!(body_text(page).await.contains("404"));

        let api = app(&clock)
            .oneshot(get_request("/api/nope", None))
            .await
            .expect("response");
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
        assert!(body_text(api).await.contains("Not found"));
    }

    #[tokio::test]
    async fn health_and_robots() {
        let clock = ManualClock::at(T0);
        let health = app(&clock).oneshot(get_request("/healthz", None)).await.expect("response");
        assert_eq!(health.status(), StatusCode::OK);

        let robots = app(&clock)
            .oneshot(get_request("/robots.txt", None))
            .await
            .expect("response");
        assert_eq!(robots.status(), StatusCode::OK);
        assert!(body_text(robots).await.contains("User-agent"));
    }
}
