//! Client for the platform's REST API. Every call that carries a bearer
//! token can come back [`UpstreamError::Unauthorized`], which callers treat
//! as the end of the session.

pub mod models;

pub use models::{LoginResponse, NewResource, NewUser, ProfileUpdate, UserProfile};

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::resources::{ResourceRecord, ResourceStatus};

use models::{ForgotPasswordRequest, LoginRequest, ResetPasswordRequest};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream rejected the credential")]
    Unauthorized,

    #[error("upstream returned {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Message fit for a flash notification.
    pub fn user_message(&self) -> String {
        match self {
            UpstreamError::Unauthorized => "Your session has ended. Please log in again.".to_string(),
            UpstreamError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            UpstreamError::Rejected { .. } => "Request was rejected. Try again.".to_string(),
            UpstreamError::Transport(_) | UpstreamError::Decode(_) => {
                "Something went wrong. Try again.".to_string()
            }
        }
    }
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build upstream HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> UpstreamResult<LoginResponse> {
        let request = self
            .request(Method::POST, "/users/login", None)
            .json(&LoginRequest { email, password });
        // A failed login is a 401 too, but it is not a session ending.
        match send_json(request).await {
            Err(UpstreamError::Unauthorized) => Err(UpstreamError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid email or password.".to_string(),
            }),
            other => other,
        }
    }

    pub async fn register(&self, user: &NewUser) -> UpstreamResult<()> {
        send_empty(self.request(Method::POST, "/users/new", None).json(user)).await
    }

    pub async fn request_password_reset(&self, email: &str) -> UpstreamResult<()> {
        let request = self
            .request(Method::POST, "/users/forgot", None)
            .json(&ForgotPasswordRequest { email });
        send_empty(request).await
    }

    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> UpstreamResult<()> {
        let request = self
            .request(Method::POST, "/users/reset", None)
            .json(&ResetPasswordRequest {
                email,
                code,
                new_password,
            });
        send_empty(request).await
    }

    pub async fn current_user(&self, token: &str) -> UpstreamResult<UserProfile> {
        send_json(self.request(Method::GET, "/users/me", Some(token))).await
    }

    pub async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> UpstreamResult<()> {
        send_empty(
            self.request(Method::PATCH, "/users/me", Some(token))
                .json(update),
        )
        .await
    }

    pub async fn list_users(&self, token: &str) -> UpstreamResult<Vec<UserProfile>> {
        send_list(self.request(Method::GET, "/users", Some(token))).await
    }

    pub async fn delete_user(&self, token: &str, user_id: &str) -> UpstreamResult<()> {
        let path = format!("/users/drop/{}", path_segment(user_id));
        send_empty(self.request(Method::DELETE, &path, Some(token))).await
    }

    pub async fn list_resources(&self) -> UpstreamResult<Vec<ResourceRecord>> {
        send_list(self.request(Method::GET, "/resources", None)).await
    }

    pub async fn get_resource(&self, resource_id: &str) -> UpstreamResult<Option<ResourceRecord>> {
        let path = format!("/resources/{}", path_segment(resource_id));
        match send_json(self.request(Method::GET, &path, None)).await {
            Ok(record) => Ok(Some(record)),
            Err(UpstreamError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Every resource regardless of status, for moderation.
    pub async fn list_all_resources(&self, token: &str) -> UpstreamResult<Vec<ResourceRecord>> {
        send_list(self.request(Method::GET, "/resources/admin", Some(token))).await
    }

    pub async fn upload_resource(&self, token: &str, resource: &NewResource) -> UpstreamResult<()> {
        send_empty(
            self.request(Method::POST, "/resources", Some(token))
                .json(resource),
        )
        .await
    }

    pub async fn set_resource_status(
        &self,
        token: &str,
        resource_id: &str,
        status: ResourceStatus,
    ) -> UpstreamResult<()> {
        let path = format!(
            "/resources/{}/{}",
            path_segment(resource_id),
            status.action_segment()
        );
        send_empty(self.request(Method::PUT, &path, Some(token))).await
    }

    pub async fn delete_resource(&self, token: &str, resource_id: &str) -> UpstreamResult<()> {
        let path = format!("/resources/{}", path_segment(resource_id));
        send_empty(self.request(Method::DELETE, &path, Some(token))).await
    }
}

/// Identifiers come from form input; keep them to a single path segment.
fn path_segment(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> UpstreamResult<T> {
    let response = checked(request.send().await?).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| {
        warn!(?err, "failed to decode upstream response");
        UpstreamError::Decode(err.to_string())
    })
}

/// Collections are decoded item by item; an item that cannot be read is
/// logged and skipped instead of failing the whole list.
async fn send_list<T: DeserializeOwned>(request: RequestBuilder) -> UpstreamResult<Vec<T>> {
    let items: Vec<Value> = send_json(request).await?;
    Ok(decode_items(items))
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(index, ?err, "skipping undecodable upstream item");
                None
            }
        })
        .collect()
}

async fn send_empty(request: RequestBuilder) -> UpstreamResult<()> {
    checked(request.send().await?).await.map(|_| ())
}

async fn checked(response: Response) -> UpstreamResult<Response> {
    let status = response.status();
    debug!(%status, url = %response.url(), "upstream response");

    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(UpstreamError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Rejected {
        status,
        message: error_message(&body),
    })
}

/// Pull a human readable message out of an error body: `{"error": ..}`,
/// `{"message": ..}`, a bare JSON string, or short plain text.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["error", "message"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        Ok(Value::String(message)) => message,
        Ok(_) => String::new(),
        Err(_) if trimmed.len() <= 200 && !trimmed.starts_with('<') => trimmed.to_string(),
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"Bad credentials","message":"ignored"}"#),
            "Bad credentials"
        );
        assert_eq!(error_message(r#"{"message":"Email taken"}"#), "Email taken");
        assert_eq!(error_message(r#""plain json string""#), "plain json string");
        assert_eq!(error_message("User not found"), "User not found");
        assert_eq!(error_message("<html>502</html>"), "");
        assert_eq!(error_message(r#"{"status":500}"#), "");
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8081/api/", Duration::from_secs(1))
            .expect("client");
        assert_eq!(client.base_url(), "http://localhost:8081/api");
        assert_eq!(
            client.url("/resources/admin"),
            "http://localhost:8081/api/resources/admin"
        );
    }

    #[test]
    fn path_segments_are_sanitized() {
        assert_eq!(path_segment("42"), "42");
        assert_eq!(path_segment("../users/1"), "users1");
    }

    #[test]
    fn registration_payload_uses_upstream_names() {
        let user = NewUser {
            full_name: "Nadia Rahman".to_string(),
            username: "nadia".to_string(),
            email: "nadia@example.com".to_string(),
            pwhash: "Secret#123".to_string(),
            profile_image_link: String::new(),
        };
        assert_eq!(
            serde_json::to_value(&user).expect("serialize"),
            json!({
                "fullName": "Nadia Rahman",
                "username": "nadia",
                "email": "nadia@example.com",
                "pwhash": "Secret#123",
                "profileImageLink": ""
            })
        );
    }

    #[test]
    fn profile_accepts_login_shape() {
        let profile: UserProfile = serde_json::from_value(json!({
            "username": "nadia",
            "email": "nadia@example.com",
            "fullName": "Nadia Rahman",
            "profileImageLink": "https://img.example.com/n.png"
        }))
        .expect("decode");
        assert_eq!(profile.display_name(), "Nadia Rahman");
        assert_eq!(profile.avatar(), Some("https://img.example.com/n.png"));
        assert_eq!(profile.id_string(), None);
    }

    #[test]
    fn profile_with_both_name_spellings() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": 4,
            "name": "",
            "fullName": "Nadia Rahman",
            "avatarUrl": "https://img.example.com/new.png",
            "profileImageLink": "https://img.example.com/old.png"
        }))
        .expect("decode");
        assert_eq!(profile.display_name(), "Nadia Rahman");
        assert_eq!(profile.avatar(), Some("https://img.example.com/new.png"));
    }

    #[test]
    fn unreadable_items_are_skipped() {
        let records: Vec<ResourceRecord> = decode_items(vec![
            json!({"id": 1, "title": "Graphs", "status": "APPROVED"}),
            json!("not a record"),
            json!({"id": 2, "uploaderName": "nadia", "uploader": {"id": 3}, "downloadCount": 4, "downloads": []}),
        ]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].uploader(), "nadia");
        assert_eq!(records[1].downloads(), 4);

        let users: Vec<UserProfile> = decode_items(vec![
            json!({"username": "nadia"}),
            json!({"username": 42}),
        ]);
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn user_messages() {
        let rejected = UpstreamError::Rejected {
            status: StatusCode::CONFLICT,
            message: "Username exists".to_string(),
        };
        assert_eq!(rejected.user_message(), "Username exists");
        assert!(UpstreamError::Unauthorized.user_message().contains("log in"));
    }
}
