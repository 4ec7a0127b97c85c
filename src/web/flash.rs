use serde::Deserialize;

use crate::session::SessionNotice;

use super::templates::{escape_html, flash_notice};

/// Query parameters a redirect may carry to announce its outcome.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub status: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl FlashQuery {
    pub fn render(&self) -> String {
        if self.notice.as_deref() == Some(SessionNotice::SessionExpired.event_name()) {
            let notice = SessionNotice::SessionExpired;
            return flash_notice(notice.title(), notice.message());
        }
        compose_flash_message(self.status.as_deref(), self.error.as_deref())
    }
}

/// Compose a flash message HTML snippet for known status or error codes.
pub fn compose_flash_message(status: Option<&str>, error: Option<&str>) -> String {
    if let Some(status) = status {
        let message = match status {
            "logged_in" => "Welcome back!",
            "logged_out" => "You have been logged out.",
            "registered" => "Account created. You can log in now.",
            "password_reset" => "Password updated. Log in with your new password.",
            "profile_updated" => "Profile updated.",
            "uploaded" => "Resource submitted. It will appear once approved.",
            "user_deleted" => "User deleted.",
            "resource_approved" => "Resource approved.",
            "resource_pending" => "Resource moved back to pending.",
            "resource_declined" => "Resource declined.",
            "resource_deleted" => "Resource deleted.",
            _ => "",
        };

        if !message.is_empty() {
            return format!(r#"<div class="flash success">{message}</div>"#);
        }
    }

    if let Some(error) = error {
        let message = match error {
            "not_authorized" => "Administrator access is required for that action.",
            "not_found" => "That item no longer exists.",
            "invalid_status" => "Unknown resource status.",
            "upstream" => "The server could not complete the request. Try again.",
            _ => "Something went wrong. Try again.",
        };

        return format!(
            r#"<div class="flash error">{}</div>"#,
            escape_html(message)
        );
    }

    String::new()
}
