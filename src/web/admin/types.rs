use serde::Deserialize;

use crate::web::{flash::FlashQuery, templates::encode_query};

/// Query string of the manage dashboard. `filter` selects a moderation
/// status (or `ALL`); `status`/`error` are flash codes.
#[derive(Debug, Default, Deserialize)]
pub struct ManageQuery {
    pub search: Option<String>,
    pub filter: Option<String>,
    #[serde(flatten)]
    pub flash: FlashQuery,
}

/// Where a moderation action returns to, so the current view survives it.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnTo {
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub search: String,
}

impl ReturnTo {
    pub fn location(&self) -> String {
        let mut location = String::from("/manage");
        let mut separator = '?';
        for (key, value) in [("filter", self.filter.trim()), ("search", self.search.trim())] {
            if !value.is_empty() {
                location.push(separator);
                location.push_str(key);
                location.push('=');
                location.push_str(&encode_query(value));
                separator = '&';
            }
        }
        location
    }

    pub fn with_status(&self, code: &str) -> String {
        self.with_flash("status", code)
    }

    pub fn with_error(&self, code: &str) -> String {
        self.with_flash("error", code)
    }

    fn with_flash(&self, key: &str, code: &str) -> String {
        let location = self.location();
        let separator = if location.contains('?') { '&' } else { '?' };
        format!("{location}{separator}{key}={code}")
    }
}
