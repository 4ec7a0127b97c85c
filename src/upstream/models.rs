use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Registration payload; field names follow the upstream user entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub pwhash: String,
    pub profile_image_link: String,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest<'a> {
    pub email: &'a str,
    pub code: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub profile_image_link: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Identifier rendered for URLs, whether the API sent a number or a string.
    pub fn id_string(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::Number(id) => Some(id.to_string()),
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            _ => None,
        }
    }

    /// Name as edited on the profile, falling back to the registration name.
    pub fn name(&self) -> Option<&str> {
        filled(&self.name).or(filled(&self.full_name))
    }

    pub fn avatar(&self) -> Option<&str> {
        filled(&self.avatar_url).or(filled(&self.profile_image_link))
    }

    pub fn display_name(&self) -> &str {
        self.name()
            .or(self.username.as_deref())
            .unwrap_or("Unknown")
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub title: String,
    pub description: String,
    pub category: String,
    pub file_url: String,
    pub tags: Vec<String>,
}
