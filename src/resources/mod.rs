//! Resource records as served by the upstream API, plus the per-field
//! display resolvers every view goes through.

pub mod query;

pub use query::{
    ALL_CATEGORIES, CategoryFilter, QueryParams, SortKey, StatusCounts, StatusGate,
    categories, featured, query,
};

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNKNOWN_UPLOADER: &str = "Unknown";
pub const NO_RATING: &str = "—";
pub const MISSING_FILE_URL: &str = "#";

/// Categories offered by the upload form.
pub const UPLOAD_CATEGORIES: [&str; 8] = [
    "Lecture Notes",
    "Assignments",
    "Research Papers",
    "Projects",
    "Tutorials",
    "Cheat Sheets",
    "Lab Manuals",
    "Exam Prep",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceStatus {
    #[default]
    Pending,
    Approved,
    Declined,
}

impl ResourceStatus {
    pub const ALL: [ResourceStatus; 3] = [
        ResourceStatus::Pending,
        ResourceStatus::Approved,
        ResourceStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Pending => "PENDING",
            ResourceStatus::Approved => "APPROVED",
            ResourceStatus::Declined => "DECLINED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceStatus::Pending => "Pending",
            ResourceStatus::Approved => "Approved",
            ResourceStatus::Declined => "Declined",
        }
    }

    /// Upstream path segment for the moderation endpoint.
    pub fn action_segment(&self) -> &'static str {
        match self {
            ResourceStatus::Pending => "pending",
            ResourceStatus::Approved => "approve",
            ResourceStatus::Declined => "decline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(ResourceStatus::Pending),
            "APPROVED" => Some(ResourceStatus::Approved),
            "DECLINED" | "REJECTED" => Some(ResourceStatus::Declined),
            _ => None,
        }
    }

    /// Lenient form used for upstream data: anything unknown is pending.
    pub fn from_upstream(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(ResourceStatus::from_upstream(value.as_str()))
    }
}

/// Identifier as the API sends it: numeric for database rows, but tolerated
/// as a string too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResourceId {
    Number(i64),
    Text(String),
}

impl Default for ResourceId {
    fn default() -> Self {
        ResourceId::Text(String::new())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Number(id) => write!(f, "{id}"),
            ResourceId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: ResourceId,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_url: Option<String>,
    #[serde(default, rename = "file_url", deserialize_with = "lenient_string")]
    pub legacy_file_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub uploader_name: Option<String>,
    /// Either a plain name or the uploader's user object.
    #[serde(default, rename = "uploader")]
    pub uploader_detail: Option<Value>,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default, rename = "created_at", deserialize_with = "lenient_string")]
    pub legacy_created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub download_count: Option<u64>,
    /// A count, or the list of download entries.
    #[serde(default, rename = "downloads")]
    pub download_entries: Option<Value>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub view_count: Option<u64>,
    #[serde(default, rename = "views")]
    pub view_entries: Option<Value>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
}

impl ResourceRecord {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn category(&self) -> &str {
        filled(&self.category)
            .or(filled(&self.category_name))
            .unwrap_or(UNCATEGORIZED)
    }

    pub fn uploader(&self) -> &str {
        filled(&self.uploader_name)
            .or_else(|| self.uploader_detail.as_ref().and_then(uploader_label))
            .unwrap_or(UNKNOWN_UPLOADER)
    }

    pub fn file_url(&self) -> &str {
        filled(&self.file_url)
            .or(filled(&self.legacy_file_url))
            .unwrap_or(MISSING_FILE_URL)
    }

    pub fn downloads(&self) -> u64 {
        self.download_count
            .or_else(|| self.download_entries.as_ref().and_then(count_value))
            .unwrap_or(0)
    }

    pub fn views(&self) -> u64 {
        self.view_count
            .or_else(|| self.view_entries.as_ref().and_then(count_value))
            .unwrap_or(0)
    }

    /// Numeric rating, `None` standing in for "no rating".
    pub fn rating(&self) -> Option<f64> {
        self.rating.filter(|value| value.is_finite())
    }

    pub fn rating_label(&self) -> String {
        self.rating()
            .map(|rating| format!("{rating:.1}"))
            .unwrap_or_else(|| NO_RATING.to_string())
    }

    /// Creation time; missing or unparsable timestamps resolve to `None`.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.legacy_created_at.as_deref().and_then(parse_timestamp))
    }

    pub fn created_label(&self) -> String {
        self.created_at()
            .map(|at| at.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| "Unknown date".to_string())
    }

    pub fn file_type(&self) -> FileType {
        FileType::from_url(self.file_url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Word,
    Zip,
    Slides,
    Spreadsheet,
    Other,
}

impl FileType {
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or("");
        let Some((_, ext)) = path.rsplit_once('.') else {
            return FileType::Other;
        };
        if ext.contains('/') {
            return FileType::Other;
        }
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => FileType::Pdf,
            "doc" | "docx" => FileType::Word,
            "zip" => FileType::Zip,
            "ppt" | "pptx" => FileType::Slides,
            "xls" | "xlsx" => FileType::Spreadsheet,
            _ => FileType::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileType::Pdf => "PDF",
            FileType::Word => "Word",
            FileType::Zip => "ZIP",
            FileType::Slides => "PPT",
            FileType::Spreadsheet => "Spreadsheet",
            FileType::Other => "File",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            FileType::Pdf => "type-pdf",
            FileType::Word => "type-word",
            FileType::Zip => "type-zip",
            FileType::Slides => "type-slides",
            FileType::Spreadsheet => "type-sheet",
            FileType::Other => "type-file",
        }
    }

    /// Formats the upload form accepts.
    pub fn is_uploadable(&self) -> bool {
        matches!(self, FileType::Pdf | FileType::Word | FileType::Zip)
    }
}

/// `1234` → `1.2k`.
pub fn format_count(count: u64) -> String {
    if count >= 1000 {
        format!("{:.1}k", count as f64 / 1000.0)
    } else {
        count.to_string()
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.and_utc());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn uploader_label(value: &Value) -> Option<&str> {
    let name = match value {
        Value::String(name) => Some(name.as_str()),
        Value::Object(user) => ["fullName", "name", "username"]
            .iter()
            .find_map(|key| user.get(*key).and_then(Value::as_str)),
        _ => None,
    };
    name.filter(|name| !name.is_empty())
}

fn number_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(value) => value.as_f64(),
        Value::String(value) => value.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|value| value.is_finite())
}

/// Counts arrive as numbers, numeric strings, or the list being counted.
fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Array(entries) => Some(entries.len() as u64),
        other => number_value(other)
            .filter(|value| *value >= 0.0)
            .map(|value| value as u64),
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<ResourceId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(value) => value
            .as_i64()
            .map(ResourceId::Number)
            .unwrap_or_else(|| ResourceId::Text(value.to_string())),
        Value::String(value) => ResourceId::Text(value),
        _ => ResourceId::default(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_value(&Value::deserialize(deserializer)?))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(_) => None,
        other => count_value(&other),
    })
}
