use once_cell::sync::Lazy;
use regex::Regex;

use crate::resources::{FileType, UPLOAD_CATEGORIES};

pub const MIN_PASSWORD_LEN: usize = 8;
const PASSWORD_SYMBOLS: &str = "@$!%*?&";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+$").expect("valid username regex"));

static PASSWORD_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9@$!%*?&]{8,}$").expect("valid password charset regex")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// At least eight characters drawn only from letters, digits and
/// `@$!%*?&`, with one of each class present.
pub fn is_strong_password(password: &str) -> bool {
    PASSWORD_CHARSET_RE.is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadProblem {
    MissingTitle,
    MissingCategory,
    UnknownCategory,
    MissingFile,
    UnsupportedFile,
}

impl UploadProblem {
    pub fn message(&self) -> &'static str {
        match self {
            UploadProblem::MissingTitle => "Please enter a title.",
            UploadProblem::MissingCategory => "Please choose a category.",
            UploadProblem::UnknownCategory => "Please choose one of the listed categories.",
            UploadProblem::MissingFile => "Please provide a link to the file.",
            UploadProblem::UnsupportedFile => "Only PDF, DOC, DOCX and ZIP files are accepted.",
        }
    }
}

pub fn check_upload(title: &str, category: &str, file_url: &str) -> Result<(), UploadProblem> {
    if title.trim().is_empty() {
        return Err(UploadProblem::MissingTitle);
    }
    let category = category.trim();
    if category.is_empty() {
        return Err(UploadProblem::MissingCategory);
    }
    if !UPLOAD_CATEGORIES.contains(&category) {
        return Err(UploadProblem::UnknownCategory);
    }
    let file_url = file_url.trim();
    if file_url.is_empty() {
        return Err(UploadProblem::MissingFile);
    }
    if !FileType::from_url(file_url).is_uploadable() {
        return Err(UploadProblem::UnsupportedFile);
    }
    Ok(())
}

/// Split a comma separated tag list, dropping blanks and duplicates.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
        if !tags.iter().any(|known| known.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert!(is_valid_email("nadia@example.com"));
        assert!(!is_valid_email("nadia@example"));
        assert!(!is_valid_email("nadia example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn usernames_are_lowercase_alphanumeric() {
        assert!(is_valid_username("nadia2024"));
        assert!(!is_valid_username("Nadia"));
        assert!(!is_valid_username("nadia_r"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn strong_passwords() {
        assert!(is_strong_password("Secret@1"));
        assert!(is_strong_password("Abcdef1!"));
        assert!(!is_strong_password("Abcde1!"));
        assert!(!is_strong_password("abcdefg1!"));
        assert!(!is_strong_password("ABCDEFG1!"));
        assert!(!is_strong_password("Abcdefgh!"));
        assert!(!is_strong_password("Abcdefg12"));
        assert!(!is_strong_password("Abcdef1!#"));
    }

    #[test]
    fn upload_checks() {
        assert_eq!(
            check_upload("Notes", "Lecture Notes", "https://cdn.example.com/n.pdf"),
            Ok(())
        );
        assert_eq!(
            check_upload(" ", "Lecture Notes", "x.pdf"),
            Err(UploadProblem::MissingTitle)
        );
        assert_eq!(
            check_upload("Notes", "", "x.pdf"),
            Err(UploadProblem::MissingCategory)
        );
        assert_eq!(
            check_upload("Notes", "Memes", "x.pdf"),
            Err(UploadProblem::UnknownCategory)
        );
        assert_eq!(
            check_upload("Notes", "Exam Prep", ""),
            Err(UploadProblem::MissingFile)
        );
        assert_eq!(
            check_upload("Notes", "Exam Prep", "https://cdn.example.com/slides.pptx"),
            Err(UploadProblem::UnsupportedFile)
        );
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_tags(" rust, async ,, Rust ,web"),
            vec!["rust".to_string(), "async".to_string(), "web".to_string()]
        );
        assert!(parse_tags(" , ").is_empty());
    }
}
