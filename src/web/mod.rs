pub mod admin;
pub mod auth;
pub mod catalog;
pub mod flash;
pub mod landing;
pub mod password;
pub mod profile;
pub mod registration;
pub mod responses;
pub mod router;
pub mod session_api;
pub mod state;
pub mod templates;
pub mod upload;
pub mod validation;

pub use state::{AppState, WebSession};
