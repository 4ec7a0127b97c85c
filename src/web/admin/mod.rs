mod dashboard;
mod moderation;
mod types;
mod users;

pub use dashboard::dashboard;
pub use moderation::{change_resource_status, delete_resource};
pub use users::delete_user;
