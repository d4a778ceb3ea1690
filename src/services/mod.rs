pub mod comment_service;
pub mod error;
pub mod import;
pub mod post_service;
pub mod user_service;

pub use comment_service::CommentService;
pub use error::{ServiceError, ServiceResult};
pub use import::{ImportService, ImportSummary};
pub use post_service::PostService;
pub use user_service::UserService;

use uuid::Uuid;

/// Token subjects are user ids; anything else names no user.
pub(crate) fn subject_id(subject: &str) -> Option<Uuid> {
    subject.parse().ok()
}

/// `None` for missing or blank input, otherwise the trimmed value.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
