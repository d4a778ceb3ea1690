//! Who may mutate what.
//!
//! Users and posts are owned by id: the token subject must equal the user id
//! (or the post's `user_id`). Comments carry no user reference, only a
//! name/email snapshot taken when they were written, so comment ownership is
//! decided by comparing the caller's *current* email with that snapshot. A
//! user who changes their email loses edit rights over older comments.

use uuid::Uuid;

/// True when the token subject names `owner_id`.
pub fn is_owner(subject: &str, owner_id: &Uuid) -> bool {
    subject
        .parse::<Uuid>()
        .map(|subject_id| subject_id == *owner_id)
        .unwrap_or(false)
}

/// Exact, case-sensitive comparison against the stored snapshot.
pub fn is_comment_author(current_email: &str, snapshot_email: &str) -> bool {
    current_email == snapshot_email
}
