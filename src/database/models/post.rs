use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::User;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub json_id: i64,
    pub title: String,
    pub body: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Post with its owner populated. The owner may itself be soft-deleted.
///
/// `userId` stays the owner's id and the populated record goes under `user`,
/// so list and detail responses keep the same `userId` type.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub user: Option<User>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub json_id: Option<i64>,
    pub title: String,
    pub body: String,
}

/// Mutable post fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostChanges {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl PostChanges {
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(body) = self.body {
            post.body = body;
        }
    }
}

/// List filter for active posts.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Case-insensitive substring match on the title.
    pub title: Option<String>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match &self.title {
            Some(needle) => post.title.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
