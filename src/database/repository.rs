//! Storage seams, one trait per entity.
//!
//! Soft-deleted users and posts are invisible to every `*_active*` method.
//! Uniqueness (user email/name/username/json_id, active post title) is the
//! store's job: a violating write fails with [`DatabaseError::UniqueViolation`]
//! naming the constraint.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::memory::MemoryStore;
use crate::database::models::{
    Comment, NewComment, NewPost, NewUser, Post, PostChanges, PostFilter, PostWithAuthor, User,
    UserChanges,
};
use crate::database::postgres::{PgCommentRepository, PgPostRepository, PgUserRepository};
use crate::pagination::Pagination;

pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const USERS_NAME_KEY: &str = "users_name_key";
pub const USERS_USERNAME_KEY: &str = "users_username_key";
pub const USERS_JSON_ID_KEY: &str = "users_json_id_key";
pub const POSTS_ACTIVE_TITLE_KEY: &str = "posts_active_title_key";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, new: NewUser) -> Result<User, DatabaseError>;
    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    /// Any state, soft-deleted included.
    async fn find_by_json_id(&self, json_id: i64) -> Result<Option<User>, DatabaseError>;
    async fn list_active(&self) -> Result<Vec<User>, DatabaseError>;
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DatabaseError>;
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, new: NewPost) -> Result<Post, DatabaseError>;
    async fn find_active(&self, id: Uuid) -> Result<Option<Post>, DatabaseError>;
    async fn find_active_with_author(&self, id: Uuid)
        -> Result<Option<PostWithAuthor>, DatabaseError>;
    async fn find_active_by_json_id(&self, json_id: i64) -> Result<Option<Post>, DatabaseError>;
    async fn count_active(&self, filter: &PostFilter) -> Result<u64, DatabaseError>;
    /// Newest first.
    async fn list_active(
        &self,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<Vec<PostWithAuthor>, DatabaseError>;
    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Post, DatabaseError>;
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<Post, DatabaseError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, new: NewComment) -> Result<Comment, DatabaseError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DatabaseError>;
    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, DatabaseError>;
    /// Newest first.
    async fn list_for_post(
        &self,
        post_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<Comment>, DatabaseError>;
    async fn update_body(&self, id: Uuid, body: String) -> Result<Comment, DatabaseError>;
    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;
}

#[async_trait]
impl HealthCheck for PgPool {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(self).await
    }
}

/// The set of stores the services run against.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool.clone())),
            health: Arc::new(pool),
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            health: store,
        }
    }
}
