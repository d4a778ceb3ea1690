use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::ownership::is_owner;
use crate::database::manager::DatabaseError;
use crate::database::models::{NewPost, Post, PostChanges, PostFilter, PostWithAuthor};
use crate::database::repository::{PostRepository, UserRepository, POSTS_ACTIVE_TITLE_KEY};
use crate::pagination::{Page, Pagination};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::{non_empty, subject_id};

const TITLE_TAKEN: &str = "This title already exist";

fn title_conflict(err: DatabaseError) -> ServiceError {
    ServiceError::conflict_on_unique(err, &[POSTS_ACTIVE_TITLE_KEY], TITLE_TAKEN)
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub delete: bool,
    #[serde(flatten)]
    pub changes: PostChanges,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { posts, users }
    }

    pub async fn create(&self, subject: &str, request: CreatePostRequest) -> ServiceResult<Post> {
        let title =
            non_empty(request.title).ok_or_else(|| ServiceError::bad_request("Please input title"))?;

        let author = match subject_id(subject) {
            Some(id) => self.users.find_active_by_id(id).await?,
            None => None,
        };
        let author = author.ok_or_else(|| ServiceError::not_found("Can't find user by ID"))?;

        let post = self
            .posts
            .insert(NewPost {
                user_id: author.id,
                json_id: None,
                title,
                body: request.body.unwrap_or_default(),
            })
            .await
            .map_err(title_conflict)?;

        info!("User {} created post {}", author.id, post.id);
        Ok(post)
    }

    pub async fn list(
        &self,
        filter: PostFilter,
        pagination: Pagination,
    ) -> ServiceResult<Page<PostWithAuthor>> {
        let total = self.posts.count_active(&filter).await?;
        let posts = self.posts.list_active(&filter, pagination).await?;
        Ok(Page::new(total, pagination, posts))
    }

    pub async fn detail(&self, id: Uuid) -> ServiceResult<PostWithAuthor> {
        self.posts
            .find_active_with_author(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Can't find post by ID"))
    }

    /// Owner-only. `delete: true` soft-deletes and ignores the other fields.
    pub async fn update(
        &self,
        subject: &str,
        id: Uuid,
        request: UpdatePostRequest,
    ) -> ServiceResult<Post> {
        let post = self
            .posts
            .find_active(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Can't find post by ID"))?;

        if !is_owner(subject, &post.user_id) {
            return Err(ServiceError::forbidden("This post isn't yours"));
        }

        if request.delete {
            let post = self.posts.soft_delete(id, Utc::now()).await?;
            info!("Post {} soft-deleted", post.id);
            return Ok(post);
        }

        let mut changes = request.changes;
        if let Some(title) = changes.title.take() {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ServiceError::bad_request("Title cannot be empty"));
            }
            changes.title = Some(title);
        }

        self.posts
            .update(id, changes)
            .await
            .map_err(title_conflict)
    }
}
