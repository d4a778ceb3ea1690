//! In-process store used by `--memory` and the test suites.
//!
//! Mirrors the Postgres schema rules: the same named unique constraints, the
//! same foreign keys and newest-first listing. Rows are kept in insertion order
//! so "newest first" is a reverse walk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Comment, NewComment, NewPost, NewUser, Post, PostChanges, PostFilter, PostWithAuthor, User,
    UserChanges, DEFAULT_AVATAR,
};
use crate::database::repository::{
    CommentRepository, HealthCheck, PostRepository, UserRepository, POSTS_ACTIVE_TITLE_KEY,
    USERS_EMAIL_KEY, USERS_JSON_ID_KEY, USERS_NAME_KEY, USERS_USERNAME_KEY,
};
use crate::pagination::Pagination;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

impl Tables {
    fn user_unique_check(
        &self,
        skip: Option<Uuid>,
        json_id: Option<i64>,
        name: Option<&str>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<(), DatabaseError> {
        for user in self.users.iter().filter(|u| Some(u.id) != skip) {
            if json_id == Some(user.json_id) {
                return Err(DatabaseError::UniqueViolation(USERS_JSON_ID_KEY.into()));
            }
            if email == Some(user.email.as_str()) {
                return Err(DatabaseError::UniqueViolation(USERS_EMAIL_KEY.into()));
            }
            if name == Some(user.name.as_str()) {
                return Err(DatabaseError::UniqueViolation(USERS_NAME_KEY.into()));
            }
            if username == Some(user.username.as_str()) {
                return Err(DatabaseError::UniqueViolation(USERS_USERNAME_KEY.into()));
            }
        }
        Ok(())
    }

    fn title_unique_check(&self, skip: Option<Uuid>, title: &str) -> Result<(), DatabaseError> {
        let taken = self
            .posts
            .iter()
            .any(|p| p.is_active() && Some(p.id) != skip && p.title == title);
        if taken {
            return Err(DatabaseError::UniqueViolation(POSTS_ACTIVE_TITLE_KEY.into()));
        }
        Ok(())
    }

    fn with_author(&self, post: &Post) -> PostWithAuthor {
        PostWithAuthor {
            post: post.clone(),
            user: self.users.iter().find(|u| u.id == post.user_id).cloned(),
        }
    }
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn page_of<T: Clone>(rows: Vec<&T>, page: Pagination) -> Vec<T> {
    rows.into_iter()
        .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, new: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        let json_id = new.json_id.unwrap_or_else(|| {
            tables.users.iter().map(|u| u.json_id).max().unwrap_or(0) + 1
        });
        tables.user_unique_check(
            None,
            Some(json_id),
            Some(new.name.as_str()),
            Some(new.username.as_str()),
            Some(new.email.as_str()),
        )?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            json_id,
            name: new.name,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            address: new.address,
            phone: new.phone,
            website: new.website,
            company: new.company,
            image: new.image.unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.id == id && u.is_active())
            .cloned())
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email == email && u.is_active())
            .cloned())
    }

    async fn find_by_json_id(&self, json_id: i64) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.json_id == json_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<User>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.iter().filter(|u| u.is_active()).cloned().collect();
        users.sort_by_key(|u| (u.json_id, u.created_at));
        Ok(users)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.user_unique_check(
            Some(id),
            None,
            changes.name.as_deref(),
            changes.username.as_deref(),
            changes.email.as_deref(),
        )?;

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id && u.is_active())
            .ok_or_else(|| DatabaseError::NotFound(format!("user {id}")))?;
        changes.apply(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id && u.is_active())
            .ok_or_else(|| DatabaseError::NotFound(format!("user {id}")))?;
        user.deleted_at = Some(at);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn insert(&self, new: NewPost) -> Result<Post, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == new.user_id) {
            return Err(DatabaseError::ForeignKeyViolation("posts_user_id_fkey".into()));
        }
        tables.title_unique_check(None, &new.title)?;

        let json_id = new.json_id.unwrap_or_else(|| {
            tables.posts.iter().map(|p| p.json_id).max().unwrap_or(0) + 1
        });
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            json_id,
            title: new.title,
            body: new.body,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id && p.is_active())
            .cloned())
    }

    async fn find_active_with_author(
        &self,
        id: Uuid,
    ) -> Result<Option<PostWithAuthor>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id && p.is_active())
            .map(|p| tables.with_author(p)))
    }

    async fn find_active_by_json_id(&self, json_id: i64) -> Result<Option<Post>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.json_id == json_id && p.is_active())
            .cloned())
    }

    async fn count_active(&self, filter: &PostFilter) -> Result<u64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.is_active() && filter.matches(p))
            .count() as u64)
    }

    async fn list_active(
        &self,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<Vec<PostWithAuthor>, DatabaseError> {
        let tables = self.tables.read().await;
        let posts: Vec<&Post> = tables
            .posts
            .iter()
            .rev()
            .filter(|p| p.is_active() && filter.matches(p))
            .collect();
        Ok(page_of(posts, page)
            .iter()
            .map(|p| tables.with_author(p))
            .collect())
    }

    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Post, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(title) = changes.title.as_deref() {
            tables.title_unique_check(Some(id), title)?;
        }

        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.is_active())
            .ok_or_else(|| DatabaseError::NotFound(format!("post {id}")))?;
        changes.apply(post);
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<Post, DatabaseError> {
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.is_active())
            .ok_or_else(|| DatabaseError::NotFound(format!("post {id}")))?;
        post.deleted_at = Some(at);
        post.updated_at = Utc::now();
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn insert(&self, new: NewComment) -> Result<Comment, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == new.post_id) {
            return Err(DatabaseError::ForeignKeyViolation("comments_post_id_fkey".into()));
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: new.post_id,
            json_id: new.json_id,
            name: new.name,
            email: new.email,
            body: new.body,
            created_at: now,
            updated_at: now,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .count() as u64)
    }

    async fn list_for_post(
        &self,
        post_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<Comment>, DatabaseError> {
        let tables = self.tables.read().await;
        let comments: Vec<&Comment> = tables
            .comments
            .iter()
            .rev()
            .filter(|c| c.post_id == post_id)
            .collect();
        Ok(page_of(comments, page))
    }

    async fn update_body(&self, id: Uuid, body: String) -> Result<Comment, DatabaseError> {
        let mut tables = self.tables.write().await;
        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| DatabaseError::NotFound(format!("comment {id}")))?;
        comment.body = body;
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        Ok(tables.comments.len() < before)
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
