use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::users::users_by_ids;
use crate::database::manager::DatabaseError;
use crate::database::models::{NewPost, Post, PostChanges, PostFilter, PostWithAuthor};
use crate::database::repository::PostRepository;
use crate::pagination::Pagination;

const POST_COLUMNS: &str = "id, user_id, json_id, title, body, deleted_at, created_at, updated_at";

// $1 is the optional title needle; NULL matches everything.
const ACTIVE_FILTER: &str = "deleted_at IS NULL \
     AND ($1::text IS NULL OR POSITION(LOWER($1) IN LOWER(title)) > 0)";

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_authors(&self, posts: Vec<Post>) -> Result<Vec<PostWithAuthor>, DatabaseError> {
        let mut ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let authors: HashMap<Uuid, _> = users_by_ids(&self.pool, &ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| {
                let user = authors.get(&post.user_id).cloned();
                PostWithAuthor { post, user }
            })
            .collect())
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert(&self, new: NewPost) -> Result<Post, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO posts (id, user_id, json_id, title, body)
            VALUES ($1, $2, COALESCE($3, (SELECT COALESCE(MAX(json_id), 0) + 1 FROM posts)), $4, $5)
            RETURNING {POST_COLUMNS}
            "#
        );

        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.json_id)
            .bind(&new.title)
            .bind(&new.body)
            .fetch_one(&self.pool)
            .await?;
        Ok(post)
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1 AND deleted_at IS NULL");
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn find_active_with_author(
        &self,
        id: Uuid,
    ) -> Result<Option<PostWithAuthor>, DatabaseError> {
        let Some(post) = self.find_active(id).await? else {
            return Ok(None);
        };
        Ok(self.with_authors(vec![post]).await?.into_iter().next())
    }

    async fn find_active_by_json_id(&self, json_id: i64) -> Result<Option<Post>, DatabaseError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE json_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at LIMIT 1"
        );
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(json_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn count_active(&self, filter: &PostFilter) -> Result<u64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM posts WHERE {ACTIVE_FILTER}");
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(filter.title.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn list_active(
        &self,
        filter: &PostFilter,
        page: Pagination,
    ) -> Result<Vec<PostWithAuthor>, DatabaseError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE {ACTIVE_FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(filter.title.as_deref())
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;

        self.with_authors(posts).await
    }

    async fn update(&self, id: Uuid, changes: PostChanges) -> Result<Post, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {POST_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.body)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("post {id}")))
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<Post, DatabaseError> {
        let sql = format!(
            "UPDATE posts SET deleted_at = $2, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("post {id}")))
    }
}
