use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Comment, NewComment};
use crate::database::repository::CommentRepository;
use crate::pagination::Pagination;

const COMMENT_COLUMNS: &str = "id, post_id, json_id, name, email, body, created_at, updated_at";

pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn insert(&self, new: NewComment) -> Result<Comment, DatabaseError> {
        let sql = format!(
            "INSERT INTO comments (id, post_id, json_id, name, email, body) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COMMENT_COLUMNS}"
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.post_id)
            .bind(new.json_id)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.body)
            .fetch_one(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, DatabaseError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn list_for_post(
        &self,
        post_id: Uuid,
        page: Pagination,
    ) -> Result<Vec<Comment>, DatabaseError> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn update_body(&self, id: Uuid, body: String) -> Result<Comment, DatabaseError> {
        let sql = format!(
            "UPDATE comments SET body = $2, updated_at = now() \
             WHERE id = $1 RETURNING {COMMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(body)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("comment {id}")))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
