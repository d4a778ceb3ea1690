use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::ownership::is_comment_author;
use crate::database::manager::DatabaseError;
use crate::database::models::{Comment, NewComment, User};
use crate::database::repository::{CommentRepository, PostRepository, UserRepository};
use crate::pagination::{Page, Pagination};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::{non_empty, subject_id};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Option<Uuid>,
    pub body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommentRequest {
    pub body: Option<String>,
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
        }
    }

    /// The caller must still exist as an active user.
    async fn caller(&self, subject: &str) -> ServiceResult<User> {
        let user = match subject_id(subject) {
            Some(id) => self.users.find_active_by_id(id).await?,
            None => None,
        };
        user.ok_or_else(|| ServiceError::unauthorized("Unauthorized"))
    }

    /// Load a comment and check the caller wrote it.
    async fn owned(&self, subject: &str, id: Uuid, action: &str) -> ServiceResult<Comment> {
        let user = self.caller(subject).await?;
        let comment = self.detail(id).await?;
        if !is_comment_author(&user.email, &comment.email) {
            return Err(ServiceError::forbidden(format!(
                "Forbidden {action} other user's comments"
            )));
        }
        Ok(comment)
    }

    pub async fn create(
        &self,
        subject: &str,
        request: CreateCommentRequest,
    ) -> ServiceResult<Comment> {
        let user = self.caller(subject).await?;

        let post_id = request
            .post_id
            .ok_or_else(|| ServiceError::bad_request("Please input postId"))?;
        let body =
            non_empty(request.body).ok_or_else(|| ServiceError::bad_request("Please input body"))?;

        if self.posts.find_active(post_id).await?.is_none() {
            return Err(ServiceError::not_found("Can't find post by ID"));
        }

        let comment = self
            .comments
            .insert(NewComment {
                post_id,
                json_id: None,
                name: user.name,
                email: user.email,
                body,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::ForeignKeyViolation(_) => {
                    ServiceError::not_found("Can't find post by ID")
                }
                other => other.into(),
            })?;

        info!("User {} commented on post {}", user.id, post_id);
        Ok(comment)
    }

    pub async fn list_for_post(
        &self,
        post_id: Uuid,
        pagination: Pagination,
    ) -> ServiceResult<Page<Comment>> {
        let total = self.comments.count_for_post(post_id).await?;
        let comments = self.comments.list_for_post(post_id, pagination).await?;
        Ok(Page::new(total, pagination, comments))
    }

    pub async fn detail(&self, id: Uuid) -> ServiceResult<Comment> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Comment not found"))
    }

    /// Only the body can change. A missing body leaves the comment as is.
    pub async fn update(
        &self,
        subject: &str,
        id: Uuid,
        request: UpdateCommentRequest,
    ) -> ServiceResult<Comment> {
        let comment = self.owned(subject, id, "update").await?;
        match request.body {
            Some(body) if body.trim().is_empty() => {
                Err(ServiceError::bad_request("Body cannot be empty"))
            }
            Some(body) => Ok(self.comments.update_body(id, body).await?),
            None => Ok(comment),
        }
    }

    /// Hard delete. Returns the removed comment.
    pub async fn delete(&self, subject: &str, id: Uuid) -> ServiceResult<Comment> {
        let comment = self.owned(subject, id, "delete").await?;
        if !self.comments.delete(id).await? {
            return Err(ServiceError::not_found("Comment not found"));
        }
        info!("Comment {} deleted", id);
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewPost, NewUser, UserChanges};
    use crate::database::repository::Repositories;
    use crate::pagination::calc_pagination;

    struct Fixture {
        service: CommentService,
        repos: Repositories,
        alice: User,
        bob: User,
        post_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::memory();
        let alice = repos
            .users
            .insert(NewUser::new("Alice".into(), "alice".into(), "a@x.io".into(), "h".into()))
            .await
            .unwrap();
        let bob = repos
            .users
            .insert(NewUser::new("Bob".into(), "bob".into(), "b@x.io".into(), "h".into()))
            .await
            .unwrap();
        let post = repos
            .posts
            .insert(NewPost {
                user_id: alice.id,
                json_id: None,
                title: "Post".into(),
                body: String::new(),
            })
            .await
            .unwrap();
        let service = CommentService::new(
            repos.comments.clone(),
            repos.posts.clone(),
            repos.users.clone(),
        );
        Fixture {
            service,
            repos,
            alice,
            bob,
            post_id: post.id,
        }
    }

    fn comment_on(post_id: Uuid, body: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            post_id: Some(post_id),
            body: Some(body.into()),
        }
    }

    fn body(text: &str) -> UpdateCommentRequest {
        UpdateCommentRequest {
            body: Some(text.into()),
        }
    }

    #[tokio::test]
    async fn create_snapshots_author() {
        let f = fixture().await;
        let comment = f
            .service
            .create(&f.bob.id.to_string(), comment_on(f.post_id, "hi"))
            .await
            .unwrap();
        assert_eq!(comment.name, "Bob");
        assert_eq!(comment.email, "b@x.io");
        assert_eq!(comment.post_id, f.post_id);
    }

    #[tokio::test]
    async fn create_rejects_unknown_caller_and_post() {
        let f = fixture().await;
        assert!(matches!(
            f.service
                .create(&Uuid::new_v4().to_string(), comment_on(f.post_id, "hi"))
                .await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service
                .create(&f.bob.id.to_string(), comment_on(Uuid::new_v4(), "hi"))
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_the_snapshot_email_may_edit() {
        let f = fixture().await;
        let bob = f.bob.id.to_string();
        let comment = f
            .service
            .create(&bob, comment_on(f.post_id, "hi"))
            .await
            .unwrap();

        assert!(matches!(
            f.service
                .update(&f.alice.id.to_string(), comment.id, body("mine now"))
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        let updated = f.service.update(&bob, comment.id, body("edited")).await.unwrap();
        assert_eq!(updated.body, "edited");

        // After an email change the old snapshot no longer matches.
        f.repos
            .users
            .update(
                f.bob.id,
                UserChanges {
                    email: Some("bob@new.io".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            f.service.update(&bob, comment.id, body("again")).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.delete(&bob, comment.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn delete_is_hard_and_missing_is_not_found() {
        let f = fixture().await;
        let bob = f.bob.id.to_string();
        let comment = f
            .service
            .create(&bob, comment_on(f.post_id, "bye"))
            .await
            .unwrap();

        let deleted = f.service.delete(&bob, comment.id).await.unwrap();
        assert_eq!(deleted.id, comment.id);
        assert!(matches!(
            f.service.detail(comment.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(&bob, comment.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let f = fixture().await;
        let bob = f.bob.id.to_string();
        for text in ["one", "two", "three"] {
            f.service
                .create(&bob, comment_on(f.post_id, text))
                .await
                .unwrap();
        }

        let page = f
            .service
            .list_for_post(f.post_id, calc_pagination(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let bodies: Vec<_> = page.data.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, ["three", "two"]);
    }
}
