//! Bulk import from a JSONPlaceholder-shaped source.
//!
//! Each record is written on its own, `concurrency` at a time. A record whose
//! parent cannot be resolved is skipped and a record whose write fails is
//! counted as failed; neither stops the batch. Only failing to fetch the
//! listing itself is an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::auth::password::hash_password_blocking;
use crate::config::ImportConfig;
use crate::database::models::{Address, Company, NewComment, NewPost, NewUser};
use crate::database::repository::Repositories;
use crate::services::error::ServiceResult;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid import source URL: {0}")]
    InvalidUrl(String),
    #[error("Import source request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUser {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub address: Address,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub company: Company,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPost {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalComment {
    pub id: i64,
    pub post_id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub body: String,
}

/// Where imported records come from.
#[async_trait]
pub trait ImportSource: Send + Sync {
    async fn users(&self) -> Result<Vec<ExternalUser>, ImportError>;
    async fn posts(&self) -> Result<Vec<ExternalPost>, ImportError>;
    async fn comments(&self) -> Result<Vec<ExternalComment>, ImportError>;
}

pub struct HttpImportSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpImportSource {
    pub fn new(config: &ImportConfig) -> Result<Self, ImportError> {
        // A trailing slash keeps any base path when joining resource names.
        let mut raw = config.mock_api_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|e| ImportError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, base })
    }

    fn endpoint(&self, resource: &str) -> Result<Url, ImportError> {
        self.base
            .join(resource)
            .map_err(|e| ImportError::InvalidUrl(e.to_string()))
    }

    async fn fetch<T: DeserializeOwned>(&self, resource: &str) -> Result<Vec<T>, ImportError> {
        let url = self.endpoint(resource)?;
        info!("Fetching {}", url);
        let records = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<T>>()
            .await?;
        Ok(records)
    }
}

#[async_trait]
impl ImportSource for HttpImportSource {
    async fn users(&self) -> Result<Vec<ExternalUser>, ImportError> {
        self.fetch("users").await
    }

    async fn posts(&self) -> Result<Vec<ExternalPost>, ImportError> {
        self.fetch("posts").await
    }

    async fn comments(&self) -> Result<Vec<ExternalComment>, ImportError> {
        self.fetch("comments").await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub fetched: usize,
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Imported,
    Skipped,
    Failed,
}

impl ImportSummary {
    fn tally(fetched: usize, outcomes: &[Outcome]) -> Self {
        let count = |wanted: Outcome| outcomes.iter().filter(|o| **o == wanted).count();
        Self {
            fetched,
            imported: count(Outcome::Imported),
            skipped: count(Outcome::Skipped),
            failed: count(Outcome::Failed),
        }
    }
}

pub struct ImportService {
    source: Arc<dyn ImportSource>,
    repos: Repositories,
    default_password: String,
    concurrency: usize,
}

impl ImportService {
    pub fn new(source: Arc<dyn ImportSource>, repos: Repositories, config: &ImportConfig) -> Self {
        Self {
            source,
            repos,
            default_password: config.default_password.clone(),
            concurrency: config.concurrency.max(1),
        }
    }

    pub async fn import_users(&self) -> ServiceResult<ImportSummary> {
        let records = self.source.users().await?;
        let fetched = records.len();
        let password_hash = hash_password_blocking(self.default_password.clone()).await?;
        let password_hash = password_hash.as_str();
        let users = &self.repos.users;

        let outcomes: Vec<Outcome> = stream::iter(records.into_iter().map(|record| async move {
            let external_id = record.id;
            let new_user = NewUser {
                json_id: Some(record.id),
                name: record.name,
                username: record.username,
                email: record.email,
                password_hash: password_hash.to_string(),
                address: record.address,
                phone: record.phone,
                website: record.website,
                company: record.company,
                image: None,
            };
            match users.insert(new_user).await {
                Ok(_) => Outcome::Imported,
                Err(e) => {
                    warn!("Failed to import user {}: {}", external_id, e);
                    Outcome::Failed
                }
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let summary = ImportSummary::tally(fetched, &outcomes);
        info!("User import finished: {:?}", summary);
        Ok(summary)
    }

    pub async fn import_posts(&self) -> ServiceResult<ImportSummary> {
        let records = self.source.posts().await?;
        let fetched = records.len();
        let users = &self.repos.users;
        let posts = &self.repos.posts;

        let outcomes: Vec<Outcome> = stream::iter(records.into_iter().map(|record| async move {
            let owner = match users.find_by_json_id(record.user_id).await {
                Ok(Some(owner)) => owner,
                Ok(None) => {
                    warn!("Skipping post {}: no user with id {}", record.id, record.user_id);
                    return Outcome::Skipped;
                }
                Err(e) => {
                    warn!("Failed to resolve owner of post {}: {}", record.id, e);
                    return Outcome::Failed;
                }
            };
            let external_id = record.id;
            let new_post = NewPost {
                user_id: owner.id,
                json_id: Some(record.id),
                title: record.title,
                body: record.body,
            };
            match posts.insert(new_post).await {
                Ok(_) => Outcome::Imported,
                Err(e) => {
                    warn!("Failed to import post {}: {}", external_id, e);
                    Outcome::Failed
                }
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let summary = ImportSummary::tally(fetched, &outcomes);
        info!("Post import finished: {:?}", summary);
        Ok(summary)
    }

    pub async fn import_comments(&self) -> ServiceResult<ImportSummary> {
        let records = self.source.comments().await?;
        let fetched = records.len();
        let posts = &self.repos.posts;
        let comments = &self.repos.comments;

        let outcomes: Vec<Outcome> = stream::iter(records.into_iter().map(|record| async move {
            let post = match posts.find_active_by_json_id(record.post_id).await {
                Ok(Some(post)) => post,
                Ok(None) => {
                    warn!("Skipping comment {}: no post with id {}", record.id, record.post_id);
                    return Outcome::Skipped;
                }
                Err(e) => {
                    warn!("Failed to resolve post of comment {}: {}", record.id, e);
                    return Outcome::Failed;
                }
            };
            let external_id = record.id;
            let new_comment = NewComment {
                post_id: post.id,
                json_id: Some(record.id),
                name: record.name,
                email: record.email,
                body: record.body,
            };
            match comments.insert(new_comment).await {
                Ok(_) => Outcome::Imported,
                Err(e) => {
                    warn!("Failed to import comment {}: {}", external_id, e);
                    Outcome::Failed
                }
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let summary = ImportSummary::tally(fetched, &outcomes);
        info!("Comment import finished: {:?}", summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::config::AppConfig;
    use crate::database::models::PostFilter;
    use crate::pagination::calc_pagination;
    use crate::services::ServiceError;

    struct StaticSource {
        users: Vec<ExternalUser>,
        posts: Vec<ExternalPost>,
        comments: Vec<ExternalComment>,
    }

    #[async_trait]
    impl ImportSource for StaticSource {
        async fn users(&self) -> Result<Vec<ExternalUser>, ImportError> {
            Ok(self.users.clone())
        }
        async fn posts(&self) -> Result<Vec<ExternalPost>, ImportError> {
            Ok(self.posts.clone())
        }
        async fn comments(&self) -> Result<Vec<ExternalComment>, ImportError> {
            Ok(self.comments.clone())
        }
    }

    fn external_user(id: i64) -> ExternalUser {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("User {id}"),
            "username": format!("user{id}"),
            "email": format!("user{id}@example.com"),
            "address": {
                "street": "Kulas Light",
                "suite": "Apt. 556",
                "city": "Gwenborough",
                "zipcode": "92998-3874",
                "geo": { "lat": "-37.3159", "lng": "81.1496" }
            },
            "phone": "1-770-736-8031 x56442",
            "website": "hildegard.org",
            "company": { "name": "Romaguera-Crona", "catchPhrase": "Multi-layered", "bs": "e-markets" }
        }))
        .unwrap()
    }

    fn source() -> StaticSource {
        StaticSource {
            users: vec![external_user(1), external_user(2)],
            posts: vec![
                ExternalPost { id: 1, user_id: 1, title: "first".into(), body: "b".into() },
                ExternalPost { id: 2, user_id: 2, title: "second".into(), body: "b".into() },
                ExternalPost { id: 3, user_id: 99, title: "orphan".into(), body: "b".into() },
            ],
            comments: vec![
                ExternalComment { id: 1, post_id: 1, name: "c".into(), email: "c@x.io".into(), body: "x".into() },
                ExternalComment { id: 2, post_id: 42, name: "c".into(), email: "c@x.io".into(), body: "x".into() },
            ],
        }
    }

    fn service(repos: Repositories) -> ImportService {
        ImportService::new(Arc::new(source()), repos, &AppConfig::for_tests().import)
    }

    #[tokio::test]
    async fn imports_users_with_profile_and_default_password() {
        let repos = Repositories::memory();
        let summary = service(repos.clone()).import_users().await.unwrap();
        assert_eq!(
            summary,
            ImportSummary { fetched: 2, imported: 2, skipped: 0, failed: 0 }
        );

        let user = repos.users.find_by_json_id(1).await.unwrap().unwrap();
        assert_eq!(user.address.city.as_deref(), Some("Gwenborough"));
        assert_eq!(user.address.geo.lat.as_deref(), Some("-37.3159"));
        assert_eq!(user.company.catch_phrase.as_deref(), Some("Multi-layered"));
        assert!(verify_password("123", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn reimport_counts_failures_without_aborting() {
        let repos = Repositories::memory();
        let service = service(repos);
        service.import_users().await.unwrap();
        let again = service.import_users().await.unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.failed, 2);
    }

    #[tokio::test]
    async fn posts_and_comments_resolve_parents_by_external_id() {
        let repos = Repositories::memory();
        let service = service(repos.clone());
        service.import_users().await.unwrap();

        let posts = service.import_posts().await.unwrap();
        assert_eq!(posts, ImportSummary { fetched: 3, imported: 2, skipped: 1, failed: 0 });

        let comments = service.import_comments().await.unwrap();
        assert_eq!(comments, ImportSummary { fetched: 2, imported: 1, skipped: 1, failed: 0 });

        let post = repos.posts.find_active_by_json_id(1).await.unwrap().unwrap();
        let owner = repos.users.find_by_json_id(1).await.unwrap().unwrap();
        assert_eq!(post.user_id, owner.id);
        assert_eq!(repos.comments.count_for_post(post.id).await.unwrap(), 1);
        assert_eq!(
            repos
                .posts
                .list_active(&PostFilter::default(), calc_pagination(1, 10))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn joins_resources_under_base_path() {
        let mut config = AppConfig::for_tests().import;
        config.mock_api_url = "http://mock.local/api".into();
        let source = HttpImportSource::new(&config).unwrap();
        assert_eq!(source.endpoint("users").unwrap().as_str(), "http://mock.local/api/users");

        config.mock_api_url = "not a url".into();
        assert!(matches!(HttpImportSource::new(&config), Err(ImportError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn unreachable_source_is_an_import_error() {
        let config = AppConfig::for_tests().import;
        let service = ImportService::new(
            Arc::new(HttpImportSource::new(&config).unwrap()),
            Repositories::memory(),
            &config,
        );
        assert!(matches!(
            service.import_users().await,
            Err(ServiceError::Import(_))
        ));
    }
}
