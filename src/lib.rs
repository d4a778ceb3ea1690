pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pagination;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenService;
use crate::config::{AppConfig, PaginationConfig, SecurityConfig};
use crate::database::repository::{HealthCheck, Repositories};
use crate::handlers::{comments, posts, system, users};
use crate::services::import::{HttpImportSource, ImportSource};
use crate::services::{CommentService, ImportService, PostService, ServiceError, UserService};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub import: Arc<ImportService>,
    pub tokens: Arc<TokenService>,
    pub health: Arc<dyn HealthCheck>,
    pub pagination: PaginationConfig,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl AppState {
    /// Wire services over `repos`, importing from the configured mock API.
    pub fn new(config: &AppConfig, repos: Repositories) -> Result<Self, ServiceError> {
        let source = Arc::new(HttpImportSource::new(&config.import)?);
        Self::with_import_source(config, repos, source)
    }

    pub fn with_import_source(
        config: &AppConfig,
        repos: Repositories,
        source: Arc<dyn ImportSource>,
    ) -> Result<Self, ServiceError> {
        let tokens = Arc::new(TokenService::from_config(&config.security)?);

        Ok(Self {
            users: Arc::new(UserService::new(repos.users.clone(), tokens.clone())),
            posts: Arc::new(PostService::new(repos.posts.clone(), repos.users.clone())),
            comments: Arc::new(CommentService::new(
                repos.comments.clone(),
                repos.posts.clone(),
                repos.users.clone(),
            )),
            import: Arc::new(ImportService::new(source, repos.clone(), &config.import)),
            tokens,
            health: repos.health,
            pagination: config.pagination.clone(),
        })
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        // Resources; protected handlers take an `AuthUser`
        .nest("/v1/user", users::routes())
        .nest("/v1/post", posts::routes())
        .nest("/v1/comment", comments::routes())
        .fallback(system::not_found)
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(security)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = AppConfig::for_tests();
        let state = AppState::new(&config, Repositories::memory()).unwrap();
        app(state, &config.security)
    }

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok_on_memory_store() {
        let (status, body) = call(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = call(get("/v2/nothing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn protected_route_without_header_is_401() {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/post/create")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title":"t"}"#))
            .unwrap();
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn malformed_id_and_body_are_400() {
        let (status, _) = call(get("/v1/post/detail/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/v1/user/register")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn empty_post_list_page() {
        let (status, body) = call(get("/v1/post/list?page=abc&pageSize=-3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 0);
        assert_eq!(body["data"]["currentPage"], 1);
        assert_eq!(body["data"]["data"], serde_json::json!([]));
    }
}
