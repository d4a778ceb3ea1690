use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::{json_body, parse_id};
use crate::database::models::{Post, PostFilter, PostWithAuthor};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::pagination::{Page, PageQuery};
use crate::services::post_service::{CreatePostRequest, UpdatePostRequest};
use crate::services::ImportSummary;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fetch", get(fetch))
        .route("/list", get(list))
        .route("/detail/:id", get(detail))
        .route("/create", post(create))
        .route("/update/:id", put(update))
}

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
    pub title: Option<String>,
}

impl PostListQuery {
    fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page.clone(),
            page_size: self.page_size.clone(),
        }
    }
}

/// GET /v1/post/fetch - import posts; owners must already be imported
async fn fetch(State(state): State<AppState>) -> ApiResult<ImportSummary> {
    let summary = state.import.import_posts().await?;
    Ok(ApiResponse::success("Posts fetched successfully", summary))
}

/// GET /v1/post/list?page=&pageSize=&title=
async fn list(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> ApiResult<Page<PostWithAuthor>> {
    let pagination = query.page_query().resolve(&state.pagination);
    let filter = PostFilter {
        title: query.title.filter(|t| !t.is_empty()),
    };
    let page = state.posts.list(filter, pagination).await?;
    Ok(ApiResponse::success("Get Posts successfully", page))
}

/// GET /v1/post/detail/:id
async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PostWithAuthor> {
    let post = state.posts.detail(parse_id(&id)?).await?;
    Ok(ApiResponse::success("Get post by ID successfully", post))
}

/// POST /v1/post/create
async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ApiResult<Post> {
    let post = state.posts.create(&auth.user_id, json_body(payload)?).await?;
    Ok(ApiResponse::created("Post created successfully", post))
}

/// PUT /v1/post/update/:id - title/body, or `{"delete": true}`
async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> ApiResult<Post> {
    let id = parse_id(&id)?;
    let post = state
        .posts
        .update(&auth.user_id, id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::success("Post updated successfully", post))
}
