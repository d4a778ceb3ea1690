use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};

use crate::api::{json_body, parse_id};
use crate::database::models::Comment;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::pagination::{Page, PageQuery};
use crate::services::comment_service::{CreateCommentRequest, UpdateCommentRequest};
use crate::services::ImportSummary;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fetch", get(fetch))
        .route("/list-post/:post_id", get(list_for_post))
        .route("/detail/:id", get(detail))
        .route("/create", post(create))
        .route("/update/:id", put(update))
        .route("/delete/:id", delete(remove))
}

/// GET /v1/comment/fetch - import comments; posts must already be imported
async fn fetch(State(state): State<AppState>) -> ApiResult<ImportSummary> {
    let summary = state.import.import_comments().await?;
    Ok(ApiResponse::success("Comments fetched successfully", summary))
}

/// GET /v1/comment/list-post/:post_id?page=&pageSize=
async fn list_for_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Page<Comment>> {
    let post_id = parse_id(&post_id)?;
    let page = state
        .comments
        .list_for_post(post_id, query.resolve(&state.pagination))
        .await?;
    Ok(ApiResponse::success("Get all comments in post successfully", page))
}

/// GET /v1/comment/detail/:id
async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Comment> {
    let comment = state.comments.detail(parse_id(&id)?).await?;
    Ok(ApiResponse::success("Get comment by ID successfully", comment))
}

/// POST /v1/comment/create
async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<Comment> {
    let comment = state
        .comments
        .create(&auth.user_id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::created("Comment created successfully", comment))
}

/// PUT /v1/comment/update/:id
async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCommentRequest>, JsonRejection>,
) -> ApiResult<Comment> {
    let id = parse_id(&id)?;
    let comment = state
        .comments
        .update(&auth.user_id, id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::success("Comment updated successfully", comment))
}

/// DELETE /v1/comment/delete/:id
async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Comment> {
    let comment = state.comments.delete(&auth.user_id, parse_id(&id)?).await?;
    Ok(ApiResponse::success("Comment deleted successfully", comment))
}
