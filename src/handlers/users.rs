use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post, put},
    Json, Router,
};

use crate::api::{json_body, parse_id};
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::{
    LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest,
};
use crate::services::ImportSummary;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fetch", get(fetch))
        .route("/list", get(list))
        .route("/me", get(me))
        .route("/detail/:id", get(detail))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/update/:id", put(update))
}

/// GET /v1/user/fetch - import users from the mock API
async fn fetch(State(state): State<AppState>) -> ApiResult<ImportSummary> {
    let summary = state.import.import_users().await?;
    Ok(ApiResponse::success("Users fetched successfully", summary))
}

/// GET /v1/user/list
async fn list(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = state.users.list().await?;
    Ok(ApiResponse::success("Get all users successfully", users))
}

/// GET /v1/user/me
async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<User> {
    let user = state.users.me(&auth.user_id).await?;
    Ok(ApiResponse::success("Get current user info successfully", user))
}

/// GET /v1/user/detail/:id
async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    let user = state.users.detail(parse_id(&id)?).await?;
    Ok(ApiResponse::success("Get user info successfully", user))
}

/// POST /v1/user/register
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<User> {
    let user = state.users.register(json_body(payload)?).await?;
    Ok(ApiResponse::created("User created successfully", user))
}

/// POST /v1/user/login
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let login = state.users.login(json_body(payload)?).await?;
    Ok(ApiResponse::success("Login success", login))
}

/// PUT /v1/user/update/:id - profile fields, or `{"delete": true}`
async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<User> {
    let id = parse_id(&id)?;
    let user = state
        .users
        .update(&auth.user_id, id, json_body(payload)?)
        .await?;
    Ok(ApiResponse::success("Update user info successfully", user))
}
