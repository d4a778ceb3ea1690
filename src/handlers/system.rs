use axum::{extract::State, http::Uri};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

/// GET / - service banner and endpoint index
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(
        "Welcome to the blog API",
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health",
                "user": "/v1/user",
                "post": "/v1/post",
                "comment": "/v1/comment"
            }
        }),
    ))
}

/// GET /health - 200 when the store answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    state.health.ping().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;
    Ok(ApiResponse::success(
        "OK",
        json!({ "status": "ok", "database": "ok" }),
    ))
}

/// JSON 404 for anything the router does not know.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}
