use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::auth::{AuthError, TokenService};
use crate::error::ApiError;

/// Authenticated caller, extracted from `Authorization: Bearer <token>`.
///
/// Handlers that take an `AuthUser` are protected: a request without the
/// header is rejected with 401, a bad or expired token with 403, before the
/// handler body runs.
#[derive(Clone, Debug)]
pub struct AuthUser {
    /// Token subject, the user id as issued at login.
    pub user_id: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);

        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| {
                ApiError::from(AuthError::Invalid(
                    "Invalid Authorization header format".to_string(),
                ))
            })?),
            None => None,
        };

        let user_id = tokens.verify_header(header).map_err(|err| {
            warn!("Rejected request to {}: {}", parts.uri.path(), err);
            ApiError::from(err)
        })?;

        Ok(AuthUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use chrono::Utc;
    use tower::ServiceExt;

    async fn whoami(user: AuthUser) -> String {
        user.user_id
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new("middleware-test", 24).unwrap())
    }

    fn app(tokens: Arc<TokenService>) -> Router {
        Router::new().route("/me", get(whoami)).with_state(tokens)
    }

    async fn status_for(tokens: Arc<TokenService>, header: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri("/me");
        if let Some(value) = header {
            request = request.header(AUTHORIZATION, value);
        }
        app(tokens)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        assert_eq!(status_for(tokens(), None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_tokens_are_forbidden() {
        let other = TokenService::new("someone-else", 24).unwrap();
        let foreign = other
            .issue("u".into(), "e@x.io".into(), "n".into())
            .unwrap();

        let now = Utc::now().timestamp();
        let expired = tokens()
            .sign(&Claims {
                sub: "user-42".into(),
                email: "e@x.io".into(),
                name: "n".into(),
                iat: now - 7200,
                exp: now - 60,
            })
            .unwrap();

        for header in [
            "Bearer".to_string(),
            "Bearer not.a.jwt".to_string(),
            format!("Token {foreign}"),
            format!("Bearer {foreign}"),
            format!("Bearer {expired}"),
        ] {
            assert_eq!(
                status_for(tokens(), Some(&header)).await,
                StatusCode::FORBIDDEN,
                "{header}"
            );
        }
    }

    #[tokio::test]
    async fn valid_token_reaches_the_handler() {
        let tokens = tokens();
        let token = tokens
            .issue("user-42".into(), "e@x.io".into(), "n".into())
            .unwrap();
        let response = app(tokens)
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header(AUTHORIZATION, format!("bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"user-42");
    }
}
