//! Request-side helpers shared by the handlers.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use uuid::Uuid;

use crate::error::ApiError;

/// Parse a path or body id. Anything that is not a UUID is a 400.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid id: {raw}")))
}

/// Unwrap a JSON body, turning malformed or mistyped input into a 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(body) = payload?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_uuids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("42"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_id(""), Err(ApiError::BadRequest(_))));
    }
}
