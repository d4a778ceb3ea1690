use thiserror::Error;

use crate::auth::{password::PasswordError, JwtError};
use crate::database::manager::DatabaseError;
use crate::services::import::ImportError;

/// Business-rule failures plus the lower-layer errors that pass through.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Turn a violation of one of `constraints` into a `Conflict` with a
    /// caller-chosen message. Anything else passes through unchanged.
    pub fn conflict_on_unique(err: DatabaseError, constraints: &[&str], message: &str) -> Self {
        match err {
            DatabaseError::UniqueViolation(constraint)
                if constraints.contains(&constraint.as_str()) =>
            {
                tracing::debug!("unique violation on {constraint}");
                Self::conflict(message)
            }
            other => Self::Database(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_becomes_conflict() {
        let keys = ["users_email_key", "users_name_key"];
        let err = ServiceError::conflict_on_unique(
            DatabaseError::UniqueViolation("users_email_key".into()),
            &keys,
            "User already exist",
        );
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "User already exist"));

        let err =
            ServiceError::conflict_on_unique(DatabaseError::NotFound("x".into()), &keys, "dup");
        assert!(matches!(err, ServiceError::Database(DatabaseError::NotFound(_))));
    }

    #[test]
    fn other_constraints_are_not_conflicts() {
        let err = ServiceError::conflict_on_unique(
            DatabaseError::UniqueViolation("users_json_id_key".into()),
            &["users_email_key", "users_name_key", "users_username_key"],
            "User already exist",
        );
        assert!(matches!(
            err,
            ServiceError::Database(DatabaseError::UniqueViolation(ref c)) if c == "users_json_id_key"
        ));
    }
}
