use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::ownership::is_owner;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::TokenService;
use crate::database::models::{NewUser, User, UserChanges};
use crate::database::repository::{
    UserRepository, USERS_EMAIL_KEY, USERS_NAME_KEY, USERS_USERNAME_KEY,
};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::{non_empty, subject_id};

/// Constraints a caller can collide with. `jsonId` is assigned by the store.
const USER_TAKEN: &str = "User already exist";
const USER_IDENTITY_KEYS: [&str; 3] = [USERS_EMAIL_KEY, USERS_NAME_KEY, USERS_USERNAME_KEY];

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub id: Uuid,
    pub access_token: String,
}

/// Profile update, or `delete: true` to deactivate the account.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub delete: bool,
    #[serde(flatten)]
    pub changes: UserChanges,
}

/// Loose address check: one `@`, something on both sides, a dot in the domain.
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("Email invalid".to_string());
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err("Email invalid".to_string());
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Email invalid".to_string());
    }
    Ok(())
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<User> {
        let (Some(name), Some(username), Some(email), Some(password)) = (
            non_empty(request.name),
            non_empty(request.username),
            non_empty(request.email),
            request.password.filter(|p| !p.trim().is_empty()),
        ) else {
            return Err(ServiceError::bad_request(
                "Please input name, username, email and password",
            ));
        };
        validate_email_format(&email).map_err(ServiceError::BadRequest)?;

        let password_hash = hash_password_blocking(password).await?;
        let user = self
            .users
            .insert(NewUser::new(name, username, email, password_hash))
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, &USER_IDENTITY_KEYS, USER_TAKEN))?;

        info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> ServiceResult<LoginResponse> {
        let (Some(email), Some(password)) = (non_empty(request.email), request.password) else {
            return Err(ServiceError::bad_request("Please input email and password"));
        };
        if password.is_empty() {
            return Err(ServiceError::bad_request("Please input email and password"));
        }

        let Some(user) = self.users.find_active_by_email(&email).await? else {
            return Err(ServiceError::bad_request("Email invalid"));
        };

        if !verify_password_blocking(password, user.password_hash.clone()).await? {
            warn!("Failed login for user {}", user.id);
            return Err(ServiceError::bad_request("Password invalid"));
        }

        let access_token =
            self.tokens
                .issue(user.id.to_string(), user.email.clone(), user.name.clone())?;
        Ok(LoginResponse {
            id: user.id,
            access_token,
        })
    }

    pub async fn me(&self, subject: &str) -> ServiceResult<User> {
        let id = subject_id(subject).ok_or_else(|| ServiceError::not_found("Can't find user by ID"))?;
        self.detail(id).await
    }

    pub async fn list(&self) -> ServiceResult<Vec<User>> {
        Ok(self.users.list_active().await?)
    }

    pub async fn detail(&self, id: Uuid) -> ServiceResult<User> {
        self.users
            .find_active_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Can't find user by ID"))
    }

    pub async fn update(
        &self,
        subject: &str,
        id: Uuid,
        request: UpdateUserRequest,
    ) -> ServiceResult<User> {
        let user = self.detail(id).await?;
        if !is_owner(subject, &user.id) {
            return Err(ServiceError::forbidden("This isn't your account"));
        }

        if request.delete {
            let user = self.users.soft_delete(id, Utc::now()).await?;
            info!("Deactivated user {}", user.id);
            return Ok(user);
        }

        let changes = request.changes;
        if let Some(email) = changes.email.as_deref() {
            validate_email_format(email).map_err(ServiceError::BadRequest)?;
        }
        for value in [&changes.name, &changes.username] {
            if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
                return Err(ServiceError::bad_request("Name and username cannot be empty"));
            }
        }

        self.users
            .update(id, changes)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, &USER_IDENTITY_KEYS, USER_TAKEN))
    }
}
