use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Address, Company, NewUser, User, UserChanges, DEFAULT_AVATAR};
use crate::database::repository::{UserRepository, USERS_JSON_ID_KEY};

const LOCAL_JSON_ID_ATTEMPTS: u32 = 5;

pub(crate) const USER_COLUMNS: &str = "id, json_id, name, username, email, password_hash, \
     address, phone, website, company, image, deleted_at, created_at, updated_at";

pub(crate) fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let Json(address): Json<Address> = row.try_get("address")?;
    let Json(company): Json<Company> = row.try_get("company")?;

    Ok(User {
        id: row.try_get("id")?,
        json_id: row.try_get("json_id")?,
        name: row.try_get("name")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        address,
        phone: row.try_get("phone")?,
        website: row.try_get("website")?,
        company,
        image: row.try_get("image")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Load users by id regardless of state (for populating post owners).
pub(crate) async fn users_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<User>, DatabaseError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
    let rows = sqlx::query(&sql).bind(ids).fetch_all(pool).await?;
    Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_row(&self, new: &NewUser) -> Result<User, DatabaseError> {
        // Locally registered users take the next external id after the highest one seen.
        let sql = format!(
            r#"
            INSERT INTO users
                (id, json_id, name, username, email, password_hash,
                 address, phone, website, company, image)
            VALUES
                ($1, COALESCE($2, (SELECT COALESCE(MAX(json_id), 0) + 1 FROM users)),
                 $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(new.json_id)
            .bind(&new.name)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(Json(&new.address))
            .bind(&new.phone)
            .bind(&new.website)
            .bind(Json(&new.company))
            .bind(new.image.as_deref().unwrap_or(DEFAULT_AVATAR))
            .fetch_one(&self.pool)
            .await?;

        Ok(user_from_row(&row)?)
    }
}

fn optional_user(row: Option<PgRow>) -> Result<Option<User>, DatabaseError> {
    Ok(row.as_ref().map(user_from_row).transpose()?)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, new: NewUser) -> Result<User, DatabaseError> {
        let mut attempt = 1;
        loop {
            match self.insert_row(&new).await {
                // Two concurrent registrations can compute the same next jsonId.
                Err(DatabaseError::UniqueViolation(constraint))
                    if new.json_id.is_none()
                        && constraint == USERS_JSON_ID_KEY
                        && attempt < LOCAL_JSON_ID_ATTEMPTS =>
                {
                    debug!("jsonId collision on local insert, attempt {attempt}");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        optional_user(row)
    }

    async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql).bind(email).fetch_optional(&self.pool).await?;
        optional_user(row)
    }

    async fn find_by_json_id(&self, json_id: i64) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE json_id = $1");
        let row = sqlx::query(&sql).bind(json_id).fetch_optional(&self.pool).await?;
        optional_user(row)
    }

    async fn list_active(&self) -> Result<Vec<User>, DatabaseError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY json_id, created_at"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                website = COALESCE($6, website),
                image = COALESCE($7, image),
                address = COALESCE($8, address),
                company = COALESCE($9, company),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.phone)
            .bind(changes.website)
            .bind(changes.image)
            .bind(changes.address.map(Json))
            .bind(changes.company.map(Json))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {id}")))?;

        Ok(user_from_row(&row)?)
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<User, DatabaseError> {
        let sql = format!(
            "UPDATE users SET deleted_at = $2, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {id}")))?;

        Ok(user_from_row(&row)?)
    }
}
