use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_AVATAR: &str =
    "https://bloganchoi.com/wp-content/uploads/2022/02/avatar-trang-y-nghia.jpeg";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geo {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: Option<String>,
    pub suite: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
    pub geo: Geo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub name: Option<String>,
    pub catch_phrase: Option<String>,
    pub bs: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub json_id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub address: Address,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub company: Company,
    pub image: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Insert payload. `json_id: None` lets the store assign the next free value.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub json_id: Option<i64>,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub address: Address,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub company: Company,
    pub image: Option<String>,
}

impl NewUser {
    pub fn new(name: String, username: String, email: String, password_hash: String) -> Self {
        Self {
            json_id: None,
            name,
            username,
            email,
            password_hash,
            address: Address::default(),
            phone: None,
            website: None,
            company: Company::default(),
            image: None,
        }
    }
}

/// Fields a user may change on their own account. `None` leaves the value alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub image: Option<String>,
    pub address: Option<Address>,
    pub company: Option<Company>,
}

impl UserChanges {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(website) = self.website {
            user.website = Some(website);
        }
        if let Some(image) = self.image {
            user.image = image;
        }
        if let Some(address) = self.address {
            user.address = address;
        }
        if let Some(company) = self.company {
            user.company = company;
        }
    }
}
