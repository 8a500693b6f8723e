use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::Result;

pub const DEFAULT_AVATAR: &str = "default.png";

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_file: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String, // Argon2 PHC string, never plaintext
}

#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Debug, Clone)]
pub struct ProfileChanges<'a> {
    pub username: &'a str,
    pub email: &'a str,
    /// `None` keeps the current avatar.
    pub image_file: Option<&'a str>,
}

/// Persistence for [`User`]s.
///
/// `insert` and `update_profile` must reject duplicates atomically and report
/// them as `DuplicateUsername` / `DuplicateEmail`.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, new: NewUser<'_>) -> Result<User>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges<'_>) -> Result<User>;
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;
}
