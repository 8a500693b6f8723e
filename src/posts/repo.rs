use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::Result;
use crate::pagination::Page;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_posted: OffsetDateTime,
    pub user_id: i64,
}

/// A post joined with the author columns the views need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PostWithAuthor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub author_image_file: String,
}

/// Persistence for [`Post`]s. Listings are newest first.
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn insert(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        date_posted: OffsetDateTime,
    ) -> Result<Post>;
    async fn find(&self, id: i64) -> Result<Option<PostWithAuthor>>;
    async fn update(&self, id: i64, title: &str, content: &str) -> Result<Post>;
    async fn delete(&self, id: i64) -> Result<()>;
    /// `author` restricts the listing to one user's posts.
    async fn list_page(
        &self,
        author: Option<i64>,
        page: i64,
        per_page: i64,
    ) -> Result<Page<PostWithAuthor>>;
    async fn count_by_author(&self, user_id: i64) -> Result<i64>;
}
