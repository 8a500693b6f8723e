use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;

use crate::error::{BlogError, Result};
use crate::pagination::Page;
use crate::posts::repo::{Post, PostRepo, PostWithAuthor};
use crate::users::repo::{NewUser, ProfileChanges, User, UserRepo};

const USER_COLUMNS: &str = "id, username, email, image_file, password";

const POST_WITH_AUTHOR: &str = r#"
    SELECT p.id, p.title, p.content, p.date_posted, p.user_id,
           u.username AS author_username, u.image_file AS author_image_file
      FROM posts p
      JOIN users u ON u.id = p.user_id
"#;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")
    }
}

/// Unique-constraint losers become the matching duplicate error.
fn map_unique(e: sqlx::Error) -> BlogError {
    if let sqlx::Error::Database(db) = &e {
        match db.constraint() {
            Some("users_username_key") => return BlogError::DuplicateUsername,
            Some("users_email_key") => return BlogError::DuplicateEmail,
            _ => {}
        }
    }
    BlogError::Database(e)
}

#[async_trait]
impl UserRepo for PgStore {
    async fn insert(&self, new: NewUser<'_>) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new.username)
            .bind(new.email)
            .bind(new.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges<'_>) -> Result<User> {
        let sql = format!(
            r#"
            UPDATE users
               SET username = $2, email = $3, image_file = COALESCE($4, image_file)
             WHERE id = $1
         RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.image_file)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique)?
            .ok_or(BlogError::NotFound)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let done = sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(BlogError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepo for PgStore {
    async fn insert(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        date_posted: OffsetDateTime,
    ) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, content, date_posted, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, content, date_posted, user_id
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(date_posted)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn find(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        let sql = format!("{} WHERE p.id = $1", POST_WITH_AUTHOR);
        let post = sqlx::query_as::<_, PostWithAuthor>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update(&self, id: i64, title: &str, content: &str) -> Result<Post> {
        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET title = $2, content = $3
             WHERE id = $1
         RETURNING id, title, content, date_posted, user_id
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BlogError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let done = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(BlogError::NotFound);
        }
        Ok(())
    }

    async fn list_page(
        &self,
        author: Option<i64>,
        page: i64,
        per_page: i64,
    ) -> Result<Page<PostWithAuthor>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE ($1::BIGINT IS NULL OR user_id = $1)",
        )
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"{}
             WHERE ($1::BIGINT IS NULL OR p.user_id = $1)
             ORDER BY p.date_posted DESC, p.id DESC
             LIMIT $2 OFFSET $3"#,
            POST_WITH_AUTHOR
        );
        let items = sqlx::query_as::<_, PostWithAuthor>(&sql)
            .bind(author)
            .bind(per_page)
            .bind(Page::<PostWithAuthor>::offset(page, per_page))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, per_page, total))
    }

    async fn count_by_author(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
