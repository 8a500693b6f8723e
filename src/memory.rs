//! In-process store behind the same repository traits as [`crate::db::PgStore`].
//! Selected with `DATABASE_URL=memory://`; the test-suite runs against it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::{BlogError, Result};
use crate::pagination::Page;
use crate::posts::repo::{Post, PostRepo, PostWithAuthor};
use crate::users::repo::{NewUser, ProfileChanges, User, UserRepo, DEFAULT_AVATAR};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    last_user_id: i64,
    last_post_id: i64,
}

impl Tables {
    /// Uniqueness check and write happen under the same write lock.
    fn ensure_unique(&self, username: &str, email: &str, except: Option<i64>) -> Result<()> {
        let others: Vec<&User> = self.users.iter().filter(|u| Some(u.id) != except).collect();
        if others.iter().any(|u| u.username == username) {
            return Err(BlogError::DuplicateUsername);
        }
        if others.iter().any(|u| u.email == email) {
            return Err(BlogError::DuplicateEmail);
        }
        Ok(())
    }

    fn with_author(&self, post: &Post) -> Option<PostWithAuthor> {
        let author = self.users.iter().find(|u| u.id == post.user_id)?;
        Some(PostWithAuthor {
            post: post.clone(),
            author_username: author.username.clone(),
            author_image_file: author.image_file.clone(),
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| BlogError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| BlogError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert(&self, new: NewUser<'_>) -> Result<User> {
        let mut t = self.write()?;
        t.ensure_unique(new.username, new.email, None)?;
        t.last_user_id += 1;
        let user = User {
            id: t.last_user_id,
            username: new.username.to_string(),
            email: new.email.to_string(),
            image_file: DEFAULT_AVATAR.to_string(),
            password_hash: new.password_hash.to_string(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.read()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.read()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.read()?.users.iter().find(|u| u.username == username).cloned())
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges<'_>) -> Result<User> {
        let mut t = self.write()?;
        t.ensure_unique(changes.username, changes.email, Some(id))?;
        let user = t.users.iter_mut().find(|u| u.id == id).ok_or(BlogError::NotFound)?;
        user.username = changes.username.to_string();
        user.email = changes.email.to_string();
        if let Some(image_file) = changes.image_file {
            user.image_file = image_file.to_string();
        }
        Ok(user.clone())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let mut t = self.write()?;
        let user = t.users.iter_mut().find(|u| u.id == id).ok_or(BlogError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

#[async_trait]
impl PostRepo for MemoryStore {
    async fn insert(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        date_posted: OffsetDateTime,
    ) -> Result<Post> {
        let mut t = self.write()?;
        if !t.users.iter().any(|u| u.id == user_id) {
            return Err(BlogError::Internal(anyhow::anyhow!(
                "post author {} does not exist",
                user_id
            )));
        }
        t.last_post_id += 1;
        let post = Post {
            id: t.last_post_id,
            title: title.to_string(),
            content: content.to_string(),
            date_posted,
            user_id,
        };
        t.posts.push(post.clone());
        Ok(post)
    }

    async fn find(&self, id: i64) -> Result<Option<PostWithAuthor>> {
        let t = self.read()?;
        Ok(t.posts.iter().find(|p| p.id == id).and_then(|p| t.with_author(p)))
    }

    async fn update(&self, id: i64, title: &str, content: &str) -> Result<Post> {
        let mut t = self.write()?;
        let post = t.posts.iter_mut().find(|p| p.id == id).ok_or(BlogError::NotFound)?;
        post.title = title.to_string();
        post.content = content.to_string();
        Ok(post.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut t = self.write()?;
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        if t.posts.len() == before {
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
        let t = self.read()?;
        let mut matching: Vec<&Post> = t
            .posts
            .iter()
            .filter(|p| author.map_or(true, |a| p.user_id == a))
            .collect();
        matching.sort_by(|a, b| (b.date_posted, b.id).cmp(&(a.date_posted, a.id)));

        let total = matching.len() as i64;
        let offset = Page::<PostWithAuthor>::offset(page, per_page) as usize;
        let items = matching
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .filter_map(|p| t.with_author(p))
            .collect();
        Ok(Page::new(items, page, per_page, total))
    }

    async fn count_by_author(&self, user_id: i64) -> Result<i64> {
        Ok(self.read()?.posts.iter().filter(|p| p.user_id == user_id).count() as i64)
    }
}
