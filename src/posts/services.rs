use time::OffsetDateTime;
use tracing::{info, warn};

use super::dto::PostForm;
use super::repo::{Post, PostRepo, PostWithAuthor};
use crate::error::{BlogError, Result};
use crate::pagination::{Page, PER_PAGE};
use crate::users::repo::User;

pub async fn create(posts: &dyn PostRepo, author: &User, form: &PostForm) -> Result<Post> {
    form.validate().into_result()?;
    let post = posts
        .insert(author.id, &form.title, &form.content, OffsetDateTime::now_utc())
        .await?;
    info!(post_id = post.id, user_id = author.id, "post created");
    Ok(post)
}

pub async fn load(posts: &dyn PostRepo, id: i64) -> Result<PostWithAuthor> {
    posts.find(id).await?.ok_or(BlogError::NotFound)
}

/// The post, if `editor` wrote it.
pub async fn load_for_edit(posts: &dyn PostRepo, id: i64, editor: &User) -> Result<PostWithAuthor> {
    let post = load(posts, id).await?;
    if post.post.user_id != editor.id {
        warn!(post_id = id, user_id = editor.id, "edit by non-author refused");
        return Err(BlogError::Forbidden);
    }
    Ok(post)
}

pub async fn update(posts: &dyn PostRepo, id: i64, editor: &User, form: &PostForm) -> Result<Post> {
    load_for_edit(posts, id, editor).await?;
    form.validate().into_result()?;
    let post = posts.update(id, &form.title, &form.content).await?;
    info!(post_id = id, "post updated");
    Ok(post)
}

pub async fn delete(posts: &dyn PostRepo, id: i64, editor: &User) -> Result<()> {
    load_for_edit(posts, id, editor).await?;
    posts.delete(id).await?;
    info!(post_id = id, "post deleted");
    Ok(())
}

/// Newest-first page of posts, optionally by one author.
pub async fn feed(posts: &dyn PostRepo, author: Option<i64>, page: i64) -> Result<Page<PostWithAuthor>> {
    posts.list_page(author, page.max(1), PER_PAGE).await
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::users::repo::{NewUser, UserRepo};

    async fn user(store: &MemoryStore, name: &str) -> User {
        UserRepo::insert(
            store,
            NewUser {
                username: name,
                email: &format!("{}@x.com", name),
                password_hash: "hash",
            },
        )
        .await
        .unwrap()
    }

    fn form(title: &str) -> PostForm {
        PostForm {
            title: title.into(),
            content: "body".into(),
        }
    }

    #[tokio::test]
    async fn feed_pages_newest_first() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let start = OffsetDateTime::now_utc();
        for i in 0..12 {
            PostRepo::insert(&store, alice.id, &format!("post {}", i), "c", start + Duration::minutes(i))
                .await
                .unwrap();
        }

        let first = feed(&store, None, 1).await.unwrap();
        let titles: Vec<_> = first.items.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, ["post 11", "post 10", "post 9", "post 8", "post 7"]);
        assert_eq!(first.total, 12);
        assert_eq!(first.pages, 3);

        let third = feed(&store, None, 3).await.unwrap();
        let titles: Vec<_> = third.items.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, ["post 1", "post 0"]);

        let fourth = feed(&store, None, 4).await.unwrap();
        assert!(fourth.items.is_empty());
        assert!(!fourth.has_next);

        let far = feed(&store, None, i64::MAX).await.unwrap();
        assert!(far.items.is_empty());
        assert_eq!(far.total, 12);
    }

    #[tokio::test]
    async fn feed_filters_by_author() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bobby = user(&store, "bobby").await;
        create(&store, &alice, &form("a1")).await.unwrap();
        create(&store, &bobby, &form("b1")).await.unwrap();
        create(&store, &alice, &form("a2")).await.unwrap();

        let page = feed(&store, Some(alice.id), 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|p| p.author_username == "alice"));
        assert_eq!(store.count_by_author(bobby.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn only_the_author_may_edit_or_delete() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bobby = user(&store, "bobby").await;
        let post = create(&store, &alice, &form("Hi")).await.unwrap();

        let err = update(&store, post.id, &bobby, &form("hijacked")).await.unwrap_err();
        assert!(matches!(err, BlogError::Forbidden));
        let err = delete(&store, post.id, &bobby).await.unwrap_err();
        assert!(matches!(err, BlogError::Forbidden));

        let updated = update(&store, post.id, &alice, &form("Hello")).await.unwrap();
        assert_eq!(updated.title, "Hello");
        assert_eq!(updated.date_posted, post.date_posted);

        delete(&store, post.id, &alice).await.unwrap();
        assert!(matches!(load(&store, post.id).await.unwrap_err(), BlogError::NotFound));
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let err = create(&store, &alice, &PostForm::default()).await.unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }
}
