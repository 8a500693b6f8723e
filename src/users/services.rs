use tracing::info;

use super::dto::UpdateAccountForm;
use super::repo::{ProfileChanges, User, UserRepo};
use crate::error::{BlogError, Result};
use crate::images::services::{ingest, Upload};
use crate::storage::StorageClient;

/// Apply an account form. Username and email may stay as they are or move to
/// values no other account holds.
pub async fn update_profile(
    users: &dyn UserRepo,
    storage: &dyn StorageClient,
    user: &User,
    form: &UpdateAccountForm,
    picture: Option<Upload>,
) -> Result<User> {
    form.validate().into_result()?;

    if form.username != user.username && users.find_by_username(&form.username).await?.is_some() {
        return Err(BlogError::DuplicateUsername);
    }
    if form.email != user.email && users.find_by_email(&form.email).await?.is_some() {
        return Err(BlogError::DuplicateEmail);
    }

    let image_file = match picture {
        Some(upload) => Some(ingest(storage, upload).await?),
        None => None,
    };
    let updated = users
        .update_profile(
            user.id,
            ProfileChanges {
                username: &form.username,
                email: &form.email,
                image_file: image_file.as_deref(),
            },
        )
        .await?;
    info!(user_id = user.id, avatar_changed = image_file.is_some(), "account updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat, RgbImage};

    use super::*;
    use crate::memory::MemoryStore;
    use crate::storage::LocalStorage;
    use crate::users::repo::{NewUser, DEFAULT_AVATAR};

    async fn seed(store: &MemoryStore) -> (User, User) {
        let alice = UserRepo::insert(
            store,
            NewUser {
                username: "alice",
                email: "a@x.com",
                password_hash: "h",
            },
        )
        .await
        .unwrap();
        let bobby = UserRepo::insert(
            store,
            NewUser {
                username: "bobby",
                email: "b@x.com",
                password_hash: "h",
            },
        )
        .await
        .unwrap();
        (alice, bobby)
    }

    fn form(username: &str, email: &str) -> UpdateAccountForm {
        UpdateAccountForm {
            username: username.into(),
            email: email.into(),
            picture: String::new(),
        }
    }

    #[tokio::test]
    async fn keeps_own_values_and_rejects_others() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let (alice, _) = seed(&store).await;

        let same = update_profile(&store, &storage, &alice, &form("alice", "a@x.com"), None)
            .await
            .unwrap();
        assert_eq!(same.image_file, DEFAULT_AVATAR);

        let err = update_profile(&store, &storage, &alice, &form("bobby", "a@x.com"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::DuplicateUsername));
        let err = update_profile(&store, &storage, &alice, &form("alice", "b@x.com"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::DuplicateEmail));

        let renamed = update_profile(&store, &storage, &alice, &form("alicia", "al@x.com"), None)
            .await
            .unwrap();
        assert_eq!(renamed.username, "alicia");
    }

    #[tokio::test]
    async fn replaces_avatar() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let (alice, _) = seed(&store).await;

        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(300, 300))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        let mut with_picture = form("alice", "a@x.com");
        with_picture.picture = "avatar.png".into();
        let upload = Upload {
            filename: "avatar.png".into(),
            body: Bytes::from(png.into_inner()),
        };

        let updated = update_profile(&store, &storage, &alice, &with_picture, Some(upload))
            .await
            .unwrap();
        assert_ne!(updated.image_file, DEFAULT_AVATAR);
        assert!(dir.path().join(&updated.image_file).exists());
    }
}
