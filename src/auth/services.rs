use lazy_static::lazy_static;
use tracing::{info, warn};

use super::dto::{ChangePasswordForm, RegisterForm, RequestResetForm, ResetPasswordForm};
use super::password::{hash_password, verify_password};
use super::tokens::TokenKeys;
use crate::error::{BlogError, Result};
use crate::forms::FieldErrors;
use crate::mail::{Mailer, OutgoingMail};
use crate::users::repo::{NewUser, User, UserRepo};

lazy_static! {
    /// Verified against when the email is unknown so both failure paths cost
    /// one Argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("not-a-real-password").ok();
}

pub async fn register(users: &dyn UserRepo, form: &RegisterForm) -> Result<User> {
    form.validate().into_result()?;

    if users.find_by_username(&form.username).await?.is_some() {
        return Err(BlogError::DuplicateUsername);
    }
    if users.find_by_email(&form.email).await?.is_some() {
        return Err(BlogError::DuplicateEmail);
    }

    let hash = hash_password(&form.password)?;
    // the unique constraints still decide a concurrent race
    let user = users
        .insert(NewUser {
            username: &form.username,
            email: &form.email,
            password_hash: &hash,
        })
        .await?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Unknown email and wrong password are both `AuthFailure`.
pub async fn authenticate(users: &dyn UserRepo, email: &str, password: &str) -> Result<User> {
    let Some(user) = users.find_by_email(email).await? else {
        if let Some(dummy) = DUMMY_HASH.as_deref() {
            let _ = verify_password(password, dummy);
        }
        warn!(%email, "login unknown email");
        return Err(BlogError::AuthFailure);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(BlogError::AuthFailure);
    }
    info!(user_id = user.id, "user logged in");
    Ok(user)
}

/// Rehash the password. The new salt invalidates every existing session.
pub async fn change_password(
    users: &dyn UserRepo,
    user: &User,
    form: &ChangePasswordForm,
) -> Result<()> {
    form.validate().into_result()?;
    if !verify_password(&form.current_password, &user.password_hash)? {
        warn!(user_id = user.id, "password change with wrong current password");
        return Err(BlogError::WrongCurrentPassword);
    }
    let hash = hash_password(&form.new_password)?;
    users.update_password(user.id, &hash).await?;
    info!(user_id = user.id, "password changed");
    Ok(())
}

pub fn reset_mail(user: &User, token: &str, base_url: &str) -> OutgoingMail {
    let link = format!("{}/reset_password/{}", base_url.trim_end_matches('/'), token);
    OutgoingMail {
        to: user.email.clone(),
        subject: "Password Reset Request".into(),
        body: format!(
            "To reset your password, visit the following link:\n{}\n\
             If you did not make this request then simply ignore this email and no changes will be made.\n",
            link
        ),
    }
}

/// Mail a reset link. Unregistered emails fail validation before anything is sent.
pub async fn request_reset(
    users: &dyn UserRepo,
    mailer: &dyn Mailer,
    keys: &TokenKeys,
    base_url: &str,
    form: &RequestResetForm,
) -> Result<()> {
    form.validate().into_result()?;
    let user = users.find_by_email(&form.email).await?.ok_or_else(|| {
        BlogError::Validation(FieldErrors::single("email", "Entered email is not found"))
    })?;

    let token = keys.issue_reset(user.id)?;
    mailer.send(reset_mail(&user, &token, base_url)).await?;
    info!(user_id = user.id, "password reset mail sent");
    Ok(())
}

/// User a reset token was issued for; `None` when it is invalid or expired,
/// or the user is gone.
pub async fn user_for_reset_token(
    users: &dyn UserRepo,
    keys: &TokenKeys,
    token: &str,
) -> Result<Option<User>> {
    match keys.verify_reset(token) {
        Some(user_id) => users.find_by_id(user_id).await,
        None => Ok(None),
    }
}

pub async fn reset_password(
    users: &dyn UserRepo,
    keys: &TokenKeys,
    token: &str,
    form: &ResetPasswordForm,
) -> Result<User> {
    let user = user_for_reset_token(users, keys, token)
        .await?
        .ok_or(BlogError::TokenInvalidOrExpired)?;
    form.validate().into_result()?;
    let hash = hash_password(&form.password)?;
    users.update_password(user.id, &hash).await?;
    info!(user_id = user.id, "password reset");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::config::TokenConfig;
    use crate::memory::MemoryStore;

    #[derive(Default)]
    struct CaptureMailer(Mutex<Vec<OutgoingMail>>);

    #[async_trait]
    impl Mailer for CaptureMailer {
        async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(mail);
            Ok(())
        }
    }

    fn keys() -> TokenKeys {
        TokenKeys::new(&TokenConfig {
            secret: "test".into(),
            issuer: "test".into(),
            session_ttl_minutes: 5,
            reset_ttl_seconds: 1800,
        })
    }

    fn form(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_stores_only_a_hash() {
        let store = MemoryStore::new();
        let user = register(&store, &form("alice", "a@x.com", "pw123")).await.unwrap();
        assert_ne!(user.password_hash, "pw123");
        assert!(verify_password("pw123", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn register_rejects_duplicates() {
        let store = MemoryStore::new();
        register(&store, &form("alice", "a@x.com", "pw123")).await.unwrap();

        let err = register(&store, &form("alice", "other@x.com", "pw123")).await.unwrap_err();
        assert!(matches!(err, BlogError::DuplicateUsername));
        let err = register(&store, &form("alice2", "a@x.com", "pw123")).await.unwrap_err();
        assert!(matches!(err, BlogError::DuplicateEmail));
    }

    #[tokio::test]
    async fn authenticate_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        register(&store, &form("alice", "a@x.com", "pw123")).await.unwrap();

        let wrong_pw = authenticate(&store, "a@x.com", "nope").await.unwrap_err();
        let unknown = authenticate(&store, "nobody@x.com", "pw123").await.unwrap_err();
        assert!(matches!(wrong_pw, BlogError::AuthFailure));
        assert!(matches!(unknown, BlogError::AuthFailure));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());

        let user = authenticate(&store, "a@x.com", "pw123").await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn change_password_checks_current() {
        let store = MemoryStore::new();
        let user = register(&store, &form("alice", "a@x.com", "pw123")).await.unwrap();

        let bad = ChangePasswordForm {
            current_password: "wrong".into(),
            new_password: "new-pw".into(),
            confirm_password: "new-pw".into(),
        };
        let err = change_password(&store, &user, &bad).await.unwrap_err();
        assert!(matches!(err, BlogError::WrongCurrentPassword));

        let good = ChangePasswordForm {
            current_password: "pw123".into(),
            ..bad
        };
        change_password(&store, &user, &good).await.unwrap();
        assert!(authenticate(&store, "a@x.com", "new-pw").await.is_ok());
        assert!(authenticate(&store, "a@x.com", "pw123").await.is_err());
    }

    #[tokio::test]
    async fn reset_flow_mails_a_working_link() {
        let store = MemoryStore::new();
        let mailer = CaptureMailer::default();
        let keys = keys();
        register(&store, &form("alice", "a@x.com", "pw123")).await.unwrap();

        let unknown = RequestResetForm {
            email: "nobody@x.com".into(),
        };
        let err = request_reset(&store, &mailer, &keys, "http://blog", &unknown)
            .await
            .unwrap_err();
        assert!(err.field_errors().is_some());
        assert!(mailer.0.lock().unwrap().is_empty());

        let known = RequestResetForm {
            email: "a@x.com".into(),
        };
        request_reset(&store, &mailer, &keys, "http://blog/", &known).await.unwrap();
        let mail = mailer.0.lock().unwrap().pop().unwrap();
        assert_eq!(mail.to, "a@x.com");
        let token = mail
            .body
            .lines()
            .find_map(|l| l.strip_prefix("http://blog/reset_password/"))
            .unwrap()
            .to_string();

        let reset = ResetPasswordForm {
            password: "fresh".into(),
            confirm_password: "fresh".into(),
        };
        let user = reset_password(&store, &keys, &token, &reset).await.unwrap();
        assert_eq!(user.username, "alice");
        assert!(authenticate(&store, "a@x.com", "fresh").await.is_ok());

        let err = reset_password(&store, &keys, "garbage", &reset).await.unwrap_err();
        assert!(matches!(err, BlogError::TokenInvalidOrExpired));
    }
}
