use serde::{Deserialize, Serialize};

use super::repo::User;
use crate::auth::dto::{EMAIL_RULES, USERNAME_RULES};
use crate::forms::{FieldErrors, FormValidator, Rule, IMAGE_EXTENSIONS};
use crate::views::avatar_url;

/// What anyone may see about a user.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub image_url: String,
}

impl PublicUser {
    pub fn new(id: i64, username: String, image_file: &str) -> Self {
        Self {
            id,
            username,
            image_url: avatar_url(image_file),
        }
    }
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self::new(u.id, u.username.clone(), &u.image_file)
    }
}

/// The signed-in user's own view of their account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_url: String,
}

impl From<&User> for AccountView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            image_url: avatar_url(&u.image_file),
        }
    }
}

/// Account form; `picture` is the uploaded file's name, blank when none.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateAccountForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub picture: String,
}

impl UpdateAccountForm {
    pub fn validate(&self) -> FieldErrors {
        let mut v = FormValidator::new();
        v.check("username", &self.username, USERNAME_RULES)
            .check("email", &self.email, EMAIL_RULES)
            .check("picture", &self.picture, &[Rule::FileAllowed(IMAGE_EXTENSIONS)]);
        v.finish()
    }
}

#[derive(Debug, Serialize)]
pub struct AccountFormPage {
    pub image_url: String,
    #[serde(flatten)]
    pub form: UpdateAccountForm,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody<U: Serialize> {
    pub user: U,
    pub post_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picture_must_be_an_image() {
        let form = UpdateAccountForm {
            username: "alice".into(),
            email: "a@x.com".into(),
            picture: "me.gif".into(),
        };
        assert_eq!(form.validate().get("picture").len(), 1);

        let no_picture = UpdateAccountForm {
            picture: String::new(),
            ..form
        };
        assert!(no_picture.validate().is_empty());
    }

    #[test]
    fn public_user_hides_email() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "a@x.com".into(),
            image_file: "default.png".into(),
            password_hash: "h".into(),
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(!json.contains("a@x.com"));
        assert!(json.contains("/static/images/default.png"));
    }
}
