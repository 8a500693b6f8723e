use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::PostWithAuthor;
use crate::forms::{FieldErrors, FormValidator, Rule};
use crate::users::dto::PublicUser;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

impl PostForm {
    pub fn validate(&self) -> FieldErrors {
        let mut v = FormValidator::new();
        v.check("title", &self.title, &[Rule::Required, Rule::Length { min: 0, max: 100 }])
            .check("content", &self.content, &[Rule::Required]);
        v.finish()
    }
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_posted: OffsetDateTime,
    pub author: PublicUser,
}

impl From<PostWithAuthor> for PostView {
    fn from(p: PostWithAuthor) -> Self {
        Self {
            id: p.post.id,
            title: p.post.title,
            content: p.post.content,
            date_posted: p.post.date_posted,
            author: PublicUser::new(p.post.user_id, p.author_username, &p.author_image_file),
        }
    }
}

/// Form page for creating or editing a post.
#[derive(Debug, Serialize)]
pub struct PostFormPage {
    pub legend: &'static str,
    #[serde(flatten)]
    pub form: PostForm,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_limits() {
        let form = PostForm {
            title: "x".repeat(101),
            content: "body".into(),
        };
        assert_eq!(
            form.validate().get("title"),
            ["Field cannot be longer than 100 characters."]
        );

        let empty = PostForm::default().validate();
        assert_eq!(empty.get("title"), ["This field is required."]);
        assert_eq!(empty.get("content"), ["This field is required."]);
    }
}
