use serde::{Deserialize, Serialize};

use crate::forms::{FieldErrors, FormValidator, Rule};

pub(crate) const USERNAME_RULES: &[Rule<'static>] = &[Rule::Required, Rule::Length { min: 5, max: 10 }];
pub(crate) const EMAIL_RULES: &[Rule<'static>] = &[Rule::Required, Rule::Email, Rule::Length { min: 0, max: 50 }];

/// Registration form. Passwords are never echoed back.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FieldErrors {
        let mut v = FormValidator::new();
        v.check("username", &self.username, USERNAME_RULES)
            .check("email", &self.email, EMAIL_RULES)
            .check("password", &self.password, &[Rule::Required])
            .check(
                "confirm_password",
                &self.confirm_password,
                &[
                    Rule::Required,
                    Rule::EqualTo {
                        field: "password",
                        value: &self.password,
                    },
                ],
            );
        v.finish()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Checkbox; any non-empty value other than "false"/"off" ticks it.
    pub remember: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> FieldErrors {
        let mut v = FormValidator::new();
        v.check("email", &self.email, &[Rule::Required, Rule::Email])
            .check("password", &self.password, &[Rule::Required]);
        v.finish()
    }

    pub fn remember(&self) -> bool {
        matches!(self.remember.as_deref(), Some(v) if !v.is_empty() && v != "false" && v != "off")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

impl NextQuery {
    /// Post-login target. Only local paths are followed.
    pub fn target(&self) -> &str {
        match self.next.as_deref() {
            Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.starts_with("/\\") => n,
            _ => "/dashboard",
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangePasswordForm {
    #[serde(skip_serializing)]
    pub current_password: String,
    #[serde(skip_serializing)]
    pub new_password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl ChangePasswordForm {
    pub fn validate(&self) -> FieldErrors {
        let mut v = FormValidator::new();
        v.check("current_password", &self.current_password, &[Rule::Required])
            .check("new_password", &self.new_password, &[Rule::Required])
            .check(
                "confirm_password",
                &self.confirm_password,
                &[
                    Rule::Required,
                    Rule::EqualTo {
                        field: "new_password",
                        value: &self.new_password,
                    },
                ],
            );
        v.finish()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestResetForm {
    pub email: String,
}

impl RequestResetForm {
    pub fn validate(&self) -> FieldErrors {
        let mut v = FormValidator::new();
        v.check("email", &self.email, &[Rule::Required, Rule::Email]);
        v.finish()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetPasswordForm {
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> FieldErrors {
        let mut v = FormValidator::new();
        v.check("password", &self.password, &[Rule::Required]).check(
            "confirm_password",
            &self.confirm_password,
            &[
                Rule::Required,
                Rule::EqualTo {
                    field: "password",
                    value: &self.password,
                },
            ],
        );
        v.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_rules() {
        let form = RegisterForm {
            username: "al".into(),
            email: "a@x.com".into(),
            password: "pw123".into(),
            confirm_password: "pw124".into(),
        };
        let errors = form.validate();
        assert_eq!(errors.get("username").len(), 1);
        assert!(errors.get("email").is_empty());
        assert_eq!(errors.get("confirm_password"), ["Field must be equal to password."]);
    }

    #[test]
    fn register_form_never_echoes_passwords() {
        let form = RegisterForm {
            username: "alice".into(),
            email: "a@x.com".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
        };
        let json = serde_json::to_string(&form).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("alice"));
    }

    #[test]
    fn next_only_follows_local_paths() {
        let q = |n: &str| NextQuery { next: Some(n.into()) };
        assert_eq!(q("/post/new").target(), "/post/new");
        assert_eq!(q("https://evil.example").target(), "/dashboard");
        assert_eq!(q("//evil.example").target(), "/dashboard");
        assert_eq!(NextQuery::default().target(), "/dashboard");
    }

    #[test]
    fn remember_checkbox() {
        let mut form = LoginForm::default();
        assert!(!form.remember());
        form.remember = Some("y".into());
        assert!(form.remember());
        form.remember = Some("off".into());
        assert!(!form.remember());
    }
}
