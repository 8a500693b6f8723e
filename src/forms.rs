//! Declarative field rules for submitted forms.
//!
//! Each field carries an ordered list of [`Rule`]s. All fields are checked and
//! every failure is collected, so a re-rendered form can show them together.
//! `Required` stops the chain for its field when the value is blank.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::BlogError;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Copy)]
pub enum Rule<'a> {
    Required,
    Length { min: usize, max: usize },
    Email,
    /// Value must equal another field's value.
    EqualTo { field: &'static str, value: &'a str },
    /// Uploaded filename must carry one of the listed extensions. Blank passes.
    FileAllowed(&'a [&'a str]),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_result(self) -> Result<(), BlogError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BlogError::Validation(self))
        }
    }
}

#[derive(Debug, Default)]
pub struct FormValidator {
    errors: FieldErrors,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, value: &str, rules: &[Rule<'_>]) -> &mut Self {
        for rule in rules {
            match apply(rule, value) {
                Outcome::Pass => {}
                Outcome::Fail(msg) => self.errors.add(field, msg),
                Outcome::Stop(msg) => {
                    self.errors.add(field, msg);
                    break;
                }
            }
        }
        self
    }

    pub fn finish(self) -> FieldErrors {
        self.errors
    }
}

enum Outcome {
    Pass,
    Fail(String),
    Stop(String),
}

fn apply(rule: &Rule<'_>, value: &str) -> Outcome {
    match *rule {
        Rule::Required => {
            if value.trim().is_empty() {
                Outcome::Stop("This field is required.".into())
            } else {
                Outcome::Pass
            }
        }
        Rule::Length { min, max } => {
            let len = value.chars().count();
            if len < min || len > max {
                let msg = if min == 0 {
                    format!("Field cannot be longer than {} characters.", max)
                } else {
                    format!("Field must be between {} and {} characters long.", min, max)
                };
                Outcome::Fail(msg)
            } else {
                Outcome::Pass
            }
        }
        Rule::Email => {
            if is_valid_email(value) {
                Outcome::Pass
            } else {
                Outcome::Fail("Invalid email address.".into())
            }
        }
        Rule::EqualTo { field, value: other } => {
            if value == other {
                Outcome::Pass
            } else {
                Outcome::Fail(format!("Field must be equal to {}.", field))
            }
        }
        Rule::FileAllowed(allowed) => {
            if value.is_empty() || extension_allowed(value, allowed) {
                Outcome::Pass
            } else {
                Outcome::Fail(format!(
                    "File does not have an approved extension: {}",
                    allowed.join(", ")
                ))
            }
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lower-cased extension of `filename`, without the dot.
pub(crate) fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub(crate) fn extension_allowed(filename: &str, allowed: &[&str]) -> bool {
    file_extension(filename).is_some_and(|ext| allowed.contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_stops_the_chain() {
        let mut v = FormValidator::new();
        v.check("username", "   ", &[Rule::Required, Rule::Length { min: 5, max: 10 }]);
        let errors = v.finish();
        assert_eq!(errors.get("username"), ["This field is required."]);
    }

    #[test]
    fn collects_errors_across_fields() {
        let mut v = FormValidator::new();
        v.check("username", "abc", &[Rule::Required, Rule::Length { min: 5, max: 10 }])
            .check("email", "not-an-email", &[Rule::Required, Rule::Email])
            .check(
                "confirm_password",
                "two",
                &[Rule::Required, Rule::EqualTo { field: "password", value: "one" }],
            );
        let errors = v.finish();
        assert_eq!(errors.get("username"), ["Field must be between 5 and 10 characters long."]);
        assert_eq!(errors.get("email"), ["Invalid email address."]);
        assert_eq!(errors.get("confirm_password"), ["Field must be equal to password."]);
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut v = FormValidator::new();
        v.check("username", "ñññññ", &[Rule::Length { min: 5, max: 10 }]);
        assert!(v.finish().is_empty());
    }

    #[test]
    fn file_allowed_checks_extension_case_insensitively() {
        assert!(extension_allowed("me.PNG", IMAGE_EXTENSIONS));
        assert!(extension_allowed("me.jpeg", IMAGE_EXTENSIONS));
        assert!(!extension_allowed("me.gif", IMAGE_EXTENSIONS));
        assert!(!extension_allowed("png", IMAGE_EXTENSIONS));
        assert!(!extension_allowed(".png", IMAGE_EXTENSIONS));

        let mut v = FormValidator::new();
        v.check("picture", "", &[Rule::FileAllowed(IMAGE_EXTENSIONS)]);
        assert!(v.finish().is_empty());
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
    }
}
