//! One-shot notices carried across a redirect in the `flash` cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

const FLASH_COOKIE_NAME: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub category: Category,
    pub message: String,
}

fn read(jar: &CookieJar) -> Vec<Notice> {
    jar.get(FLASH_COOKIE_NAME)
        .and_then(|c| URL_SAFE_NO_PAD.decode(c.value()).ok())
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .unwrap_or_default()
}

/// Queue a notice for the next rendered view.
pub fn push(jar: CookieJar, category: Category, message: impl Into<String>) -> CookieJar {
    let mut notices = read(&jar);
    notices.push(Notice {
        category,
        message: message.into(),
    });
    // serializing a Vec of plain structs cannot fail
    let raw = serde_json::to_vec(&notices).unwrap_or_default();
    let cookie = Cookie::build((FLASH_COOKIE_NAME, URL_SAFE_NO_PAD.encode(raw)))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    jar.add(cookie)
}

/// Drain queued notices; the returned jar clears the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<Notice>) {
    let notices = read(&jar);
    if notices.is_empty() {
        return (jar, notices);
    }
    (jar.remove(Cookie::build(FLASH_COOKIE_NAME).path("/")), notices)
}
