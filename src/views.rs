//! JSON view documents returned by the page handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    error::BlogError,
    flash::{self, Category, Notice},
    forms::FieldErrors,
};

#[derive(Debug, Serialize)]
pub struct View<T: Serialize> {
    pub title: String,
    pub flashes: Vec<Notice>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Serialize)]
pub struct FormBody<F: Serialize> {
    pub form: F,
    pub errors: FieldErrors,
}

pub fn avatar_url(image_file: &str) -> String {
    format!("/static/images/{}", image_file)
}

pub fn render<T: Serialize>(jar: CookieJar, title: impl Into<String>, body: T) -> Response {
    render_with_status(jar, StatusCode::OK, title, body)
}

/// Render a view, draining any pending flash notices into it.
pub fn render_with_status<T: Serialize>(
    jar: CookieJar,
    status: StatusCode,
    title: impl Into<String>,
    body: T,
) -> Response {
    let (jar, flashes) = flash::take(jar);
    let view = View {
        title: title.into(),
        flashes,
        body,
    };
    (status, jar, Json(view)).into_response()
}

pub fn render_form<F: Serialize>(
    jar: CookieJar,
    title: impl Into<String>,
    form: F,
    errors: FieldErrors,
) -> Response {
    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    render_with_status(jar, status, title, FormBody { form, errors })
}

/// Re-render `form` when `err` belongs on it; anything else propagates.
pub fn form_rejected<F: Serialize>(
    jar: CookieJar,
    title: impl Into<String>,
    form: F,
    err: BlogError,
) -> Result<Response, BlogError> {
    match err.field_errors() {
        Some(errors) => Ok(render_form(jar, title, form, errors)),
        None => Err(err),
    }
}

pub fn redirect_with(
    jar: CookieJar,
    category: Category,
    message: impl Into<String>,
    to: &str,
) -> Response {
    (flash::push(jar, category, message), Redirect::to(to)).into_response()
}
