use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::{instrument, warn};

use super::{
    dto::{
        ChangePasswordForm, LoginForm, NextQuery, RegisterForm, RequestResetForm,
        ResetPasswordForm,
    },
    extractors::{CurrentUser, MaybeUser},
    services, session,
};
use crate::{
    error::{BlogError, Result},
    flash::{self, Category},
    forms::FieldErrors,
    state::AppState,
    views::{avatar_url, form_rejected, redirect_with, render_form, render_with_status, FormBody},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/password", get(password_page).post(change_password))
        .route("/reset_password/", get(reset_request_page).post(reset_request))
        .route("/reset_password", get(reset_request_page).post(reset_request))
        .route("/reset_password/:token", get(reset_token_page).post(reset_token))
}

#[derive(Debug, Serialize)]
struct PasswordForm {
    image_url: String,
}

#[instrument(skip_all)]
pub async fn register_page(jar: CookieJar, MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    render_form(jar, "Register", RegisterForm::default(), FieldErrors::default())
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(user): MaybeUser,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    match services::register(state.users.as_ref(), &form).await {
        Ok(user) => Ok(redirect_with(
            jar,
            Category::Success,
            format!("Account created for {} ", user.username),
            "/login",
        )),
        Err(e) => form_rejected(jar, "Register", form, e),
    }
}

#[instrument(skip_all)]
pub async fn login_page(jar: CookieJar, MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    render_form(jar, "Login", LoginForm::default(), FieldErrors::default())
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(user): MaybeUser,
    Query(next): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(render_form(jar, "Login", form, errors));
    }

    match services::authenticate(state.users.as_ref(), &form.email, &form.password).await {
        Ok(user) => {
            let jar = session::login(
                jar,
                &state.tokens,
                &user,
                form.remember(),
                state.config.cookie_secure,
            )?;
            Ok((jar, Redirect::to(next.target())).into_response())
        }
        Err(BlogError::AuthFailure) => {
            let jar = flash::push(jar, Category::Danger, "Invalid credentials, please try again");
            let body = FormBody {
                form,
                errors: FieldErrors::default(),
            };
            Ok(render_with_status(jar, StatusCode::UNAUTHORIZED, "Login", body))
        }
        Err(e) => Err(e),
    }
}

#[instrument(skip_all)]
pub async fn logout(jar: CookieJar) -> Response {
    (session::logout(jar), Redirect::to("/")).into_response()
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn password_page(jar: CookieJar, CurrentUser(user): CurrentUser) -> Response {
    let body = PasswordForm {
        image_url: avatar_url(&user.image_file),
    };
    render_form(jar, "Update Password", body, FieldErrors::default())
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response> {
    let echo = PasswordForm {
        image_url: avatar_url(&user.image_file),
    };
    match services::change_password(state.users.as_ref(), &user, &form).await {
        Ok(()) => Ok(redirect_with(
            session::logout(jar),
            Category::Success,
            "Your password is updated, Please login again",
            "/",
        )),
        Err(BlogError::WrongCurrentPassword) => {
            let jar = flash::push(jar, Category::Danger, "Current password is incorrect");
            let body = FormBody {
                form: echo,
                errors: FieldErrors::default(),
            };
            Ok(render_with_status(
                jar,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Update Password",
                body,
            ))
        }
        Err(e) => form_rejected(jar, "Update Password", echo, e),
    }
}

#[instrument(skip_all)]
pub async fn reset_request_page(jar: CookieJar, MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    render_form(jar, "Reset Request", RequestResetForm::default(), FieldErrors::default())
}

#[instrument(skip_all)]
pub async fn reset_request(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(user): MaybeUser,
    Form(form): Form<RequestResetForm>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let sent = services::request_reset(
        state.users.as_ref(),
        state.mailer.as_ref(),
        &state.tokens,
        &state.config.public_base_url,
        &form,
    )
    .await;
    match sent {
        Ok(()) => Ok(redirect_with(
            jar,
            Category::Info,
            "email has been send with password reset info",
            "/login",
        )),
        Err(e) => form_rejected(jar, "Reset Request", form, e),
    }
}

fn token_expired(jar: CookieJar) -> Response {
    warn!("password reset with invalid or expired token");
    redirect_with(jar, Category::Warning, "token has been expired", "/reset_password/")
}

#[instrument(skip_all)]
pub async fn reset_token_page(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    if services::user_for_reset_token(state.users.as_ref(), &state.tokens, &token)
        .await?
        .is_none()
    {
        return Ok(token_expired(jar));
    }
    Ok(render_form(
        jar,
        "Reset Password",
        ResetPasswordForm::default(),
        FieldErrors::default(),
    ))
}

#[instrument(skip_all)]
pub async fn reset_token(
    State(state): State<AppState>,
    jar: CookieJar,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    match services::reset_password(state.users.as_ref(), &state.tokens, &token, &form).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Category::Success,
            "password has been updated",
            "/login",
        )),
        Err(BlogError::TokenInvalidOrExpired) => Ok(token_expired(jar)),
        Err(e) => form_rejected(jar, "Reset Password", form, e),
    }
}
