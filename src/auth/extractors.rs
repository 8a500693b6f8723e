use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::session::session_user;
use crate::{
    flash::{self, Category},
    state::AppState,
    users::repo::User,
};

/// Authenticated user. Anonymous requests are sent to the login page with the
/// original path in `next`.
pub struct CurrentUser(pub User);

/// Authenticated user when there is one.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match session_user(&jar, state).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                let jar = flash::push(jar, Category::Info, "Please log in to access this page.");
                let to = format!("/login?next={}", urlencoding::encode(next));
                Err((jar, Redirect::to(&to)).into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        session_user(&jar, state)
            .await
            .map(MaybeUser)
            .map_err(IntoResponse::into_response)
    }
}
