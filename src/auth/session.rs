//! Login session carried in an HttpOnly cookie holding a signed session token.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use super::{password, tokens::TokenKeys};
use crate::{error::Result, state::AppState, users::repo::User};

const SESSION_COOKIE_NAME: &str = "session";

/// Add a session cookie for `user`. Without `remember` the cookie ends with
/// the browser session; the token itself still expires after the TTL.
pub fn login(
    jar: CookieJar,
    keys: &TokenKeys,
    user: &User,
    remember: bool,
    secure: bool,
) -> anyhow::Result<CookieJar> {
    let fingerprint = password::fingerprint(&user.password_hash)
        .ok_or_else(|| anyhow::anyhow!("stored password hash has no salt"))?;
    let token = keys.sign_session(user.id, fingerprint)?;

    let mut cookie = Cookie::build((SESSION_COOKIE_NAME, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/");
    if remember {
        cookie = cookie.max_age(time::Duration::seconds(keys.session_ttl.as_secs() as i64));
    }
    Ok(jar.add(cookie.build()))
}

pub fn logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE_NAME).path("/"))
}

/// User behind the session cookie, if the token is valid and was issued for
/// the user's current password.
pub async fn session_user(jar: &CookieJar, state: &AppState) -> Result<Option<User>> {
    let Some(cookie) = jar.get(SESSION_COOKIE_NAME) else {
        return Ok(None);
    };
    let claims = match state.tokens.verify_session(cookie.value()) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "session token rejected");
            return Ok(None);
        }
    };
    let Some(user) = state.users.find_by_id(claims.sub).await? else {
        return Ok(None);
    };
    if claims.ver.is_none() || claims.ver != password::fingerprint(&user.password_hash) {
        debug!(user_id = user.id, "session predates password change");
        return Ok(None);
    }
    Ok(Some(user))
}
