use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use super::{
    dto::{AccountFormPage, AccountView, ProfileBody, PublicUser, UpdateAccountForm},
    repo::User,
    services,
};
use crate::{
    auth::extractors::CurrentUser,
    error::{BlogError, Result},
    flash::Category,
    forms::FieldErrors,
    images::services::Upload,
    pagination::PageQuery,
    posts::{dto::PostView, handlers::FeedBody, services as posts},
    state::AppState,
    views::{avatar_url, form_rejected, redirect_with, render, render_form},
};

const AVATAR_UPLOAD_LIMIT: usize = 4 * 1024 * 1024;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/update_account", get(update_account_page).post(update_account))
        .layer(DefaultBodyLimit::max(AVATAR_UPLOAD_LIMIT))
        .route("/dashboard", get(dashboard))
        .route("/myaccount/posts", get(my_posts))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/user/:username", get(user_profile))
        .route("/user/:username/posts", get(user_posts))
}

async fn find_user(state: &AppState, username: &str) -> Result<User> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or(BlogError::NotFound)
}

fn account_page(user: &User, form: UpdateAccountForm) -> AccountFormPage {
    AccountFormPage {
        image_url: avatar_url(&user.image_file),
        form,
    }
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn update_account_page(jar: CookieJar, CurrentUser(user): CurrentUser) -> Response {
    let form = UpdateAccountForm {
        username: user.username.clone(),
        email: user.email.clone(),
        picture: String::new(),
    };
    render_form(jar, "Edit Profile", account_page(&user, form), FieldErrors::default())
}

/// Multipart fields `username`, `email` and an optional `picture` file.
async fn read_account_form(mut mp: Multipart) -> Result<(UpdateAccountForm, Option<Upload>)> {
    let malformed = |e: axum::extract::multipart::MultipartError| BlogError::BadRequest(e.to_string());

    let mut form = UpdateAccountForm::default();
    let mut picture = None;
    while let Some(field) = mp.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => form.username = field.text().await.map_err(malformed)?,
            "email" => form.email = field.text().await.map_err(malformed)?,
            "picture" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await.map_err(malformed)?;
                if !filename.is_empty() && !body.is_empty() {
                    form.picture = filename.clone();
                    picture = Some(Upload { filename, body });
                }
            }
            _ => {}
        }
    }
    Ok((form, picture))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn update_account(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
    mp: Multipart,
) -> Result<Response> {
    let (form, picture) = read_account_form(mp).await?;
    let updated = services::update_profile(
        state.users.as_ref(),
        state.storage.as_ref(),
        &user,
        &form,
        picture,
    )
    .await;
    match updated {
        Ok(_) => Ok(redirect_with(
            jar,
            Category::Success,
            "Your account has been updated",
            "/update_account",
        )),
        Err(e) => form_rejected(jar, "Edit Profile", account_page(&user, form), e),
    }
}

#[instrument(skip(state, jar))]
pub async fn user_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
) -> Result<Response> {
    let user = find_user(&state, &username).await?;
    let post_count = state.posts.count_by_author(user.id).await?;
    let body = ProfileBody {
        user: PublicUser::from(&user),
        post_count,
    };
    Ok(render(jar, user.username.clone(), body))
}

#[derive(Debug, serde::Serialize)]
struct UserPostsBody {
    user: PublicUser,
    #[serde(flatten)]
    feed: FeedBody,
}

#[instrument(skip(state, jar))]
pub async fn user_posts(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(username): Path<String>,
    Query(q): Query<PageQuery>,
) -> Result<Response> {
    let user = find_user(&state, &username).await?;
    let page = posts::feed(state.posts.as_ref(), Some(user.id), q.number()).await?;
    let body = UserPostsBody {
        user: PublicUser::from(&user),
        feed: FeedBody {
            posts: page.map(PostView::from),
        },
    };
    Ok(render(jar, format!("Posts by {}", user.username), body))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
) -> Result<Response> {
    let post_count = state.posts.count_by_author(user.id).await?;
    let body = ProfileBody {
        user: AccountView::from(&user),
        post_count,
    };
    Ok(render(jar, "Dashboard", body))
}

#[instrument(skip(state, jar, user))]
pub async fn my_posts(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
    Query(q): Query<PageQuery>,
) -> Result<Response> {
    let page = posts::feed(state.posts.as_ref(), Some(user.id), q.number()).await?;
    let body = FeedBody {
        posts: page.map(PostView::from),
    };
    Ok(render(jar, "My Posts", body))
}
