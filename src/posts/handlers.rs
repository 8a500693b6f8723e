use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    response::Response,
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::instrument;

use super::{
    dto::{PostForm, PostFormPage, PostView},
    services,
};
use crate::{
    auth::extractors::CurrentUser,
    error::{BlogError, Result},
    flash::Category,
    forms::FieldErrors,
    pagination::{Page, PageQuery},
    state::AppState,
    views::{form_rejected, redirect_with, render, render_form},
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/home", get(home))
        .route("/about", get(about))
        .route("/post/:id", get(show_post).post(show_post))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/post/new", get(new_post_page).post(new_post))
        .route("/post/:id/update", get(update_post_page).post(update_post))
        .route("/post/:id/delete", post(delete_post))
}

/// `:id` of a post. A segment that is not an id names no post, so it is a 404.
pub struct PostId(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PostId {
    type Rejection = BlogError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| BlogError::NotFound)?;
        Ok(PostId(id))
    }
}

#[derive(Debug, Serialize)]
pub struct FeedBody {
    pub posts: Page<PostView>,
}

#[derive(Debug, Serialize)]
struct PostBody {
    post: PostView,
}

#[derive(Debug, Serialize)]
struct AboutBody {}

#[instrument(skip(state, jar))]
pub async fn home(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(q): Query<PageQuery>,
) -> Result<Response> {
    let posts = services::feed(state.posts.as_ref(), None, q.number()).await?;
    Ok(render(jar, "Home", FeedBody { posts: posts.map(PostView::from) }))
}

pub async fn about(jar: CookieJar) -> Response {
    render(jar, "About", AboutBody {})
}

#[instrument(skip(state, jar))]
pub async fn show_post(
    State(state): State<AppState>,
    jar: CookieJar,
    PostId(id): PostId,
) -> Result<Response> {
    let post = services::load(state.posts.as_ref(), id).await?;
    let title = post.post.title.clone();
    Ok(render(jar, title, PostBody { post: post.into() }))
}

#[instrument(skip_all)]
pub async fn new_post_page(jar: CookieJar, CurrentUser(_user): CurrentUser) -> Response {
    let page = PostFormPage {
        legend: "New Post",
        form: PostForm::default(),
    };
    render_form(jar, "New Post", page, FieldErrors::default())
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn new_post(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    match services::create(state.posts.as_ref(), &user, &form).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Category::Success,
            "Your post has been added successfully",
            "/",
        )),
        Err(e) => {
            let page = PostFormPage {
                legend: "New Post",
                form,
            };
            form_rejected(jar, "New Post", page, e)
        }
    }
}

#[instrument(skip(state, jar, user))]
pub async fn update_post_page(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
    PostId(id): PostId,
) -> Result<Response> {
    let post = services::load_for_edit(state.posts.as_ref(), id, &user).await?;
    let page = PostFormPage {
        legend: "Update Post",
        form: PostForm {
            title: post.post.title,
            content: post.post.content,
        },
    };
    Ok(render_form(jar, "Update Post", page, FieldErrors::default()))
}

#[instrument(skip(state, jar, user, form))]
pub async fn update_post(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
    PostId(id): PostId,
    Form(form): Form<PostForm>,
) -> Result<Response> {
    match services::update(state.posts.as_ref(), id, &user, &form).await {
        Ok(post) => Ok(redirect_with(
            jar,
            Category::Success,
            "your post is updated",
            &format!("/post/{}", post.id),
        )),
        Err(e) => {
            let page = PostFormPage {
                legend: "Update Post",
                form,
            };
            form_rejected(jar, "Update Post", page, e)
        }
    }
}

#[instrument(skip(state, jar, user))]
pub async fn delete_post(
    State(state): State<AppState>,
    jar: CookieJar,
    CurrentUser(user): CurrentUser,
    PostId(id): PostId,
) -> Result<Response> {
    services::delete(state.posts.as_ref(), id, &user).await?;
    Ok(redirect_with(jar, Category::Success, "post has been deleted", "/"))
}
