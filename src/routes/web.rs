//! Form endpoints for browser sessions. They answer with redirects to the
//! affected resource instead of JSON.

use axum::extract::{Path, State};
use axum::middleware;
use axum::response::Redirect;
use axum::routing::post;
use axum::{Form, Router};

use crate::auth::gate::{authorize, AccessPolicy, Gate};
use crate::auth::handlers::DEFAULT_LANDING;
use crate::db::input::{NewComment, NewPost};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let authors = Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{post_id}/comments", post(create_comment))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::ACTIVE_MEMBER),
            authorize,
        ));

    let members = Router::new()
        .route("/posts/{post_id}/delete", post(delete_post))
        .route("/comments/{comment_id}/delete", post(delete_comment))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::MEMBER),
            authorize,
        ));

    authors.merge(members)
}

fn post_url(post_id: i64) -> String {
    format!("/api/posts/{post_id}")
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(mut form): Form<NewPost>,
) -> AppResult<Redirect> {
    // Browsers submit an empty field rather than omitting it.
    if form.image_url.as_deref().is_some_and(str::is_empty) {
        form.image_url = None;
    }
    let post = state.posts().create(user.id, &form)?;
    Ok(Redirect::to(&post_url(post.id)))
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<NewComment>,
) -> AppResult<Redirect> {
    state.comments().create(post_id, user.id, None, &form)?;
    Ok(Redirect::to(&format!("{}/comments", post_url(post_id))))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Redirect> {
    let posts = state.posts();
    user.ensure_can_modify(posts.find(post_id)?.user_id)?;
    posts.delete(post_id)?;
    Ok(Redirect::to(DEFAULT_LANDING))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<Redirect> {
    let comments = state.comments();
    let comment = comments.find_by_id(comment_id)?;
    user.ensure_can_modify(comment.user_id)?;
    comments.delete(comment_id)?;
    Ok(Redirect::to(&post_url(comment.post_id)))
}
