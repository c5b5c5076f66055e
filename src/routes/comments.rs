use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::auth::gate::{authorize, AccessPolicy, Gate};
use crate::db::input::{CommentQuery, NewComment};
use crate::db::models::CommentView;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/comments", get(filter))
        .route("/api/posts/{post_id}/comments", get(for_post))
        .route("/api/posts/{post_id}/comments/{comment_id}", get(show))
        .route(
            "/api/posts/{post_id}/comments/{comment_id}/replies",
            get(replies),
        );

    let authors = Router::new()
        .route("/api/posts/{post_id}/comments", post(create))
        .route(
            "/api/posts/{post_id}/comments/{comment_id}/replies",
            post(reply),
        )
        .route("/api/posts/{post_id}/comments/{comment_id}", put(update))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::ACTIVE_MEMBER),
            authorize,
        ));

    let members = Router::new()
        .route("/api/posts/{post_id}/comments/{comment_id}", delete(remove))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::MEMBER),
            authorize,
        ));

    public.merge(authors).merge(members)
}

async fn filter(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> AppResult<Json<Vec<CommentView>>> {
    Ok(Json(state.comments().filter(&query)?))
}

async fn for_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<Vec<CommentView>>> {
    Ok(Json(state.comments().for_post(post_id)?))
}

async fn show(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Json<CommentView>> {
    Ok(Json(state.comments().find(post_id, comment_id)?))
}

async fn replies(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<Json<Vec<CommentView>>> {
    Ok(Json(state.comments().replies(post_id, comment_id)?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(body): Json<NewComment>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    let comment = state.comments().create(post_id, user.id, None, &body)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn reply(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<NewComment>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    let comment = state
        .comments()
        .create(post_id, user.id, Some(comment_id), &body)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<NewComment>,
) -> AppResult<Json<CommentView>> {
    let comments = state.comments();
    user.ensure_can_modify(comments.find(post_id, comment_id)?.user_id)?;
    Ok(Json(comments.update(comment_id, &body)?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    let comments = state.comments();
    user.ensure_can_modify(comments.find(post_id, comment_id)?.user_id)?;
    comments.delete(comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
