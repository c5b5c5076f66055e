use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::auth::gate::{authorize, AccessPolicy, Gate};
use crate::db::input::{CountQuery, NewPost, PostQuery, PostUpdate, TopQuery};
use crate::db::models::{Page, PostView};
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/posts", get(list))
        .route("/api/posts/top", get(top))
        .route("/api/posts/recent", get(recent))
        .route("/api/posts/user/{user_id}", get(by_user))
        .route("/api/posts/{post_id}", get(show));

    let authors = Router::new()
        .route("/api/posts", post(create))
        .route("/api/posts/{post_id}", put(update))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::ACTIVE_MEMBER),
            authorize,
        ));

    let members = Router::new()
        .route("/api/posts/{post_id}", delete(remove))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::MEMBER),
            authorize,
        ));

    public.merge(authors).merge(members)
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> AppResult<Json<Page<PostView>>> {
    Ok(Json(state.posts().list(&query)?))
}

async fn top(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(state.posts().top(query.count, query.by)?))
}

async fn recent(
    State(state): State<AppState>,
    Query(query): Query<CountQuery>,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(state.posts().recent(query.count)?))
}

async fn by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(state.posts().by_user(user_id)?))
}

async fn show(State(state): State<AppState>, Path(post_id): Path<i64>) -> AppResult<Json<PostView>> {
    Ok(Json(state.posts().find(post_id)?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<NewPost>,
) -> AppResult<(StatusCode, Json<PostView>)> {
    let post = state.posts().create(user.id, &body)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Json(body): Json<PostUpdate>,
) -> AppResult<Json<PostView>> {
    let posts = state.posts();
    user.ensure_can_modify(posts.find(post_id)?.user_id)?;
    Ok(Json(posts.update(post_id, &body)?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<StatusCode> {
    let posts = state.posts();
    user.ensure_can_modify(posts.find(post_id)?.user_id)?;
    posts.delete(post_id)?;
    Ok(StatusCode::NO_CONTENT)
}
