use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::auth::gate::{authorize, AccessPolicy, Gate};
use crate::auth::UserDirectory;
use crate::db::input::{ProfileUpdate, UserQuery};
use crate::db::models::UserProfile;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    // `{user}` is a username for reads and an id for writes.
    let public = Router::new()
        .route("/api/users", get(list))
        .route("/api/users/search", get(search))
        .route("/api/users/{user}", get(by_username));

    let members = Router::new()
        .route("/api/users/me", get(me))
        .route("/api/users/{user}", put(update).delete(remove))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::MEMBER),
            authorize,
        ));

    public.merge(members)
}

fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("'{raw}' is not a user id.")))
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<UserProfile>>> {
    Ok(Json(state.users().list()?))
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<UserProfile>>> {
    Ok(Json(state.users().search(&query)?))
}

async fn by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users().user_by_username(&username)?.profile()))
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users().user_by_id(user.id)?.profile()))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(raw): Path<String>,
    Json(body): Json<ProfileUpdate>,
) -> AppResult<Json<UserProfile>> {
    let id = parse_id(&raw)?;
    user.ensure_can_modify(id)?;
    Ok(Json(state.users().update_profile(id, &body)?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(raw): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&raw)?;
    user.ensure_can_modify(id)?;
    state.users().delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
