use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::auth::gate::{authorize, AccessPolicy, Gate};
use crate::auth::UserDirectory;
use crate::db::cascade::CascadeReport;
use crate::db::input::Registration;
use crate::db::models::UserProfile;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list).post(create))
        .route("/api/admin/users/{id}", get(show).delete(remove))
        .route("/api/admin/users/{id}/block", put(block))
        .route("/api/admin/users/{id}/unblock", put(unblock))
        .route("/api/admin/users/{id}/promote", put(promote))
        .route("/api/admin/users/{id}/demote", put(demote))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::ADMIN),
            authorize,
        ))
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<UserProfile>>> {
    Ok(Json(state.users().list()?))
}

async fn create(
    State(state): State<AppState>,
    admin: CurrentUser,
    Json(registration): Json<Registration>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = state.authenticator().register(&registration)?;
    tracing::info!(admin = %admin.username, user_id = profile.id, "Admin created user");
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users().user_by_id(id)?.profile()))
}

async fn remove(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<CascadeReport>> {
    let report = state.users().delete(id)?;
    tracing::info!(admin = %admin.username, user_id = id, "Admin deleted user");
    Ok(Json(report))
}

async fn block(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users().set_blocked(id, true)?))
}

async fn unblock(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users().set_blocked(id, false)?))
}

async fn promote(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users().promote(id)?))
}

async fn demote(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.users().demote(id)?))
}
