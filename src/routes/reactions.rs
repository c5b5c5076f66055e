use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::auth::gate::{authorize, AccessPolicy, Gate};
use crate::db::input::{NewReaction, ReactionQuery, ReactionUpdate};
use crate::db::models::ReactionView;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/reactions", get(list))
        .route("/api/reactions/{reaction_id}", get(show));

    let members = Router::new()
        .route("/api/reactions", post(react))
        .route("/api/reactions/{reaction_id}", put(update).delete(remove))
        .route_layer(middleware::from_fn_with_state(
            Gate::new(state, AccessPolicy::MEMBER),
            authorize,
        ));

    public.merge(members)
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReactionQuery>,
) -> AppResult<Json<Vec<ReactionView>>> {
    Ok(Json(state.reactions().list(&query)?))
}

async fn show(
    State(state): State<AppState>,
    Path(reaction_id): Path<i64>,
) -> AppResult<Json<ReactionView>> {
    Ok(Json(state.reactions().find(reaction_id)?))
}

async fn react(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<NewReaction>,
) -> AppResult<(StatusCode, Json<ReactionView>)> {
    let reaction = state.reactions().react(user.id, &body)?;
    Ok((StatusCode::CREATED, Json(reaction)))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reaction_id): Path<i64>,
    Json(body): Json<ReactionUpdate>,
) -> AppResult<Json<ReactionView>> {
    let reactions = state.reactions();
    user.ensure_can_modify(reactions.find(reaction_id)?.user_id)?;
    Ok(Json(reactions.update(reaction_id, body.reaction_type)?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(reaction_id): Path<i64>,
) -> AppResult<StatusCode> {
    let reactions = state.reactions();
    user.ensure_can_modify(reactions.find(reaction_id)?.user_id)?;
    reactions.delete(reaction_id)?;
    Ok(StatusCode::NO_CONTENT)
}
