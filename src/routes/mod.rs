pub mod admin;
pub mod auth;
pub mod comments;
pub mod posts;
pub mod reactions;
pub mod users;
pub mod web;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application: JSON API under `/api` plus the form endpoints.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(posts::router(&state))
        .merge(comments::router(&state))
        .merge(reactions::router(&state))
        .merge(users::router(&state))
        .merge(admin::router(&state))
        .merge(web::router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
