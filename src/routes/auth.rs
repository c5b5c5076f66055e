use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(handlers::api_register))
        .route("/api/auth/login", post(handlers::api_login))
        .route(
            "/auth/login",
            get(handlers::login_page).post(handlers::login_form),
        )
        .route("/auth/logout", get(handlers::logout).post(handlers::logout))
}
