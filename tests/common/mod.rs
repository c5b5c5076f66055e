//! Shared setup for the integration tests: an in-memory app and helpers to
//! drive it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use forum::config::{Config, JwtConfig};
use forum::db;
use forum::db::input::Registration;
use forum::db::models::UserProfile;
use forum::state::AppState;

pub const JWT_KEY: &str = "integration-test-signing-key-0123456789";

pub fn test_state() -> AppState {
    let pool = db::create_memory_pool().unwrap();
    db::run_migrations(&pool).unwrap();

    let mut config = Config::default();
    config.jwt = JwtConfig {
        key: JWT_KEY.to_string(),
        ..JwtConfig::default()
    };
    config.auth.bcrypt_cost = 4;
    config.validate().unwrap();

    AppState::new(pool, config)
}

pub fn test_app() -> (AppState, Router) {
    let state = test_state();
    let app = forum::routes::app(state.clone());
    (state, app)
}

pub fn register(state: &AppState, username: &str, password: &str) -> UserProfile {
    state
        .authenticator()
        .register(&Registration {
            username: username.to_string(),
            password: password.to_string(),
            email: Some(format!("{username}@example.com")),
            first_name: None,
            last_name: None,
            phone_number: None,
        })
        .unwrap()
}

pub fn register_admin(state: &AppState, username: &str) -> UserProfile {
    let user = register(state, username, "admin-pass");
    state.users().promote(user.id).unwrap()
}

pub fn token(state: &AppState, user: &UserProfile) -> String {
    state.tokens.issue(user).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub const POST_CONTENT: &str = "This post body is long enough to pass validation easily.";
