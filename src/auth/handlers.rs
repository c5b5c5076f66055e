use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use super::cookies::{clear_cookie, cookie_value, decode_return_url, session_cookie};
use super::gate::LOGIN_PATH;
use crate::db::input::Registration;
use crate::db::models::UserProfile;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Where a successful form login lands without a remembered return URL.
pub const DEFAULT_LANDING: &str = "/api/posts";

const LOGIN_FORM: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<form method="post" action="/auth/login">
  <label>Username <input name="username" autocomplete="username" required></label>
  <label>Password <input name="password" type="password" autocomplete="current-password" required></label>
  <button type="submit">Sign in</button>
</form>
</body>
</html>
"#;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    fn credentials(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- JSON API --

pub async fn api_register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let profile = state.authenticator().register(&registration)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn api_login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let profile = state.authenticator().authenticate(&body.credentials())?;
    let token = state.tokens.issue(&profile)?;
    Ok(Json(TokenResponse { token }))
}

// -- Interactive --

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_FORM)
}

pub async fn login_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(body): Form<LoginRequest>,
) -> Result<Response, AppError> {
    let profile = match state.authenticator().authenticate(&body.credentials()) {
        Ok(profile) => profile,
        Err(AppError::InvalidCredentials) => {
            return Ok((
                StatusCode::UNAUTHORIZED,
                AppError::InvalidCredentials.to_string(),
            )
                .into_response())
        }
        Err(e) => return Err(e),
    };
    let token = state.tokens.issue(&profile)?;

    let auth = &state.config.auth;
    let jwt = session_cookie(&auth.jwt_cookie, &token, state.config.jwt.expire_minutes * 60);

    let remembered = cookie_value(&headers, &auth.return_url_cookie);
    let target = remembered
        .and_then(decode_return_url)
        .unwrap_or_else(|| DEFAULT_LANDING.to_string());

    let response = if remembered.is_some() {
        (
            AppendHeaders([
                (header::SET_COOKIE, jwt),
                (header::SET_COOKIE, clear_cookie(&auth.return_url_cookie)),
            ]),
            Redirect::to(&target),
        )
            .into_response()
    } else {
        (
            AppendHeaders([(header::SET_COOKIE, jwt)]),
            Redirect::to(&target),
        )
            .into_response()
    };
    Ok(response)
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie(&state.config.auth.jwt_cookie))]),
        Redirect::to(LOGIN_PATH),
    )
}
