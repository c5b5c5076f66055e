//! Request authorization gate.
//!
//! Routes that need an identity are wrapped with [`authorize`] through
//! `axum::middleware::from_fn_with_state`, carrying a [`Gate`] with the
//! route's [`AccessPolicy`]. On success the resolved [`CurrentUser`] is put in
//! the request extensions; every rejection ends the request before the
//! handler runs.

use axum::extract::{OriginalUri, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};

use super::cookies::{bearer_token, cookie_value, return_url_cookie};
use super::token::TokenService;
use super::UserDirectory;
use crate::error::{AppError, BLOCKED_MESSAGE};
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub require_admin: bool,
    pub check_if_blocked: bool,
}

impl AccessPolicy {
    /// Any signed-in user.
    pub const MEMBER: AccessPolicy = AccessPolicy {
        require_admin: false,
        check_if_blocked: false,
    };

    /// Signed-in and not blocked. Guards content creation.
    pub const ACTIVE_MEMBER: AccessPolicy = AccessPolicy {
        require_admin: false,
        check_if_blocked: true,
    };

    pub const ADMIN: AccessPolicy = AccessPolicy {
        require_admin: true,
        check_if_blocked: false,
    };
}

#[derive(Debug)]
pub enum Denial {
    Unauthorized,
    Blocked,
    Error(AppError),
}

/// Decides whether the request may proceed under `policy`.
///
/// The token comes from the bearer header, else from the `jwt_cookie` cookie.
/// Admin status needs both the role claim and the stored flag, so a demoted
/// admin loses access before their token expires.
pub fn resolve<D: UserDirectory>(
    headers: &HeaderMap,
    tokens: &TokenService,
    users: &D,
    policy: AccessPolicy,
    jwt_cookie: &str,
) -> Result<CurrentUser, Denial> {
    let token = bearer_token(headers)
        .or_else(|| cookie_value(headers, jwt_cookie))
        .ok_or(Denial::Unauthorized)?;

    let claims = tokens.decode(token).ok_or(Denial::Unauthorized)?;
    let user_id = claims.user_id().ok_or(Denial::Unauthorized)?;

    let user = match users.user_by_id(user_id) {
        Ok(user) => user,
        Err(AppError::NotFound(_)) => return Err(Denial::Unauthorized),
        Err(e) => return Err(Denial::Error(e)),
    };

    let is_admin = claims.is_admin() && user.is_admin;
    if policy.require_admin && !is_admin {
        return Err(Denial::Unauthorized);
    }
    if policy.check_if_blocked && user.is_blocked {
        return Err(Denial::Blocked);
    }

    Ok(CurrentUser {
        id: user.id,
        username: user.username,
        is_admin,
        is_blocked: user.is_blocked,
    })
}

pub fn is_api_request(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Middleware state: the app plus the policy of the routes it wraps.
#[derive(Clone)]
pub struct Gate {
    state: AppState,
    policy: AccessPolicy,
}

impl Gate {
    pub fn new(state: &AppState, policy: AccessPolicy) -> Self {
        Self {
            state: state.clone(),
            policy,
        }
    }
}

pub async fn authorize(State(gate): State<Gate>, mut req: Request, next: Next) -> Response {
    let users = gate.state.users();
    let outcome = resolve(
        req.headers(),
        &gate.state.tokens,
        &users,
        gate.policy,
        &gate.state.config.auth.jwt_cookie,
    );

    match outcome {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(denial) => reject(&gate.state, &req, denial),
    }
}

fn reject(state: &AppState, req: &Request, denial: Denial) -> Response {
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| req.uri().clone());
    let path = uri.path();

    match denial {
        Denial::Error(e) => e.into_response(),
        Denial::Unauthorized if is_api_request(path) => {
            tracing::debug!(path, "Rejected unauthorized API request");
            AppError::Unauthorized.into_response()
        }
        Denial::Blocked if is_api_request(path) => {
            tracing::info!(path, "Rejected API request from blocked user");
            AppError::Blocked.into_response()
        }
        Denial::Unauthorized => {
            let return_to = uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or(path);
            let cookie = return_url_cookie(
                &state.config.auth.return_url_cookie,
                return_to,
                state.config.auth.return_url_max_age_secs,
            );
            tracing::debug!(path, "Redirecting unauthorized request to login");
            (
                AppendHeaders([(header::SET_COOKIE, cookie)]),
                Redirect::to(LOGIN_PATH),
            )
                .into_response()
        }
        Denial::Blocked => {
            tracing::info!(path, "Rejected request from blocked user");
            (StatusCode::FORBIDDEN, BLOCKED_MESSAGE).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::db::models::User;
    use crate::error::AppResult;
    use axum::http::HeaderValue;
    use chrono::{Duration, Utc};

    struct Directory(Vec<User>);

    impl UserDirectory for Directory {
        fn user_by_id(&self, id: i64) -> AppResult<User> {
            self.0
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or_else(|| AppError::not_found("User", id))
        }

        fn user_by_username(&self, username: &str) -> AppResult<User> {
            self.0
                .iter()
                .find(|u| u.username == username)
                .cloned()
                .ok_or_else(|| AppError::NotFound(username.to_string()))
        }
    }

    fn user(id: i64, username: &str, is_admin: bool, is_blocked: bool) -> User {
        User {
            id,
            username: username.into(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            email: None,
            phone_number: None,
            profile_picture_url: "/images/default.jpg".into(),
            is_admin,
            is_blocked,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(&JwtConfig {
            key: "gate-test-signing-key-0123456789abcdef".into(),
            ..JwtConfig::default()
        })
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn check(
        headers: &HeaderMap,
        directory: &Directory,
        policy: AccessPolicy,
    ) -> Result<CurrentUser, Denial> {
        resolve(headers, &tokens(), directory, policy, "jwt")
    }

    #[test]
    fn no_token_is_unauthorized() {
        let dir = Directory(vec![user(1, "alice", false, false)]);
        assert!(matches!(
            check(&HeaderMap::new(), &dir, AccessPolicy::MEMBER),
            Err(Denial::Unauthorized)
        ));
    }

    #[test]
    fn bearer_and_cookie_both_work() {
        let alice = user(1, "alice", false, false);
        let dir = Directory(vec![alice.clone()]);
        let token = tokens().issue(&alice.profile()).unwrap();

        let current = check(&bearer(&token), &dir, AccessPolicy::MEMBER).unwrap();
        assert_eq!(current.id, 1);
        assert_eq!(current.username, "alice");

        let mut cookie = HeaderMap::new();
        cookie.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("jwt={token}")).unwrap(),
        );
        assert!(check(&cookie, &dir, AccessPolicy::MEMBER).is_ok());
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let alice = user(1, "alice", false, false);
        let dir = Directory(vec![alice.clone()]);
        let token = tokens()
            .issue_at(&alice.profile(), Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(matches!(
            check(&bearer(&token), &dir, AccessPolicy::MEMBER),
            Err(Denial::Unauthorized)
        ));
    }

    #[test]
    fn unknown_user_is_unauthorized() {
        let alice = user(1, "alice", false, false);
        let token = tokens().issue(&alice.profile()).unwrap();
        assert!(matches!(
            check(&bearer(&token), &Directory(vec![]), AccessPolicy::MEMBER),
            Err(Denial::Unauthorized)
        ));
    }

    #[test]
    fn non_admin_cannot_pass_admin_policy() {
        let alice = user(1, "alice", false, false);
        let dir = Directory(vec![alice.clone()]);
        let token = tokens().issue(&alice.profile()).unwrap();
        assert!(matches!(
            check(&bearer(&token), &dir, AccessPolicy::ADMIN),
            Err(Denial::Unauthorized)
        ));
    }

    #[test]
    fn demoted_admin_with_old_token_is_not_admin() {
        let was_admin = user(1, "alice", true, false);
        let token = tokens().issue(&was_admin.profile()).unwrap();
        let dir = Directory(vec![user(1, "alice", false, false)]);

        assert!(matches!(
            check(&bearer(&token), &dir, AccessPolicy::ADMIN),
            Err(Denial::Unauthorized)
        ));
        let member = check(&bearer(&token), &dir, AccessPolicy::MEMBER).unwrap();
        assert!(!member.is_admin);
    }

    #[test]
    fn admin_passes_admin_policy() {
        let admin = user(1, "root", true, false);
        let dir = Directory(vec![admin.clone()]);
        let token = tokens().issue(&admin.profile()).unwrap();
        assert!(check(&bearer(&token), &dir, AccessPolicy::ADMIN)
            .unwrap()
            .is_admin);
    }

    #[test]
    fn blocked_user_only_stopped_when_checked() {
        let bob = user(2, "bob", false, true);
        let dir = Directory(vec![bob.clone()]);
        let token = tokens().issue(&bob.profile()).unwrap();

        assert!(matches!(
            check(&bearer(&token), &dir, AccessPolicy::ACTIVE_MEMBER),
            Err(Denial::Blocked)
        ));
        assert!(check(&bearer(&token), &dir, AccessPolicy::MEMBER)
            .unwrap()
            .is_blocked);
    }

    #[test]
    fn api_paths() {
        assert!(is_api_request("/api"));
        assert!(is_api_request("/api/posts"));
        assert!(!is_api_request("/apiary"));
        assert!(!is_api_request("/posts"));
    }
}
