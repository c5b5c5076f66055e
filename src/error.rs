use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub const BLOCKED_MESSAGE: &str =
    "Your account has been blocked. You cannot add comments or create posts.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{}", BLOCKED_MESSAGE)]
    Blocked,

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Duplicate { field: &'static str, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{entity} with ID {id} not found."))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Blocked | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Duplicate { .. } => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Hash(_)
            | AppError::Token(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Duplicate { field, message } => json!({ "message": message, "field": field }),
            AppError::BadRequest(msg) => json!({ "message": msg }),
            _ if status.is_server_error() => {
                tracing::error!("{}", self);
                json!({ "message": "Internal server error" })
            }
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            response_status(AppError::not_found("Post", 9)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        assert_eq!(
            AppError::not_found("Comment", 14).to_string(),
            "Comment with ID 14 not found."
        );
    }

    #[test]
    fn unauthorized_and_invalid_credentials_return_401() {
        assert_eq!(
            response_status(AppError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            response_status(AppError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn blocked_is_forbidden_not_unauthorized() {
        assert_eq!(response_status(AppError::Blocked), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Blocked.to_string(), BLOCKED_MESSAGE);
    }

    #[test]
    fn duplicate_returns_409() {
        let err = AppError::Duplicate {
            field: "username",
            message: "Username alice is already taken.".into(),
        };
        assert_eq!(response_status(err), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
