pub mod cookies;
pub mod credentials;
pub mod gate;
pub mod handlers;
pub mod password;
pub mod token;

use crate::db::input::Registration;
use crate::db::models::User;
use crate::error::AppResult;

/// Lookup of live users. Soft-deleted users are reported as `NotFound`.
pub trait UserDirectory {
    fn user_by_id(&self, id: i64) -> AppResult<User>;
    fn user_by_username(&self, username: &str) -> AppResult<User>;
}

/// Account creation. Uniqueness checks include soft-deleted users.
pub trait UserRegistry: UserDirectory {
    fn insert_user(&self, registration: &Registration, password_hash: &str) -> AppResult<User>;
}
