use super::password;
use super::{UserDirectory, UserRegistry};
use crate::db::input::Registration;
use crate::db::models::UserProfile;
use crate::error::{AppError, AppResult};

/// Checks `username:password` credentials against a user directory.
pub struct Authenticator<D> {
    directory: D,
    bcrypt_cost: u32,
}

/// Splits `username:password`. Anything other than exactly two parts with a
/// non-empty username is rejected.
pub fn split_credentials(credentials: &str) -> AppResult<(&str, &str)> {
    let mut parts = credentials.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(username), Some(password), None) if !username.is_empty() => {
            Ok((username, password))
        }
        _ => Err(AppError::InvalidCredentials),
    }
}

impl<D: UserDirectory> Authenticator<D> {
    pub fn new(directory: D, bcrypt_cost: u32) -> Self {
        Self {
            directory,
            bcrypt_cost,
        }
    }

    pub fn authenticate(&self, credentials: &str) -> AppResult<UserProfile> {
        let (username, candidate) = split_credentials(credentials)?;

        let user = match self.directory.user_by_username(username) {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                tracing::info!(username, "Login failed: unknown user");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };
        if !password::verify(candidate, &user.password_hash) {
            tracing::info!(username, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, "Login succeeded");
        Ok(user.profile())
    }

    /// False for an unknown user as well as for a wrong password.
    pub fn verify_password(&self, username: &str, candidate: &str) -> AppResult<bool> {
        match self.directory.user_by_username(username) {
            Ok(user) => Ok(password::verify(candidate, &user.password_hash)),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<D: UserRegistry> Authenticator<D> {
    pub fn register(&self, registration: &Registration) -> AppResult<UserProfile> {
        registration.validate()?;
        let hash = password::hash_password(&registration.password, self.bcrypt_cost)?;
        let user = self.directory.insert_user(registration, &hash)?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::User;
    use chrono::Utc;
    use std::cell::Cell;

    /// In-memory directory that counts lookups.
    struct FakeDirectory {
        users: Vec<User>,
        lookups: Cell<usize>,
    }

    impl FakeDirectory {
        fn with(username: &str, password: &str) -> Self {
            let user = User {
                id: 1,
                username: username.into(),
                password_hash: password::hash_password(password, 4).unwrap(),
                first_name: None,
                last_name: None,
                email: None,
                phone_number: None,
                profile_picture_url: "/images/default.jpg".into(),
                is_admin: false,
                is_blocked: false,
                created_at: Utc::now(),
                deleted_at: None,
            };
            Self {
                users: vec![user],
                lookups: Cell::new(0),
            }
        }
    }

    impl UserDirectory for FakeDirectory {
        fn user_by_id(&self, id: i64) -> AppResult<User> {
            self.lookups.set(self.lookups.get() + 1);
            self.users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or_else(|| AppError::not_found("User", id))
        }

        fn user_by_username(&self, username: &str) -> AppResult<User> {
            self.lookups.set(self.lookups.get() + 1);
            self.users
                .iter()
                .find(|u| u.username == username)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("User {username} not found.")))
        }
    }

    fn auth() -> Authenticator<FakeDirectory> {
        Authenticator::new(FakeDirectory::with("alice", "correct-horse"), 4)
    }

    #[test]
    fn split_accepts_exactly_two_parts() {
        assert_eq!(split_credentials("alice:pw").unwrap(), ("alice", "pw"));
        assert_eq!(split_credentials("alice:").unwrap(), ("alice", ""));
        for bad in ["alice", "", ":pw", "alice:pw:extra", "a:b:c:d"] {
            assert!(
                matches!(split_credentials(bad), Err(AppError::InvalidCredentials)),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn malformed_credentials_never_reach_the_directory() {
        let auth = auth();
        for bad in ["alice", "alice:pw:extra", ":pw"] {
            assert!(matches!(
                auth.authenticate(bad),
                Err(AppError::InvalidCredentials)
            ));
        }
        assert_eq!(auth.directory.lookups.get(), 0);
    }

    #[test]
    fn correct_password_returns_profile() {
        let profile = auth().authenticate("alice:correct-horse").unwrap();
        assert_eq!(profile.username, "alice");
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        assert!(matches!(
            auth().authenticate("alice:wrongpw"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn unknown_user_is_invalid_credentials_not_not_found() {
        assert!(matches!(
            auth().authenticate("mallory:whatever"),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn verify_password_contract() {
        let auth = auth();
        assert!(auth.verify_password("alice", "correct-horse").unwrap());
        assert!(!auth.verify_password("alice", "nope").unwrap());
        assert!(!auth.verify_password("nobody", "correct-horse").unwrap());
    }
}
