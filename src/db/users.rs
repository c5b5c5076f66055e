use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};

use super::cascade::{self, CascadeReport, DeleteTarget};
use super::contains_pattern;
use super::input::{ProfileUpdate, Registration, UserQuery};
use super::models::{User, UserProfile};
use super::visibility::user_live;
use crate::auth::{UserDirectory, UserRegistry};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

/// Live user by id on an existing connection.
pub(crate) fn live_user(conn: &Connection, id: i64) -> AppResult<User> {
    conn.query_row(
        &format!(
            "SELECT {} FROM users u WHERE u.id = ?1 AND {}",
            User::COLUMNS,
            user_live("u")
        ),
        params![id],
        User::from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("User", id))
}

fn username_taken(conn: &Connection, username: &str) -> AppResult<bool> {
    let taken = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;
    Ok(taken)
}

fn email_taken(conn: &Connection, email: &str, except: Option<i64>) -> AppResult<bool> {
    let taken = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1 AND (?2 IS NULL OR id <> ?2)",
        params![email, except],
        |row| row.get(0),
    )?;
    Ok(taken)
}

fn duplicate_email(email: &str) -> AppError {
    AppError::Duplicate {
        field: "email",
        message: format!("Email {email} is already registered."),
    }
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn list(&self) -> AppResult<Vec<UserProfile>> {
        self.search(&UserQuery::default())
    }

    pub fn search(&self, query: &UserQuery) -> AppResult<Vec<UserProfile>> {
        let conn = self.pool.get()?;

        let mut sql = format!(
            "SELECT {} FROM users u WHERE {}",
            User::COLUMNS,
            user_live("u")
        );
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(username) = &query.username {
            sql.push_str(" AND u.username LIKE ? ESCAPE '\\'");
            values.push(Box::new(contains_pattern(username)));
        }
        if let Some(email) = &query.email {
            sql.push_str(" AND u.email LIKE ? ESCAPE '\\'");
            values.push(Box::new(contains_pattern(email)));
        }
        if let Some(is_admin) = query.is_admin {
            sql.push_str(" AND u.is_admin = ?");
            values.push(Box::new(is_admin));
        }
        if let Some(is_blocked) = query.is_blocked {
            sql.push_str(" AND u.is_blocked = ?");
            values.push(Box::new(is_blocked));
        }
        sql.push_str(" ORDER BY u.username");

        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(values.iter()), User::from_row)?
            .map(|row| row.map(|u| u.profile()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn update_profile(&self, id: i64, update: &ProfileUpdate) -> AppResult<UserProfile> {
        update.validate()?;
        let conn = self.pool.get()?;
        live_user(&conn, id)?;

        if let Some(email) = &update.email {
            if email_taken(&conn, email, Some(id))? {
                return Err(duplicate_email(email));
            }
        }

        conn.execute(
            "UPDATE users SET
                first_name = COALESCE(?1, first_name),
                last_name = COALESCE(?2, last_name),
                email = COALESCE(?3, email),
                phone_number = COALESCE(?4, phone_number),
                profile_picture_url = COALESCE(?5, profile_picture_url)
             WHERE id = ?6",
            params![
                update.first_name,
                update.last_name,
                update.email,
                update.phone_number,
                update.profile_picture_url,
                id
            ],
        )?;

        Ok(live_user(&conn, id)?.profile())
    }

    pub fn set_blocked(&self, id: i64, blocked: bool) -> AppResult<UserProfile> {
        let conn = self.pool.get()?;
        live_user(&conn, id)?;
        conn.execute(
            "UPDATE users SET is_blocked = ?1 WHERE id = ?2",
            params![blocked, id],
        )?;
        tracing::info!(user_id = id, blocked, "User block status changed");
        Ok(live_user(&conn, id)?.profile())
    }

    pub fn promote(&self, id: i64) -> AppResult<UserProfile> {
        self.set_admin(id, true)
    }

    pub fn demote(&self, id: i64) -> AppResult<UserProfile> {
        self.set_admin(id, false)
    }

    fn set_admin(&self, id: i64, admin: bool) -> AppResult<UserProfile> {
        let conn = self.pool.get()?;
        let user = live_user(&conn, id)?;
        if user.is_admin == admin {
            let state = if admin { "already" } else { "not" };
            return Err(AppError::BadRequest(format!(
                "User {} is {} an admin.",
                user.username, state
            )));
        }
        conn.execute(
            "UPDATE users SET is_admin = ?1 WHERE id = ?2",
            params![admin, id],
        )?;
        tracing::info!(user_id = id, admin, "User admin status changed");
        Ok(live_user(&conn, id)?.profile())
    }

    pub fn delete(&self, id: i64) -> AppResult<CascadeReport> {
        let mut conn = self.pool.get()?;
        cascade::soft_delete(&mut conn, DeleteTarget::User(id), Utc::now())
    }
}

impl UserDirectory for UserRepository {
    fn user_by_id(&self, id: i64) -> AppResult<User> {
        let conn = self.pool.get()?;
        live_user(&conn, id)
    }

    fn user_by_username(&self, username: &str) -> AppResult<User> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM users u WHERE u.username = ?1 AND {}",
                User::COLUMNS,
                user_live("u")
            ),
            params![username],
            User::from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("User {username} not found.")))
    }
}

impl UserRegistry for UserRepository {
    fn insert_user(&self, registration: &Registration, password_hash: &str) -> AppResult<User> {
        let conn = self.pool.get()?;

        if username_taken(&conn, &registration.username)? {
            return Err(AppError::Duplicate {
                field: "username",
                message: format!("Username {} is already taken.", registration.username),
            });
        }
        if let Some(email) = &registration.email {
            if email_taken(&conn, email, None)? {
                return Err(duplicate_email(email));
            }
        }

        conn.execute(
            "INSERT INTO users (username, password_hash, first_name, last_name, email, phone_number, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                registration.username,
                password_hash,
                registration.first_name,
                registration.last_name,
                registration.email,
                registration.phone_number,
                Utc::now()
            ],
        )?;

        live_user(&conn, conn.last_insert_rowid())
    }
}
