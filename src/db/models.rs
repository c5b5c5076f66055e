use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Enums stored as their variant name in a TEXT column.
macro_rules! text_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| {
                        AppError::BadRequest(format!(
                            "Unknown {} '{}'",
                            stringify!($name),
                            s
                        ))
                    })
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse()
                    .map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_enum!(PostCategory {
    Story,
    Question,
    Discussion,
    Announcement,
});

text_enum!(ReactionType {
    Like,
    Dislike,
    Laugh,
    Food,
    Glasses,
    Gossip,
    Knitting,
});

/// A stored account. Never serialized directly: it carries the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_url: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub const COLUMNS: &'static str = "u.id, u.username, u.password_hash, u.first_name, \
        u.last_name, u.email, u.phone_number, u.profile_picture_url, u.is_admin, \
        u.is_blocked, u.created_at, u.deleted_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            email: row.get(5)?,
            phone_number: row.get(6)?,
            profile_picture_url: row.get(7)?,
            is_admin: row.get(8)?,
            is_blocked: row.get(9)?,
            created_at: row.get(10)?,
            deleted_at: row.get(11)?,
        })
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// The identity projection handed out by authentication and the user API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_url: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            profile_picture_url: user.profile_picture_url.clone(),
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub comment_count: i64,
    pub reaction_count: i64,
}

impl PostView {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PostView {
            id: row.get(0)?,
            user_id: row.get(1)?,
            username: row.get(2)?,
            title: row.get(3)?,
            content: row.get(4)?,
            category: row.get(5)?,
            image_url: row.get(6)?,
            created_at: row.get(7)?,
            comment_count: row.get(8)?,
            reaction_count: row.get(9)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub reply_count: i64,
    pub reaction_count: i64,
}

impl CommentView {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CommentView {
            id: row.get(0)?,
            post_id: row.get(1)?,
            parent_comment_id: row.get(2)?,
            user_id: row.get(3)?,
            username: row.get(4)?,
            content: row.get(5)?,
            created_at: row.get(6)?,
            reply_count: row.get(7)?,
            reaction_count: row.get(8)?,
        })
    }
}

/// What a reaction is attached to. Exactly one of post or comment, by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionSubject {
    Post(i64),
    Comment(i64),
}

impl ReactionSubject {
    pub fn from_ids(post_id: Option<i64>, comment_id: Option<i64>) -> Result<Self, AppError> {
        match (post_id, comment_id) {
            (Some(post), None) => Ok(ReactionSubject::Post(post)),
            (None, Some(comment)) => Ok(ReactionSubject::Comment(comment)),
            _ => Err(AppError::BadRequest(
                "Exactly one of post_id or comment_id must be provided.".into(),
            )),
        }
    }

    pub fn post_id(&self) -> Option<i64> {
        match self {
            ReactionSubject::Post(id) => Some(*id),
            ReactionSubject::Comment(_) => None,
        }
    }

    pub fn comment_id(&self) -> Option<i64> {
        match self {
            ReactionSubject::Comment(id) => Some(*id),
            ReactionSubject::Post(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub reaction_type: ReactionType,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl ReactionView {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ReactionView {
            id: row.get(0)?,
            user_id: row.get(1)?,
            username: row.get(2)?,
            reaction_type: row.get(3)?,
            post_id: row.get(4)?,
            comment_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}
