//! Request payloads and query-string filters accepted by the repositories.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::models::{PostCategory, ReactionType};
use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TOP_COUNT: u32 = 10;

fn check_len(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be between {min} and {max} characters."
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl Registration {
    pub fn validate(&self) -> AppResult<()> {
        check_len("Username", &self.username, 4, 32)?;
        check_len("Password", &self.password, 4, 32)?;
        // Credentials travel as "username:password".
        if self.username.contains(':') || self.password.contains(':') {
            return Err(AppError::BadRequest(
                "Username and password must not contain ':'.".into(),
            ));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(AppError::BadRequest("Email is not valid.".into()));
            }
        }
        Ok(())
    }
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_picture_url: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(AppError::BadRequest("Email is not valid.".into()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub image_url: Option<String>,
}

impl NewPost {
    pub fn validate(&self) -> AppResult<()> {
        check_len("Title", &self.title, 16, 64)?;
        check_len("Content", &self.content, 32, 8192)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<PostCategory>,
    pub image_url: Option<String>,
}

impl PostUpdate {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            check_len("Title", title, 16, 64)?;
        }
        if let Some(content) = &self.content {
            check_len("Content", content, 32, 8192)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> AppResult<()> {
        check_len("Content", &self.content, 10, 8192)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReaction {
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub reaction_type: ReactionType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionUpdate {
    pub reaction_type: ReactionType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSort {
    #[default]
    CreatedAt,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    pub title: Option<String>,
    pub username: Option<String>,
    pub category: Option<PostCategory>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort_by: PostSort,
    #[serde(default)]
    pub sort_order: SortOrder,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PostQuery {
    /// 1-based page, at least 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page()) - 1) * i64::from(self.page_size())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentQuery {
    pub post_id: Option<i64>,
    pub user_id: Option<i64>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReactionQuery {
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub user_id: Option<i64>,
    pub reaction_type: Option<ReactionType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub is_blocked: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopBy {
    #[default]
    Comments,
    Reactions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopQuery {
    pub count: Option<u32>,
    #[serde(default)]
    pub by: TopBy,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountQuery {
    pub count: Option<u32>,
}

pub fn clamp_count(count: Option<u32>) -> u32 {
    count.unwrap_or(DEFAULT_TOP_COUNT).clamp(1, MAX_PAGE_SIZE)
}
