//! The single entry point for deletes. Nothing is ever removed: rows get a
//! `deleted_at` stamp and the visibility predicates hide them from reads.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::Serialize;

use super::visibility;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    User(i64),
    Post(i64),
    Comment(i64),
    Reaction(i64),
}

impl DeleteTarget {
    fn table(&self) -> &'static str {
        match self {
            DeleteTarget::User(_) => "users",
            DeleteTarget::Post(_) => "posts",
            DeleteTarget::Comment(_) => "comments",
            DeleteTarget::Reaction(_) => "reactions",
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            DeleteTarget::User(_) => "User",
            DeleteTarget::Post(_) => "Post",
            DeleteTarget::Comment(_) => "Comment",
            DeleteTarget::Reaction(_) => "Reaction",
        }
    }

    fn id(&self) -> i64 {
        match self {
            DeleteTarget::User(id)
            | DeleteTarget::Post(id)
            | DeleteTarget::Comment(id)
            | DeleteTarget::Reaction(id) => *id,
        }
    }

    fn live_predicate(&self) -> String {
        match self {
            DeleteTarget::User(_) => visibility::user_live("t"),
            DeleteTarget::Post(_) => visibility::post_live("t"),
            DeleteTarget::Comment(_) => visibility::comment_live("t"),
            DeleteTarget::Reaction(_) => visibility::reaction_live("t"),
        }
    }
}

/// Rows stamped by one delete, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub users: usize,
    pub posts: usize,
    pub comments: usize,
    pub reactions: usize,
    pub reaction_targets: usize,
}

pub fn soft_delete(
    conn: &mut Connection,
    target: DeleteTarget,
    at: DateTime<Utc>,
) -> AppResult<CascadeReport> {
    // Take the write lock up front so concurrent deleters wait on busy_timeout.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let live: bool = tx.query_row(
        &format!(
            "SELECT COUNT(*) > 0 FROM {} t WHERE t.id = ?1 AND {}",
            target.table(),
            target.live_predicate()
        ),
        params![target.id()],
        |row| row.get(0),
    )?;
    if !live {
        return Err(AppError::not_found(target.entity(), target.id()));
    }

    let report = match target {
        DeleteTarget::User(id) => stamp_user(&tx, id, at)?,
        DeleteTarget::Post(id) => CascadeReport {
            posts: stamp_row(&tx, "posts", id, at)?,
            ..Default::default()
        },
        DeleteTarget::Comment(id) => CascadeReport {
            comments: stamp_row(&tx, "comments", id, at)?,
            ..Default::default()
        },
        DeleteTarget::Reaction(id) => CascadeReport {
            reactions: stamp_row(&tx, "reactions", id, at)?,
            ..Default::default()
        },
    };

    tx.commit()?;

    tracing::info!(
        entity = target.entity(),
        id = target.id(),
        users = report.users,
        posts = report.posts,
        comments = report.comments,
        reactions = report.reactions,
        reaction_targets = report.reaction_targets,
        "Soft delete applied"
    );
    Ok(report)
}

fn stamp_row(tx: &Transaction<'_>, table: &str, id: i64, at: DateTime<Utc>) -> AppResult<usize> {
    let n = tx.execute(
        &format!("UPDATE {table} SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL"),
        params![at, id],
    )?;
    Ok(n)
}

fn stamp_user(tx: &Transaction<'_>, user_id: i64, at: DateTime<Utc>) -> AppResult<CascadeReport> {
    // Targets first: they are found through the user's posts and comments,
    // whichever state those are in.
    let reaction_targets = tx.execute(
        "UPDATE reaction_targets SET deleted_at = ?1
         WHERE deleted_at IS NULL
           AND (post_id IN (SELECT id FROM posts WHERE user_id = ?2)
                OR comment_id IN (SELECT id FROM comments WHERE user_id = ?2))",
        params![at, user_id],
    )?;

    let posts = tx.execute(
        "UPDATE posts SET deleted_at = ?1 WHERE user_id = ?2 AND deleted_at IS NULL",
        params![at, user_id],
    )?;
    let comments = tx.execute(
        "UPDATE comments SET deleted_at = ?1 WHERE user_id = ?2 AND deleted_at IS NULL",
        params![at, user_id],
    )?;
    let reactions = tx.execute(
        "UPDATE reactions SET deleted_at = ?1 WHERE user_id = ?2 AND deleted_at IS NULL",
        params![at, user_id],
    )?;
    let users = stamp_row(tx, "users", user_id, at)?;

    Ok(CascadeReport {
        users,
        posts,
        comments,
        reactions,
        reaction_targets,
    })
}
