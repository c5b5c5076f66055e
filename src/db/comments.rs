use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, ToSql};

use super::cascade::{self, CascadeReport, DeleteTarget};
use super::input::{CommentQuery, NewComment};
use super::models::CommentView;
use super::posts::live_post;
use super::users::live_user;
use super::visibility::{comment_live, reaction_live};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Clone)]
pub struct CommentRepository {
    pool: DbPool,
}

fn select_comments() -> String {
    format!(
        "SELECT c.id, c.post_id, c.parent_comment_id, c.user_id, cu.username, c.content, c.created_at,
            (SELECT COUNT(*) FROM comments rc
              WHERE rc.parent_comment_id = c.id AND {replies}) AS reply_count,
            (SELECT COUNT(*) FROM reactions r
               JOIN reaction_targets rt ON rt.id = r.reaction_target_id
              WHERE rt.comment_id = c.id AND {reactions}) AS reaction_count
         FROM comments c
         JOIN users cu ON cu.id = c.user_id
         WHERE {comments}",
        replies = comment_live("rc"),
        reactions = reaction_live("r"),
        comments = comment_live("c"),
    )
}

pub(crate) fn live_comment(conn: &Connection, id: i64) -> AppResult<CommentView> {
    conn.query_row(
        &format!("{} AND c.id = ?1", select_comments()),
        params![id],
        CommentView::from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Comment", id))
}

fn query_comments<P: Params>(conn: &Connection, sql: &str, values: P) -> AppResult<Vec<CommentView>> {
    let mut stmt = conn.prepare(sql)?;
    let comments = stmt
        .query_map(values, CommentView::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

impl CommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn find_by_id(&self, id: i64) -> AppResult<CommentView> {
        let conn = self.pool.get()?;
        live_comment(&conn, id)
    }

    /// A live comment that belongs to `post_id`.
    pub fn find(&self, post_id: i64, id: i64) -> AppResult<CommentView> {
        let comment = self.find_by_id(id)?;
        if comment.post_id != post_id {
            return Err(AppError::not_found("Comment", id));
        }
        Ok(comment)
    }

    pub fn for_post(&self, post_id: i64) -> AppResult<Vec<CommentView>> {
        let conn = self.pool.get()?;
        live_post(&conn, post_id)?;
        let sql = format!(
            "{} AND c.post_id = ?1 ORDER BY c.created_at, c.id",
            select_comments()
        );
        query_comments(&conn, &sql, params![post_id])
    }

    pub fn replies(&self, post_id: i64, id: i64) -> AppResult<Vec<CommentView>> {
        let conn = self.pool.get()?;
        let parent = live_comment(&conn, id)?;
        if parent.post_id != post_id {
            return Err(AppError::not_found("Comment", id));
        }
        let sql = format!(
            "{} AND c.parent_comment_id = ?1 ORDER BY c.created_at, c.id",
            select_comments()
        );
        query_comments(&conn, &sql, params![id])
    }

    pub fn create(
        &self,
        post_id: i64,
        user_id: i64,
        parent_id: Option<i64>,
        comment: &NewComment,
    ) -> AppResult<CommentView> {
        comment.validate()?;
        let conn = self.pool.get()?;
        live_user(&conn, user_id)?;
        live_post(&conn, post_id)?;

        if let Some(parent_id) = parent_id {
            let parent = live_comment(&conn, parent_id)?;
            if parent.post_id != post_id {
                return Err(AppError::BadRequest(format!(
                    "Comment {parent_id} does not belong to post {post_id}."
                )));
            }
        }

        conn.execute(
            "INSERT INTO comments (post_id, parent_comment_id, user_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![post_id, parent_id, user_id, comment.content, Utc::now()],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(comment_id = id, post_id, user_id, "Comment created");

        live_comment(&conn, id)
    }

    pub fn update(&self, id: i64, update: &NewComment) -> AppResult<CommentView> {
        update.validate()?;
        let conn = self.pool.get()?;
        live_comment(&conn, id)?;
        conn.execute(
            "UPDATE comments SET content = ?1 WHERE id = ?2",
            params![update.content, id],
        )?;
        live_comment(&conn, id)
    }

    pub fn delete(&self, id: i64) -> AppResult<CascadeReport> {
        let mut conn = self.pool.get()?;
        cascade::soft_delete(&mut conn, DeleteTarget::Comment(id), Utc::now())
    }

    pub fn filter(&self, query: &CommentQuery) -> AppResult<Vec<CommentView>> {
        let conn = self.pool.get()?;

        let mut sql = select_comments();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(post_id) = query.post_id {
            sql.push_str(" AND c.post_id = ?");
            values.push(Box::new(post_id));
        }
        if let Some(user_id) = query.user_id {
            sql.push_str(" AND c.user_id = ?");
            values.push(Box::new(user_id));
        }
        if let Some(after) = query.created_after {
            sql.push_str(" AND c.created_at >= ?");
            values.push(Box::new(after));
        }
        if let Some(before) = query.created_before {
            sql.push_str(" AND c.created_at <= ?");
            values.push(Box::new(before));
        }
        sql.push_str(" ORDER BY c.created_at DESC, c.id DESC");

        query_comments(&conn, &sql, params_from_iter(values.iter()))
    }
}
