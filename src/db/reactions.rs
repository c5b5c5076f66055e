use chrono::Utc;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, ToSql, TransactionBehavior,
};

use super::cascade::{self, CascadeReport, DeleteTarget};
use super::comments::live_comment;
use super::input::{NewReaction, ReactionQuery};
use super::models::{ReactionSubject, ReactionType, ReactionView};
use super::posts::live_post;
use super::users::live_user;
use super::visibility::reaction_live;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Clone)]
pub struct ReactionRepository {
    pool: DbPool,
}

fn select_reactions() -> String {
    format!(
        "SELECT r.id, r.user_id, ru.username, r.reaction_type, rt.post_id, rt.comment_id, r.created_at
         FROM reactions r
         JOIN users ru ON ru.id = r.user_id
         JOIN reaction_targets rt ON rt.id = r.reaction_target_id
         WHERE {}",
        reaction_live("r")
    )
}

fn live_reaction(conn: &Connection, id: i64) -> AppResult<ReactionView> {
    conn.query_row(
        &format!("{} AND r.id = ?1", select_reactions()),
        params![id],
        ReactionView::from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Reaction", id))
}

/// The live target row for a subject, created on first use.
fn target_for(conn: &Connection, subject: ReactionSubject) -> AppResult<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM reaction_targets
             WHERE post_id IS ?1 AND comment_id IS ?2 AND deleted_at IS NULL",
            params![subject.post_id(), subject.comment_id()],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO reaction_targets (post_id, comment_id, created_at) VALUES (?1, ?2, ?3)",
        params![subject.post_id(), subject.comment_id(), Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

impl ReactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Adds a reaction, or changes the type of the user's existing one on the
    /// same post or comment.
    pub fn react(&self, user_id: i64, reaction: &NewReaction) -> AppResult<ReactionView> {
        let subject = ReactionSubject::from_ids(reaction.post_id, reaction.comment_id)?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        live_user(&tx, user_id)?;
        match subject {
            ReactionSubject::Post(id) => {
                live_post(&tx, id)?;
            }
            ReactionSubject::Comment(id) => {
                live_comment(&tx, id)?;
            }
        }

        let target_id = target_for(&tx, subject)?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM reactions
                 WHERE reaction_target_id = ?1 AND user_id = ?2 AND deleted_at IS NULL",
                params![target_id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE reactions SET reaction_type = ?1 WHERE id = ?2",
                    params![reaction.reaction_type, id],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO reactions (reaction_target_id, user_id, reaction_type, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![target_id, user_id, reaction.reaction_type, Utc::now()],
                )?;
                tx.last_insert_rowid()
            }
        };

        let view = live_reaction(&tx, id)?;
        tx.commit()?;
        Ok(view)
    }

    pub fn find(&self, id: i64) -> AppResult<ReactionView> {
        let conn = self.pool.get()?;
        live_reaction(&conn, id)
    }

    /// Reactions on one post or one comment.
    pub fn list(&self, query: &ReactionQuery) -> AppResult<Vec<ReactionView>> {
        let subject = ReactionSubject::from_ids(query.post_id, query.comment_id)?;
        let conn = self.pool.get()?;

        let mut sql = select_reactions();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        match subject {
            ReactionSubject::Post(id) => {
                sql.push_str(" AND rt.post_id = ?");
                values.push(Box::new(id));
            }
            ReactionSubject::Comment(id) => {
                sql.push_str(" AND rt.comment_id = ?");
                values.push(Box::new(id));
            }
        }
        if let Some(user_id) = query.user_id {
            sql.push_str(" AND r.user_id = ?");
            values.push(Box::new(user_id));
        }
        if let Some(reaction_type) = query.reaction_type {
            sql.push_str(" AND r.reaction_type = ?");
            values.push(Box::new(reaction_type));
        }
        sql.push_str(" ORDER BY r.created_at, r.id");

        let mut stmt = conn.prepare(&sql)?;
        let reactions = stmt
            .query_map(params_from_iter(values.iter()), ReactionView::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reactions)
    }

    pub fn update(&self, id: i64, reaction_type: ReactionType) -> AppResult<ReactionView> {
        let conn = self.pool.get()?;
        live_reaction(&conn, id)?;
        conn.execute(
            "UPDATE reactions SET reaction_type = ?1 WHERE id = ?2",
            params![reaction_type, id],
        )?;
        live_reaction(&conn, id)
    }

    pub fn delete(&self, id: i64) -> AppResult<CascadeReport> {
        let mut conn = self.pool.get()?;
        cascade::soft_delete(&mut conn, DeleteTarget::Reaction(id), Utc::now())
    }
}
