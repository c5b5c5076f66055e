use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Params, ToSql};

use super::cascade::{self, CascadeReport, DeleteTarget};
use super::contains_pattern;
use super::input::{clamp_count, NewPost, PostQuery, PostSort, PostUpdate, TopBy};
use super::models::{Page, PostView};
use super::users::live_user;
use super::visibility::{comment_live, post_live, reaction_live};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Clone)]
pub struct PostRepository {
    pool: DbPool,
}

/// Live posts with their author and live comment/reaction counts.
fn select_posts() -> String {
    format!(
        "SELECT p.id, p.user_id, pu.username, p.title, p.content, p.category, p.image_url, p.created_at,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id AND {comments}) AS comment_count,
            (SELECT COUNT(*) FROM reactions r
               JOIN reaction_targets rt ON rt.id = r.reaction_target_id
              WHERE rt.post_id = p.id AND {reactions}) AS reaction_count
         FROM posts p
         JOIN users pu ON pu.id = p.user_id
         WHERE {posts}",
        comments = comment_live("c"),
        reactions = reaction_live("r"),
        posts = post_live("p"),
    )
}

pub(crate) fn live_post(conn: &Connection, id: i64) -> AppResult<PostView> {
    conn.query_row(
        &format!("{} AND p.id = ?1", select_posts()),
        params![id],
        PostView::from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Post", id))
}

fn query_posts<P: Params>(conn: &Connection, sql: &str, values: P) -> AppResult<Vec<PostView>> {
    let mut stmt = conn.prepare(sql)?;
    let posts = stmt
        .query_map(values, PostView::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

impl PostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn find(&self, id: i64) -> AppResult<PostView> {
        let conn = self.pool.get()?;
        live_post(&conn, id)
    }

    pub fn create(&self, user_id: i64, post: &NewPost) -> AppResult<PostView> {
        post.validate()?;
        let conn = self.pool.get()?;
        live_user(&conn, user_id)?;

        conn.execute(
            "INSERT INTO posts (user_id, title, content, category, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                post.title,
                post.content,
                post.category,
                post.image_url,
                Utc::now()
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(post_id = id, user_id, "Post created");

        live_post(&conn, id)
    }

    pub fn update(&self, id: i64, update: &PostUpdate) -> AppResult<PostView> {
        update.validate()?;
        let conn = self.pool.get()?;
        live_post(&conn, id)?;

        conn.execute(
            "UPDATE posts SET
                title = COALESCE(?1, title),
                content = COALESCE(?2, content),
                category = COALESCE(?3, category),
                image_url = COALESCE(?4, image_url)
             WHERE id = ?5",
            params![
                update.title,
                update.content,
                update.category,
                update.image_url,
                id
            ],
        )?;

        live_post(&conn, id)
    }

    pub fn delete(&self, id: i64) -> AppResult<CascadeReport> {
        let mut conn = self.pool.get()?;
        cascade::soft_delete(&mut conn, DeleteTarget::Post(id), Utc::now())
    }

    pub fn list(&self, query: &PostQuery) -> AppResult<Page<PostView>> {
        let conn = self.pool.get()?;

        let mut filter = String::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(title) = &query.title {
            filter.push_str(" AND p.title LIKE ? ESCAPE '\\'");
            values.push(Box::new(contains_pattern(title)));
        }
        if let Some(username) = &query.username {
            filter.push_str(" AND pu.username = ?");
            values.push(Box::new(username.clone()));
        }
        if let Some(category) = query.category {
            filter.push_str(" AND p.category = ?");
            values.push(Box::new(category));
        }
        if let Some(after) = query.created_after {
            filter.push_str(" AND p.created_at >= ?");
            values.push(Box::new(after));
        }
        if let Some(before) = query.created_before {
            filter.push_str(" AND p.created_at <= ?");
            values.push(Box::new(before));
        }

        let total: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM posts p JOIN users pu ON pu.id = p.user_id WHERE {}{}",
                post_live("p"),
                filter
            ),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let column = match query.sort_by {
            PostSort::CreatedAt => "p.created_at",
            PostSort::Title => "p.title",
        };
        let order = query.sort_order.as_sql();
        let sql = format!(
            "{}{} ORDER BY {column} {order}, p.id {order} LIMIT ? OFFSET ?",
            select_posts(),
            filter
        );
        values.push(Box::new(query.page_size()));
        values.push(Box::new(query.offset()));

        let items = query_posts(&conn, &sql, params_from_iter(values.iter()))?;
        Ok(Page {
            items,
            total,
            page: query.page(),
            page_size: query.page_size(),
        })
    }

    pub fn top(&self, count: Option<u32>, by: TopBy) -> AppResult<Vec<PostView>> {
        let conn = self.pool.get()?;
        let column = match by {
            TopBy::Comments => "comment_count",
            TopBy::Reactions => "reaction_count",
        };
        let sql = format!(
            "{} ORDER BY {column} DESC, p.created_at DESC LIMIT ?",
            select_posts()
        );
        query_posts(&conn, &sql, params![clamp_count(count)])
    }

    pub fn recent(&self, count: Option<u32>) -> AppResult<Vec<PostView>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "{} ORDER BY p.created_at DESC, p.id DESC LIMIT ?",
            select_posts()
        );
        query_posts(&conn, &sql, params![clamp_count(count)])
    }

    pub fn by_user(&self, user_id: i64) -> AppResult<Vec<PostView>> {
        let conn = self.pool.get()?;
        live_user(&conn, user_id)?;
        let sql = format!(
            "{} AND p.user_id = ? ORDER BY p.created_at DESC, p.id DESC",
            select_posts()
        );
        query_posts(&conn, &sql, params![user_id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::input::SortOrder;
    use crate::db::models::PostCategory;
    use crate::db::testing;

    fn new_post(title: &str, category: PostCategory) -> NewPost {
        NewPost {
            title: title.into(),
            content: "Content that is comfortably over thirty-two characters.".into(),
            category,
            image_url: None,
        }
    }

    fn setup() -> (PostRepository, i64) {
        let pool = testing::pool();
        let alice = {
            let conn = pool.get().unwrap();
            testing::user(&conn, "alice")
        };
        (PostRepository::new(pool), alice)
    }

    #[test]
    fn create_and_find() {
        let (repo, alice) = setup();
        let post = repo
            .create(alice, &new_post("A title of decent size", PostCategory::Story))
            .unwrap();
        let found = repo.find(post.id).unwrap();
        assert_eq!(found.username, "alice");
        assert_eq!(found.category, PostCategory::Story);
        assert_eq!(found.comment_count, 0);
    }

    #[test]
    fn create_validates() {
        let (repo, alice) = setup();
        let err = repo
            .create(alice, &new_post("short", PostCategory::Story))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn deleted_post_is_not_found() {
        let (repo, alice) = setup();
        let post = repo
            .create(alice, &new_post("A title of decent size", PostCategory::Story))
            .unwrap();
        repo.delete(post.id).unwrap();
        let err = repo.find(post.id).unwrap_err();
        assert_eq!(err.to_string(), format!("Post with ID {} not found.", post.id));
        assert!(repo.recent(None).unwrap().is_empty());
    }

    #[test]
    fn update_keeps_unset_fields() {
        let (repo, alice) = setup();
        let post = repo
            .create(alice, &new_post("A title of decent size", PostCategory::Story))
            .unwrap();
        let updated = repo
            .update(
                post.id,
                &PostUpdate {
                    category: Some(PostCategory::Question),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.category, PostCategory::Question);
        assert_eq!(updated.title, "A title of decent size");
    }

    #[test]
    fn list_filters_sorts_and_pages() {
        let (repo, alice) = setup();
        for title in ["Charlie's long story", "Alpha is a long title", "Bravo question title"] {
            let category = if title.contains("question") {
                PostCategory::Question
            } else {
                PostCategory::Story
            };
            repo.create(alice, &new_post(title, category)).unwrap();
        }

        let page = repo
            .list(&PostQuery {
                sort_by: PostSort::Title,
                sort_order: SortOrder::Asc,
                page_size: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].title, "Alpha is a long title");

        let second = repo
            .list(&PostQuery {
                sort_by: PostSort::Title,
                sort_order: SortOrder::Asc,
                page: Some(2),
                page_size: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].title, "Charlie's long story");

        let questions = repo
            .list(&PostQuery {
                category: Some(PostCategory::Question),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(questions.total, 1);

        let by_title = repo
            .list(&PostQuery {
                title: Some("long".into()),
                username: Some("alice".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_title.total, 2);
    }

    #[test]
    fn title_filter_treats_wildcards_literally() {
        let (repo, alice) = setup();
        repo.create(alice, &new_post("We grew 100% this year", PostCategory::Story))
            .unwrap();
        repo.create(alice, &new_post("We grew 1000 this year", PostCategory::Story))
            .unwrap();

        let page = repo
            .list(&PostQuery {
                title: Some("100%".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "We grew 100% this year");
    }

    #[test]
    fn top_by_comments() {
        let (repo, alice) = setup();
        let quiet = repo
            .create(alice, &new_post("A quiet post title", PostCategory::Story))
            .unwrap();
        let busy = repo
            .create(alice, &new_post("A busy post title!", PostCategory::Story))
            .unwrap();
        {
            let conn = repo.pool.get().unwrap();
            testing::comment(&conn, busy.id, alice, None);
            testing::comment(&conn, busy.id, alice, None);
        }

        let top = repo.top(Some(1), TopBy::Comments).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, busy.id);
        assert_eq!(top[0].comment_count, 2);
        assert_ne!(top[0].id, quiet.id);
    }

    #[test]
    fn by_user_requires_live_user() {
        let (repo, alice) = setup();
        repo.create(alice, &new_post("A title of decent size", PostCategory::Story))
            .unwrap();
        assert_eq!(repo.by_user(alice).unwrap().len(), 1);
        assert!(matches!(repo.by_user(999), Err(AppError::NotFound(_))));
    }
}
