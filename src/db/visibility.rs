//! SQL predicates that hide logically deleted rows.
//!
//! Each function takes the alias the caller gave the table and returns a
//! boolean SQL fragment. Subqueries derive their own aliases from it, so the
//! fragments nest without collisions. Every read path in the repositories
//! composes one of these.

/// `alias` refers to a `users` row.
pub fn user_live(alias: &str) -> String {
    format!("{alias}.deleted_at IS NULL")
}

fn owner_live(alias: &str) -> String {
    let u = format!("{alias}_u");
    format!(
        "EXISTS (SELECT 1 FROM users {u} WHERE {u}.id = {alias}.user_id AND {})",
        user_live(&u)
    )
}

/// `alias` refers to a `posts` row.
pub fn post_live(alias: &str) -> String {
    format!("{alias}.deleted_at IS NULL AND {}", owner_live(alias))
}

/// `alias` refers to a `comments` row. The comment's post must be live too.
pub fn comment_live(alias: &str) -> String {
    let p = format!("{alias}_p");
    format!(
        "{alias}.deleted_at IS NULL AND {} AND EXISTS (SELECT 1 FROM posts {p} WHERE {p}.id = {alias}.post_id AND {})",
        owner_live(alias),
        post_live(&p)
    )
}

/// `alias` refers to a `reaction_targets` row.
pub fn reaction_target_live(alias: &str) -> String {
    let p = format!("{alias}_p");
    let c = format!("{alias}_c");
    format!(
        "{alias}.deleted_at IS NULL AND (\
         EXISTS (SELECT 1 FROM posts {p} WHERE {p}.id = {alias}.post_id AND {}) \
         OR EXISTS (SELECT 1 FROM comments {c} WHERE {c}.id = {alias}.comment_id AND {}))",
        post_live(&p),
        comment_live(&c)
    )
}

/// `alias` refers to a `reactions` row.
pub fn reaction_live(alias: &str) -> String {
    let t = format!("{alias}_t");
    format!(
        "{alias}.deleted_at IS NULL AND {} AND EXISTS (SELECT 1 FROM reaction_targets {t} WHERE {t}.id = {alias}.reaction_target_id AND {})",
        owner_live(alias),
        reaction_target_live(&t)
    )
}
