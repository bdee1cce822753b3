//! Community content: questions and answers on the help board, posts and
//! threaded comments on every other board, plus votes, reactions and
//! editor image uploads on top of them.

pub mod answer_comments;
pub mod answers;
pub mod post_comments;
pub mod posts;
pub mod questions;
pub mod reactions;
pub mod tags;
pub mod uploads;
pub mod votes;

use crate::app_config;
use crate::error::ServiceError;
use crate::orm;
use chrono::{NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

/// The board questions live on. Every other category holds posts.
pub const HELP_CATEGORY: &str = "help";

static CATEGORY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,29}$").expect("category pattern"));

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Trims and bounds a title.
pub fn check_title(title: &str) -> Result<String, ServiceError> {
    let title = title.trim();
    let max = app_config::limits().max_title_length as usize;
    if title.is_empty() {
        return Err(ServiceError::validation("Title is required"));
    }
    if title.chars().count() > max {
        return Err(ServiceError::validation(format!(
            "Title must be at most {} characters",
            max
        )));
    }
    Ok(title.to_owned())
}

/// Bounds a body. Bodies are editor HTML and kept as sent.
pub fn check_content(content: &str) -> Result<String, ServiceError> {
    let max = app_config::limits().max_content_length as usize;
    if content.trim().is_empty() {
        return Err(ServiceError::validation("Content is required"));
    }
    if content.chars().count() > max {
        return Err(ServiceError::validation(format!(
            "Content must be at most {} characters",
            max
        )));
    }
    Ok(content.to_owned())
}

/// Post boards are lowercase slugs; the help board is reserved for questions.
pub fn check_category(category: &str) -> Result<(), ServiceError> {
    if category == HELP_CATEGORY || !CATEGORY_REGEX.is_match(category) {
        return Err(ServiceError::validation(format!(
            "`{}` is not a post category",
            category
        )));
    }
    Ok(())
}

/// Questions and posts may only be changed by their author.
pub(crate) fn ensure_author(owner_id: i32, user_id: i32) -> Result<(), ServiceError> {
    if owner_id == user_id {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized.with_trigger("not-the-author"))
    }
}

/// Answers and comments report a stranger's edit as forbidden.
pub(crate) fn ensure_owner(owner_id: i32, user_id: i32) -> Result<(), ServiceError> {
    if owner_id == user_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// Adds `delta` to a counter column in SQL, so concurrent writers never
/// overwrite each other.
pub(crate) async fn bump<E, C>(
    db: &C,
    _entity: E,
    counter: E::Column,
    id_column: E::Column,
    id: i32,
    delta: i32,
) -> Result<(), DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    E::update_many()
        .col_expr(counter, Expr::col(counter).add(delta))
        .filter(id_column.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Removes everything a departing user wrote or cast, keeping every other
/// user's counters in step. The caller owns the transaction and deletes
/// the user row afterwards.
pub(crate) async fn purge_user_content<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<(), ServiceError> {
    votes::retract_votes_by_user(db, user_id).await?;
    reactions::delete_reactions_by_user(db, user_id).await?;
    crate::notifications::delete_notifications_from_user(db, user_id).await?;

    let own_answer_comments = orm::answer_comments::Entity::find()
        .filter(orm::answer_comments::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    for comment in &own_answer_comments {
        answer_comments::remove_answer_comment(db, comment).await?;
    }

    // Replies before top-level comments, which would take replies along.
    let own_replies = orm::post_comments::Entity::find()
        .filter(orm::post_comments::Column::UserId.eq(user_id))
        .filter(orm::post_comments::Column::ParentId.is_not_null())
        .all(db)
        .await?;
    for reply in &own_replies {
        post_comments::remove_post_comment(db, reply).await?;
    }
    let own_comments = orm::post_comments::Entity::find()
        .filter(orm::post_comments::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    for comment in &own_comments {
        post_comments::remove_post_comment(db, comment).await?;
    }

    let own_answers = orm::answers::Entity::find()
        .filter(orm::answers::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    for answer in &own_answers {
        answers::remove_answer(db, answer).await?;
    }

    let own_posts = orm::posts::Entity::find()
        .filter(orm::posts::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    for post in &own_posts {
        posts::purge_post(db, post).await?;
    }

    let own_questions = orm::questions::Entity::find()
        .filter(orm::questions::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    for question in &own_questions {
        questions::purge_question(db, question).await?;
    }

    log::debug!(
        "Purged {} answers, {} posts and {} questions of user {}",
        own_answers.len(),
        own_posts.len(),
        own_questions.len(),
        user_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_title() {
        assert_eq!(check_title("  How do I quack?  ").unwrap(), "How do I quack?");
        assert!(check_title("   ").is_err());
        assert!(check_title(&"가".repeat(201)).is_err());
        assert!(check_title(&"가".repeat(200)).is_ok());
    }

    #[test]
    fn test_check_content() {
        assert!(check_content("<p></p>").is_ok());
        assert!(check_content(" \n").is_err());
    }

    #[test]
    fn test_check_category() {
        assert!(check_category("free").is_ok());
        assert!(check_category("job-board").is_ok());
        assert!(check_category("help").is_err());
        assert!(check_category("Free").is_err());
        assert!(check_category("").is_err());
        assert!(check_category("../etc").is_err());
    }

    #[test]
    fn test_ownership_errors() {
        assert!(ensure_author(1, 1).is_ok());
        assert_eq!(
            ensure_author(1, 2).unwrap_err().trigger(),
            Some("not-the-author")
        );
        assert!(matches!(ensure_owner(1, 2), Err(ServiceError::Forbidden)));
    }
}
