//! Comments under answers. Flat; they carry no votes of their own.

use super::{answers, bump, check_content, ensure_owner, now};
use crate::activities::{self, NewUserAction};
use crate::commons::{ListQuery, Listable, Page};
use crate::error::ServiceError;
use crate::notifications::{self, NewNotification, Notice};
use crate::orm::notifications::NotificationType;
use crate::orm::reactions::ReactionTarget;
use crate::orm::user_actions::ActionType;
use crate::orm::{answer_comment_histories, answer_comments, answers as a};
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, Order, TransactionTrait};

impl Listable for answer_comments::Entity {
    fn created_at() -> Self::Column {
        answer_comments::Column::CreatedAt
    }

    fn text_columns() -> Vec<Self::Column> {
        vec![answer_comments::Column::Content]
    }

    fn author_column() -> Option<Self::Column> {
        Some(answer_comments::Column::UserId)
    }
}

pub async fn list_answer_comments(
    db: &DatabaseConnection,
    answer_id: i32,
    query: &ListQuery,
) -> Result<Page<answer_comments::Model>, ServiceError> {
    answers::get_answer(db, answer_id).await?;
    let select = answer_comments::Entity::find()
        .filter(answer_comments::Column::AnswerId.eq(answer_id))
        .filter(answer_comments::Column::DeletedAt.is_null());
    query.fetch(db, select, Order::Asc).await
}

pub async fn get_answer_comment<C: ConnectionTrait>(
    db: &C,
    comment_id: i32,
) -> Result<answer_comments::Model, ServiceError> {
    answer_comments::Entity::find_by_id(comment_id)
        .filter(answer_comments::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Comment"))
}

/// Looks a comment up through the answer it is addressed under.
async fn get_comment_of_answer<C: ConnectionTrait>(
    db: &C,
    answer_id: i32,
    comment_id: i32,
) -> Result<answer_comments::Model, ServiceError> {
    let comment = get_answer_comment(db, comment_id).await?;
    if comment.answer_id != answer_id {
        return Err(ServiceError::NotFound("Comment"));
    }
    Ok(comment)
}

pub async fn create_answer_comment(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
    content: &str,
) -> Result<answer_comments::Model, ServiceError> {
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let answer = answers::get_answer(&txn, answer_id).await?;

    let comment = answer_comments::ActiveModel {
        user_id: Set(user_id),
        answer_id: Set(answer.id),
        content: Set(content),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    bump(&txn, a::Entity, a::Column::CommentCount, a::Column::Id, answer.id, 1).await?;
    activities::create_user_action(&txn, user_id, NewUserAction::CreateAnswerComment(comment.id))
        .await?;
    let notice = notifications::create_notification(
        &txn,
        NewNotification::CreateAnswerComment(Notice {
            to_user_id: answer.user_id,
            from_user_id: user_id,
            target_id: comment.id,
        }),
    )
    .await?;
    txn.commit().await?;
    notifications::publish_notification(notice.as_ref()).await;

    Ok(comment)
}

pub async fn update_answer_comment(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
    comment_id: i32,
    content: &str,
) -> Result<answer_comments::Model, ServiceError> {
    let txn = db.begin().await?;
    let old = get_comment_of_answer(&txn, answer_id, comment_id).await?;
    ensure_owner(old.user_id, user_id)?;
    let content = check_content(content)?;

    answer_comment_histories::ActiveModel {
        answer_comment_id: Set(old.id),
        content: Set(old.content.clone()),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut comment: answer_comments::ActiveModel = old.into();
    comment.content = Set(content);
    comment.updated_at = Set(Some(now()));
    let comment = comment.update(&txn).await?;
    txn.commit().await?;

    Ok(comment)
}

/// Removes the comment and what points at it. Counters are left to the
/// caller.
pub(crate) async fn purge_answer_comment<C: ConnectionTrait>(
    db: &C,
    comment: &answer_comments::Model,
) -> Result<(), ServiceError> {
    super::reactions::delete_reactions_for_target(db, ReactionTarget::AnswerComment, comment.id)
        .await?;
    activities::delete_user_actions_for_target(
        db,
        &[
            ActionType::CreateAnswerComment,
            ActionType::ReactionAnswerComment,
        ],
        comment.id,
    )
    .await?;
    notifications::delete_notifications_for_target(
        db,
        &[
            NotificationType::CreateAnswerComment,
            NotificationType::ReactionAnswerComment,
        ],
        comment.id,
    )
    .await?;
    answer_comment_histories::Entity::delete_many()
        .filter(answer_comment_histories::Column::AnswerCommentId.eq(comment.id))
        .exec(db)
        .await?;
    answer_comments::Entity::delete_by_id(comment.id)
        .exec(db)
        .await?;
    Ok(())
}

/// Purges the comment and takes it off its answer's count.
pub(crate) async fn remove_answer_comment<C: ConnectionTrait>(
    db: &C,
    comment: &answer_comments::Model,
) -> Result<(), ServiceError> {
    purge_answer_comment(db, comment).await?;
    bump(db, a::Entity, a::Column::CommentCount, a::Column::Id, comment.answer_id, -1).await?;
    Ok(())
}

pub async fn delete_answer_comment(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
    comment_id: i32,
) -> Result<answer_comments::Model, ServiceError> {
    let txn = db.begin().await?;
    let comment = get_comment_of_answer(&txn, answer_id, comment_id).await?;
    ensure_owner(comment.user_id, user_id)?;

    remove_answer_comment(&txn, &comment).await?;
    txn.commit().await?;

    Ok(comment)
}
