//! Answers to questions, and the accepted-answer toggle.

use super::{answer_comments, bump, check_content, ensure_owner, now, questions};
use crate::activities::{self, NewUserAction};
use crate::commons::{ListQuery, Listable, Page};
use crate::error::ServiceError;
use crate::notifications::{self, NewNotification, Notice};
use crate::orm::notifications::NotificationType;
use crate::orm::reactions::ReactionTarget;
use crate::orm::user_actions::ActionType;
use crate::orm::votes::VoteTarget;
use crate::orm::{answer_comments as comments_orm, answer_histories, answers, questions as q};
use sea_orm::sea_query::Expr;
use sea_orm::{
    entity::*, query::*, ConnectionTrait, DatabaseConnection, Order, PaginatorTrait,
    TransactionTrait,
};

impl Listable for answers::Entity {
    fn created_at() -> Self::Column {
        answers::Column::CreatedAt
    }

    fn text_columns() -> Vec<Self::Column> {
        vec![answers::Column::Content]
    }

    fn author_column() -> Option<Self::Column> {
        Some(answers::Column::UserId)
    }
}

/// Oldest answers first.
pub async fn list_answers(
    db: &DatabaseConnection,
    question_id: i32,
    query: &ListQuery,
) -> Result<Page<answers::Model>, ServiceError> {
    questions::get_question(db, question_id).await?;
    let select = answers::Entity::find()
        .filter(answers::Column::QuestionId.eq(question_id))
        .filter(answers::Column::DeletedAt.is_null());
    query.fetch(db, select, Order::Asc).await
}

pub async fn get_answer<C: ConnectionTrait>(
    db: &C,
    answer_id: i32,
) -> Result<answers::Model, ServiceError> {
    answers::Entity::find_by_id(answer_id)
        .filter(answers::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Answer"))
}

/// Answers a question and tells its author.
pub async fn create_answer(
    db: &DatabaseConnection,
    user_id: i32,
    question_id: i32,
    content: &str,
) -> Result<answers::Model, ServiceError> {
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let question = questions::get_question(&txn, question_id).await?;

    let answer = answers::ActiveModel {
        user_id: Set(user_id),
        question_id: Set(question.id),
        content: Set(content),
        vote_count: Set(0),
        comment_count: Set(0),
        answered: Set(false),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    bump(&txn, q::Entity, q::Column::CommentCount, q::Column::Id, question.id, 1).await?;
    activities::create_user_action(&txn, user_id, NewUserAction::CreateAnswer(answer.id)).await?;
    let notice = notifications::create_notification(
        &txn,
        NewNotification::CreateAnswer(Notice {
            to_user_id: question.user_id,
            from_user_id: user_id,
            target_id: answer.id,
        }),
    )
    .await?;
    txn.commit().await?;
    notifications::publish_notification(notice.as_ref()).await;

    log::info!("User {} answered question {}", user_id, question.id);
    Ok(answer)
}

pub async fn update_answer(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
    content: &str,
) -> Result<answers::Model, ServiceError> {
    let txn = db.begin().await?;
    let old = get_answer(&txn, answer_id).await?;
    ensure_owner(old.user_id, user_id)?;
    let content = check_content(content)?;

    answer_histories::ActiveModel {
        answer_id: Set(old.id),
        content: Set(old.content.clone()),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut answer: answers::ActiveModel = old.into();
    answer.content = Set(content);
    answer.updated_at = Set(Some(now()));
    let answer = answer.update(&txn).await?;
    txn.commit().await?;

    Ok(answer)
}

/// Removes everything that points at an answer, then the answer itself.
/// The caller owns the transaction.
pub(crate) async fn purge_answer<C: ConnectionTrait>(
    db: &C,
    answer: &answers::Model,
) -> Result<(), ServiceError> {
    let comments = comments_orm::Entity::find()
        .filter(comments_orm::Column::AnswerId.eq(answer.id))
        .all(db)
        .await?;
    for comment in &comments {
        answer_comments::purge_answer_comment(db, comment).await?;
    }

    super::votes::delete_votes_for_target(db, VoteTarget::Answer, answer.id).await?;
    super::reactions::delete_reactions_for_target(db, ReactionTarget::Answer, answer.id).await?;
    activities::delete_user_actions_for_target(
        db,
        &[
            ActionType::CreateAnswer,
            ActionType::VoteAnswer,
            ActionType::ReactionAnswer,
        ],
        answer.id,
    )
    .await?;
    notifications::delete_notifications_for_target(
        db,
        &[
            NotificationType::CreateAnswer,
            NotificationType::VoteAnswer,
            NotificationType::ReactionAnswer,
        ],
        answer.id,
    )
    .await?;

    answer_histories::Entity::delete_many()
        .filter(answer_histories::Column::AnswerId.eq(answer.id))
        .exec(db)
        .await?;
    answers::Entity::delete_by_id(answer.id).exec(db).await?;
    Ok(())
}

/// Purges the answer and takes it off its question's count. The caller
/// owns the transaction.
pub(crate) async fn remove_answer<C: ConnectionTrait>(
    db: &C,
    answer: &answers::Model,
) -> Result<(), ServiceError> {
    purge_answer(db, answer).await?;
    bump(db, q::Entity, q::Column::CommentCount, q::Column::Id, answer.question_id, -1).await?;

    // Without its accepted answer the question is open again.
    if answer.answered {
        sync_question_answered(db, answer.question_id).await?;
    }
    Ok(())
}

/// Deletes an answer with its comments. Returns the question it belonged to.
pub async fn delete_answer(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
) -> Result<q::Model, ServiceError> {
    let txn = db.begin().await?;
    let answer = get_answer(&txn, answer_id).await?;
    ensure_owner(answer.user_id, user_id)?;

    remove_answer(&txn, &answer).await?;

    let question = q::Entity::find_by_id(answer.question_id)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Question"))?;
    txn.commit().await?;

    log::info!("User {} deleted answer {}", user_id, answer_id);
    Ok(question)
}

/// Sets `question.answered` from whether any of its answers is accepted.
pub(crate) async fn sync_question_answered<C: ConnectionTrait>(
    db: &C,
    question_id: i32,
) -> Result<(), ServiceError> {
    let accepted = answers::Entity::find()
        .filter(answers::Column::QuestionId.eq(question_id))
        .filter(answers::Column::Answered.eq(true))
        .count(db)
        .await?;
    q::Entity::update_many()
        .col_expr(q::Column::Answered, Expr::value(accepted > 0))
        .filter(q::Column::Id.eq(question_id))
        .exec(db)
        .await?;
    Ok(())
}

/// A question has at most one accepted answer. Accepting one releases
/// whichever was accepted before.
async fn set_answered(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
    answered: bool,
) -> Result<(answers::Model, q::Model), ServiceError> {
    let txn = db.begin().await?;
    let answer = get_answer(&txn, answer_id).await?;
    let question = questions::get_question(&txn, answer.question_id).await?;
    // Only the asker decides which answer solved the question.
    ensure_owner(question.user_id, user_id)?;

    if answered {
        answers::Entity::update_many()
            .col_expr(answers::Column::Answered, Expr::value(false))
            .filter(answers::Column::QuestionId.eq(question.id))
            .filter(answers::Column::Id.ne(answer.id))
            .exec(&txn)
            .await?;
    }

    let mut answer: answers::ActiveModel = answer.into();
    answer.answered = Set(answered);
    let answer = answer.update(&txn).await?;

    sync_question_answered(&txn, question.id).await?;
    let question = questions::get_question(&txn, question.id).await?;
    txn.commit().await?;

    Ok((answer, question))
}

pub async fn mark_answered(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
) -> Result<(answers::Model, q::Model), ServiceError> {
    set_answered(db, user_id, answer_id, true).await
}

pub async fn mark_unanswered(
    db: &DatabaseConnection,
    user_id: i32,
    answer_id: i32,
) -> Result<(answers::Model, q::Model), ServiceError> {
    set_answered(db, user_id, answer_id, false).await
}

pub async fn list_answer_histories(
    db: &DatabaseConnection,
    answer_id: i32,
) -> Result<Vec<answer_histories::Model>, ServiceError> {
    Ok(answer_histories::Entity::find()
        .filter(answer_histories::Column::AnswerId.eq(answer_id))
        .order_by_asc(answer_histories::Column::Id)
        .all(db)
        .await?)
}
