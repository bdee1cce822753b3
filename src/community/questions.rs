//! Questions on the help board.

use super::{answers, bump, check_content, check_title, ensure_author, now, tags};
use crate::activities::{self, NewUserAction};
use crate::commons::{ListQuery, Listable, Page};
use crate::error::ServiceError;
use crate::notifications;
use crate::orm::notifications::NotificationType;
use crate::orm::reactions::ReactionTarget;
use crate::orm::user_actions::ActionType;
use crate::orm::votes::VoteTarget;
use crate::orm::{
    answers as a, question_histories, question_images, question_tag_links, questions, users,
};
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, Order, TransactionTrait};
use serde::Serialize;

impl Listable for questions::Entity {
    fn created_at() -> Self::Column {
        questions::Column::CreatedAt
    }

    fn text_columns() -> Vec<Self::Column> {
        vec![questions::Column::Title, questions::Column::Content]
    }

    fn author_column() -> Option<Self::Column> {
        Some(questions::Column::UserId)
    }
}

/// A question with what its page shows around it.
#[derive(Clone, Debug, Serialize)]
pub struct QuestionView {
    #[serde(flatten)]
    pub question: questions::Model,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

/// Newest questions first. Deleted questions are hidden.
pub async fn list_questions(
    db: &DatabaseConnection,
    query: &ListQuery,
) -> Result<Page<questions::Model>, ServiceError> {
    let select = questions::Entity::find().filter(questions::Column::DeletedAt.is_null());
    query.fetch(db, select, Order::Desc).await
}

pub async fn get_question<C: ConnectionTrait>(
    db: &C,
    question_id: i32,
) -> Result<questions::Model, ServiceError> {
    questions::Entity::find_by_id(question_id)
        .filter(questions::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Question"))
}

/// Counts a page view and returns the question with its tags and author.
pub async fn view_question(
    db: &DatabaseConnection,
    question_id: i32,
) -> Result<QuestionView, ServiceError> {
    get_question(db, question_id).await?;
    bump(
        db,
        questions::Entity,
        questions::Column::ViewCount,
        questions::Column::Id,
        question_id,
        1,
    )
    .await?;

    let question = get_question(db, question_id).await?;
    let author = users::Entity::find_by_id(question.user_id)
        .one(db)
        .await?
        .map(|u| u.nickname);
    let tags = tags::question_tags_of(db, question_id)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    Ok(QuestionView {
        question,
        author,
        tags,
    })
}

pub async fn create_question(
    db: &DatabaseConnection,
    user_id: i32,
    title: &str,
    content: &str,
    tag_names: &[String],
) -> Result<questions::Model, ServiceError> {
    let title = check_title(title)?;
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let question = questions::ActiveModel {
        user_id: Set(user_id),
        title: Set(title),
        content: Set(content),
        view_count: Set(0),
        vote_count: Set(0),
        comment_count: Set(0),
        answered: Set(false),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    tags::set_question_tags(&txn, question.id, tag_names).await?;
    activities::create_user_action(&txn, user_id, NewUserAction::CreateQuestion(question.id))
        .await?;
    txn.commit().await?;

    log::info!("User {} asked question {}", user_id, question.id);
    Ok(question)
}

/// Saves the current title and body as history, then applies the edit.
pub async fn update_question(
    db: &DatabaseConnection,
    user_id: i32,
    question_id: i32,
    title: &str,
    content: &str,
    tag_names: &[String],
) -> Result<questions::Model, ServiceError> {
    let title = check_title(title)?;
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let old = get_question(&txn, question_id).await?;
    ensure_author(old.user_id, user_id)?;

    question_histories::ActiveModel {
        question_id: Set(old.id),
        title: Set(old.title.clone()),
        content: Set(old.content.clone()),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut question: questions::ActiveModel = old.into();
    question.title = Set(title);
    question.content = Set(content);
    question.updated_at = Set(Some(now()));
    let question = question.update(&txn).await?;

    tags::set_question_tags(&txn, question.id, tag_names).await?;
    txn.commit().await?;

    Ok(question)
}

/// Hides the question. Its answers, votes and activity stay in place.
pub async fn delete_question(
    db: &DatabaseConnection,
    user_id: i32,
    question_id: i32,
) -> Result<questions::Model, ServiceError> {
    let question = get_question(db, question_id).await?;
    ensure_author(question.user_id, user_id)?;

    let mut question: questions::ActiveModel = question.into();
    question.deleted_at = Set(Some(now()));
    let question = question.update(db).await?;

    log::info!("User {} deleted question {}", user_id, question_id);
    Ok(question)
}

/// Removes a question for good with its answers, history, tag links and
/// everything pointing at them. Images are detached. The caller owns the
/// transaction.
pub(crate) async fn purge_question<C: ConnectionTrait>(
    db: &C,
    question: &questions::Model,
) -> Result<(), ServiceError> {
    let answers = a::Entity::find()
        .filter(a::Column::QuestionId.eq(question.id))
        .all(db)
        .await?;
    for answer in &answers {
        answers::purge_answer(db, answer).await?;
    }

    super::votes::delete_votes_for_target(db, VoteTarget::Question, question.id).await?;
    super::reactions::delete_reactions_for_target(db, ReactionTarget::Question, question.id)
        .await?;
    activities::delete_user_actions_for_target(
        db,
        &[
            ActionType::CreateQuestion,
            ActionType::VoteQuestion,
            ActionType::ReactionQuestion,
        ],
        question.id,
    )
    .await?;
    notifications::delete_notifications_for_target(
        db,
        &[NotificationType::VoteQuestion, NotificationType::ReactionQuestion],
        question.id,
    )
    .await?;

    question_histories::Entity::delete_many()
        .filter(question_histories::Column::QuestionId.eq(question.id))
        .exec(db)
        .await?;
    question_tag_links::Entity::delete_many()
        .filter(question_tag_links::Column::QuestionId.eq(question.id))
        .exec(db)
        .await?;
    question_images::Entity::update_many()
        .col_expr(question_images::Column::QuestionId, Expr::value(Option::<i32>::None))
        .filter(question_images::Column::QuestionId.eq(question.id))
        .exec(db)
        .await?;
    questions::Entity::delete_by_id(question.id).exec(db).await?;
    Ok(())
}

/// Earlier versions, oldest first.
pub async fn list_question_histories(
    db: &DatabaseConnection,
    question_id: i32,
) -> Result<Vec<question_histories::Model>, ServiceError> {
    Ok(question_histories::Entity::find()
        .filter(question_histories::Column::QuestionId.eq(question_id))
        .order_by_asc(question_histories::Column::Id)
        .all(db)
        .await?)
}
