//! Activity log: what a user created, voted on and reacted to.

use crate::commons::{ListQuery, Listable, Page};
use crate::error::ServiceError;
use crate::orm::reactions::ReactionCode;
use crate::orm::user_actions::{self, ActionType};
use chrono::Utc;
use sea_orm::{entity::*, query::*, ActiveEnum, ConnectionTrait, DatabaseConnection, DbErr, Iterable, Order};

pub use crate::orm::user_actions::ActionType as Type;

/// A user action about to be recorded. Each variant carries the id of the
/// content it points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewUserAction {
    CreatePost(i32),
    CreateQuestion(i32),
    CreateAnswer(i32),
    CreateAnswerComment(i32),
    CreatePostComment(i32),
    VotePost(i32),
    VotePostComment(i32),
    VoteQuestion(i32),
    VoteAnswer(i32),
    ReactionPost(i32, ReactionCode),
    ReactionPostComment(i32, ReactionCode),
    ReactionQuestion(i32, ReactionCode),
    ReactionAnswer(i32, ReactionCode),
    ReactionAnswerComment(i32, ReactionCode),
}

impl NewUserAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::CreatePost(_) => ActionType::CreatePost,
            Self::CreateQuestion(_) => ActionType::CreateQuestion,
            Self::CreateAnswer(_) => ActionType::CreateAnswer,
            Self::CreateAnswerComment(_) => ActionType::CreateAnswerComment,
            Self::CreatePostComment(_) => ActionType::CreatePostComment,
            Self::VotePost(_) => ActionType::VotePost,
            Self::VotePostComment(_) => ActionType::VotePostComment,
            Self::VoteQuestion(_) => ActionType::VoteQuestion,
            Self::VoteAnswer(_) => ActionType::VoteAnswer,
            Self::ReactionPost(..) => ActionType::ReactionPost,
            Self::ReactionPostComment(..) => ActionType::ReactionPostComment,
            Self::ReactionQuestion(..) => ActionType::ReactionQuestion,
            Self::ReactionAnswer(..) => ActionType::ReactionAnswer,
            Self::ReactionAnswerComment(..) => ActionType::ReactionAnswerComment,
        }
    }

    pub fn target_id(&self) -> i32 {
        match *self {
            Self::CreatePost(id)
            | Self::CreateQuestion(id)
            | Self::CreateAnswer(id)
            | Self::CreateAnswerComment(id)
            | Self::CreatePostComment(id)
            | Self::VotePost(id)
            | Self::VotePostComment(id)
            | Self::VoteQuestion(id)
            | Self::VoteAnswer(id)
            | Self::ReactionPost(id, _)
            | Self::ReactionPostComment(id, _)
            | Self::ReactionQuestion(id, _)
            | Self::ReactionAnswer(id, _)
            | Self::ReactionAnswerComment(id, _) => id,
        }
    }

    /// The reaction code for reaction actions.
    pub fn value(&self) -> Option<&'static str> {
        match self {
            Self::ReactionPost(_, code)
            | Self::ReactionPostComment(_, code)
            | Self::ReactionQuestion(_, code)
            | Self::ReactionAnswer(_, code)
            | Self::ReactionAnswerComment(_, code) => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Parses an action type name such as `vote_post`.
pub fn parse_action_type(name: &str) -> Result<ActionType, ServiceError> {
    ActionType::iter()
        .find(|t| t.to_value() == name)
        .ok_or_else(|| ServiceError::validation(format!("Unknown action type `{}`", name)))
}

/// Tabs of the activity page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityGroup {
    All,
    QuestionsAndPosts,
    AnswersAndComments,
    Votes,
    Reactions,
}

impl ActivityGroup {
    pub fn action_types(&self) -> Vec<ActionType> {
        use ActionType::*;
        match self {
            ActivityGroup::All => ActionType::iter().collect(),
            ActivityGroup::QuestionsAndPosts => vec![CreatePost, CreateQuestion],
            ActivityGroup::AnswersAndComments => {
                vec![CreateAnswer, CreateAnswerComment, CreatePostComment]
            }
            ActivityGroup::Votes => vec![VotePost, VotePostComment, VoteQuestion, VoteAnswer],
            ActivityGroup::Reactions => vec![
                ReactionPost,
                ReactionPostComment,
                ReactionQuestion,
                ReactionAnswer,
                ReactionAnswerComment,
            ],
        }
    }
}

impl Listable for user_actions::Entity {
    fn created_at() -> Self::Column {
        user_actions::Column::CreatedAt
    }

    fn text_columns() -> Vec<Self::Column> {
        vec![user_actions::Column::ActionValue]
    }
}

pub async fn create_user_action<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    action: NewUserAction,
) -> Result<user_actions::Model, DbErr> {
    log::debug!(
        "Recording {:?} on {} by user {}",
        action.action_type(),
        action.target_id(),
        user_id
    );

    user_actions::ActiveModel {
        user_id: Set(user_id),
        action_type: Set(action.action_type()),
        action_value: Set(action.value().map(str::to_owned)),
        target_id: Set(action.target_id()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Removes a recorded action. 404 when there is nothing to remove.
pub async fn delete_user_action<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    action_type: &str,
    target_id: i32,
    action_value: Option<&str>,
) -> Result<(), ServiceError> {
    let action_type = parse_action_type(action_type)?;

    let mut select = user_actions::Entity::find()
        .filter(user_actions::Column::UserId.eq(user_id))
        .filter(user_actions::Column::ActionType.eq(action_type))
        .filter(user_actions::Column::TargetId.eq(target_id));
    select = match action_value {
        Some(value) => select.filter(user_actions::Column::ActionValue.eq(value)),
        None => select.filter(user_actions::Column::ActionValue.is_null()),
    };

    let action = select
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("User action"))?;
    action.delete(db).await?;
    Ok(())
}

/// Removes every action of the given types pointing at `target_id`, by
/// any user. Used when the content itself goes away.
pub async fn delete_user_actions_for_target<C: ConnectionTrait>(
    db: &C,
    action_types: &[ActionType],
    target_id: i32,
) -> Result<u64, DbErr> {
    let res = user_actions::Entity::delete_many()
        .filter(user_actions::Column::ActionType.is_in(action_types.iter().copied()))
        .filter(user_actions::Column::TargetId.eq(target_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// One page of a user's actions, newest first.
pub async fn list_user_actions(
    db: &DatabaseConnection,
    user_id: i32,
    group: ActivityGroup,
    query: &ListQuery,
) -> Result<Page<user_actions::Model>, ServiceError> {
    let select = user_actions::Entity::find()
        .filter(user_actions::Column::UserId.eq(user_id))
        .filter(user_actions::Column::ActionType.is_in(group.action_types()));

    query.fetch(db, select, Order::Desc).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_action_dispatch() {
        let a = NewUserAction::ReactionAnswer(5, ReactionCode::Tada);
        assert_eq!(a.action_type(), ActionType::ReactionAnswer);
        assert_eq!(a.target_id(), 5);
        assert_eq!(a.value(), Some("tada"));

        let b = NewUserAction::VoteQuestion(3);
        assert_eq!(b.action_type(), ActionType::VoteQuestion);
        assert_eq!(b.value(), None);
    }

    #[test]
    fn test_parse_action_type() {
        assert_eq!(
            parse_action_type("create_answer_comment").unwrap(),
            ActionType::CreateAnswerComment
        );
        assert!(parse_action_type("delete_everything").is_err());
    }

    #[test]
    fn test_groups_cover_every_type_once() {
        let mut seen: Vec<ActionType> = [
            ActivityGroup::QuestionsAndPosts,
            ActivityGroup::AnswersAndComments,
            ActivityGroup::Votes,
            ActivityGroup::Reactions,
        ]
        .iter()
        .flat_map(|g| g.action_types())
        .collect();
        assert_eq!(seen.len(), 14);
        seen.dedup();
        assert_eq!(seen.len(), ActivityGroup::All.action_types().len());
    }
}
