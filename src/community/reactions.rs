//! Emoji reactions on questions, answers, answer comments, posts and post
//! comments. A user may leave several different reactions on one target,
//! but each code only once.

use super::{answer_comments, answers, post_comments, posts, questions};
use crate::activities::{self, NewUserAction};
use crate::error::ServiceError;
use crate::notifications::{self, NewNotification, Notice};
use crate::orm::reactions::{self, ReactionCode, ReactionTarget};
use sea_orm::{
    entity::*, query::*, ActiveEnum, ConnectionTrait, DatabaseConnection, DbErr, Iterable,
    TransactionTrait,
};
use serde::Serialize;
use std::str::FromStr;

impl FromStr for ReactionTarget {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "questions" => Ok(ReactionTarget::Question),
            "answers" => Ok(ReactionTarget::Answer),
            "answer-comments" => Ok(ReactionTarget::AnswerComment),
            "posts" => Ok(ReactionTarget::Post),
            "post-comments" => Ok(ReactionTarget::PostComment),
            _ => Err(ServiceError::NotFound("Reaction target")),
        }
    }
}

/// The `action` field of the reaction form: `react heart`, `unreact eyes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionAction {
    React(ReactionCode),
    Unreact(ReactionCode),
}

impl FromStr for ReactionAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ServiceError::validation(format!("Invalid reaction action `{}`", s));
        let (verb, code) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let code = ReactionCode::from_str(code.trim()).map_err(|_| invalid())?;
        match verb {
            "react" => Ok(ReactionAction::React(code)),
            "unreact" => Ok(ReactionAction::Unreact(code)),
            _ => Err(invalid()),
        }
    }
}

/// How often one code was used on a target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReactionCount {
    pub code: ReactionCode,
    pub count: u64,
    /// Whether the viewing user is among them.
    pub reacted: bool,
}

async fn target_owner<C: ConnectionTrait>(
    db: &C,
    target: ReactionTarget,
    target_id: i32,
) -> Result<i32, ServiceError> {
    Ok(match target {
        ReactionTarget::Question => questions::get_question(db, target_id).await?.user_id,
        ReactionTarget::Answer => answers::get_answer(db, target_id).await?.user_id,
        ReactionTarget::AnswerComment => {
            answer_comments::get_answer_comment(db, target_id)
                .await?
                .user_id
        }
        ReactionTarget::Post => posts::get_post(db, target_id).await?.user_id,
        ReactionTarget::PostComment => {
            post_comments::get_post_comment(db, target_id)
                .await?
                .user_id
        }
    })
}

fn user_action(target: ReactionTarget, target_id: i32, code: ReactionCode) -> NewUserAction {
    match target {
        ReactionTarget::Question => NewUserAction::ReactionQuestion(target_id, code),
        ReactionTarget::Answer => NewUserAction::ReactionAnswer(target_id, code),
        ReactionTarget::AnswerComment => NewUserAction::ReactionAnswerComment(target_id, code),
        ReactionTarget::Post => NewUserAction::ReactionPost(target_id, code),
        ReactionTarget::PostComment => NewUserAction::ReactionPostComment(target_id, code),
    }
}

fn notification(target: ReactionTarget, notice: Notice, code: ReactionCode) -> NewNotification {
    match target {
        ReactionTarget::Question => NewNotification::ReactionQuestion(notice, code),
        ReactionTarget::Answer => NewNotification::ReactionAnswer(notice, code),
        ReactionTarget::AnswerComment => NewNotification::ReactionAnswerComment(notice, code),
        ReactionTarget::Post => NewNotification::ReactionPost(notice, code),
        ReactionTarget::PostComment => NewNotification::ReactionPostComment(notice, code),
    }
}

pub async fn find_reaction<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    target: ReactionTarget,
    target_id: i32,
    code: ReactionCode,
) -> Result<Option<reactions::Model>, DbErr> {
    reactions::Entity::find()
        .filter(reactions::Column::UserId.eq(user_id))
        .filter(reactions::Column::Target.eq(target))
        .filter(reactions::Column::TargetId.eq(target_id))
        .filter(reactions::Column::Code.eq(code))
        .one(db)
        .await
}

/// Reaction counts per code, in the fixed display order. Codes nobody used
/// are left out.
pub async fn reaction_summary<C: ConnectionTrait>(
    db: &C,
    target: ReactionTarget,
    target_id: i32,
    viewer_id: Option<i32>,
) -> Result<Vec<ReactionCount>, DbErr> {
    let rows = reactions::Entity::find()
        .filter(reactions::Column::Target.eq(target))
        .filter(reactions::Column::TargetId.eq(target_id))
        .all(db)
        .await?;

    Ok(ReactionCode::iter()
        .filter_map(|code| {
            let used: Vec<_> = rows.iter().filter(|r| r.code == code).collect();
            if used.is_empty() {
                return None;
            }
            Some(ReactionCount {
                code,
                count: used.len() as u64,
                reacted: viewer_id.map_or(false, |v| used.iter().any(|r| r.user_id == v)),
            })
        })
        .collect())
}

pub async fn add_reaction(
    db: &DatabaseConnection,
    user_id: i32,
    target: ReactionTarget,
    target_id: i32,
    code: ReactionCode,
) -> Result<Vec<ReactionCount>, ServiceError> {
    let txn = db.begin().await?;
    let owner_id = target_owner(&txn, target, target_id).await?;

    if find_reaction(&txn, user_id, target, target_id, code)
        .await?
        .is_some()
    {
        return Err(ServiceError::Conflict(format!("Already reacted with {}", code.as_str())));
    }

    reactions::ActiveModel {
        user_id: Set(user_id),
        target: Set(target),
        target_id: Set(target_id),
        code: Set(code),
        created_at: Set(super::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    activities::create_user_action(&txn, user_id, user_action(target, target_id, code)).await?;
    let notice = notifications::create_notification(
        &txn,
        notification(
            target,
            Notice {
                to_user_id: owner_id,
                from_user_id: user_id,
                target_id,
            },
            code,
        ),
    )
    .await?;

    let summary = reaction_summary(&txn, target, target_id, Some(user_id)).await?;
    txn.commit().await?;
    notifications::publish_notification(notice.as_ref()).await;
    Ok(summary)
}

pub async fn remove_reaction(
    db: &DatabaseConnection,
    user_id: i32,
    target: ReactionTarget,
    target_id: i32,
    code: ReactionCode,
) -> Result<Vec<ReactionCount>, ServiceError> {
    let txn = db.begin().await?;
    let owner_id = target_owner(&txn, target, target_id).await?;
    let reaction = find_reaction(&txn, user_id, target, target_id, code)
        .await?
        .ok_or(ServiceError::NotFound("Reaction"))?;
    reaction.delete(&txn).await?;

    let action = user_action(target, target_id, code);
    activities::delete_user_action(
        &txn,
        user_id,
        &action.action_type().to_value(),
        target_id,
        Some(code.as_str()),
    )
    .await?;

    if owner_id != user_id {
        let kind = notification(
            target,
            Notice {
                to_user_id: owner_id,
                from_user_id: user_id,
                target_id,
            },
            code,
        )
        .notification_type();
        match notifications::delete_notification(
            &txn,
            owner_id,
            &kind.to_value(),
            target_id,
            user_id,
            Some(code.as_str()),
        )
        .await
        {
            Ok(()) | Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let summary = reaction_summary(&txn, target, target_id, Some(user_id)).await?;
    txn.commit().await?;
    Ok(summary)
}

/// Applies a parsed form action.
pub async fn apply_reaction(
    db: &DatabaseConnection,
    user_id: i32,
    target: ReactionTarget,
    target_id: i32,
    action: ReactionAction,
) -> Result<Vec<ReactionCount>, ServiceError> {
    match action {
        ReactionAction::React(code) => add_reaction(db, user_id, target, target_id, code).await,
        ReactionAction::Unreact(code) => {
            remove_reaction(db, user_id, target, target_id, code).await
        }
    }
}

pub(crate) async fn delete_reactions_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<u64, DbErr> {
    let res = reactions::Entity::delete_many()
        .filter(reactions::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

pub(crate) async fn delete_reactions_for_target<C: ConnectionTrait>(
    db: &C,
    target: ReactionTarget,
    target_id: i32,
) -> Result<u64, DbErr> {
    let res = reactions::Entity::delete_many()
        .filter(reactions::Column::Target.eq(target))
        .filter(reactions::Column::TargetId.eq(target_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reaction_action() {
        assert_eq!(
            "react heart".parse::<ReactionAction>().unwrap(),
            ReactionAction::React(ReactionCode::Heart)
        );
        assert_eq!(
            "unreact thumbs_up".parse::<ReactionAction>().unwrap(),
            ReactionAction::Unreact(ReactionCode::ThumbsUp)
        );
    }

    #[test]
    fn test_parse_reaction_action_rejects_unknown() {
        for bad in ["react rocket", "love heart", "react", "", "unreact  "] {
            let err = bad.parse::<ReactionAction>().unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "{}", bad);
        }
    }

    #[test]
    fn test_reaction_target_from_path() {
        assert_eq!(
            "answer-comments".parse::<ReactionTarget>().unwrap(),
            ReactionTarget::AnswerComment
        );
        assert!("votes".parse::<ReactionTarget>().is_err());
    }

    #[test]
    fn test_reaction_notification_keeps_code() {
        let notice = Notice {
            to_user_id: 1,
            from_user_id: 2,
            target_id: 3,
        };
        let n = notification(ReactionTarget::Answer, notice, ReactionCode::Sweat);
        assert_eq!(n.notification_type().to_value(), "reaction_answer");
        assert_eq!(n.value(), Some("sweat"));
    }
}
