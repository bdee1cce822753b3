//! Up-votes on questions, answers, posts and post comments.
//!
//! A user votes a piece of content at most once. Each vote moves the
//! target's `vote_count`, is logged as a user action and tells the
//! content's author.

use super::{answers, bump, post_comments, posts, questions};
use crate::activities::{self, NewUserAction};
use crate::error::ServiceError;
use crate::notifications::{self, NewNotification, Notice};
use crate::orm::votes::{self, VoteTarget};
use crate::orm::{answers as a, post_comments as pc, posts as p, questions as q};
use sea_orm::{
    entity::*, query::*, ActiveEnum, ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait,
};
use std::str::FromStr;

impl FromStr for VoteTarget {
    type Err = ServiceError;

    /// Parses the plural path segment used in URLs, e.g. `post-comments`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "questions" => Ok(VoteTarget::Question),
            "answers" => Ok(VoteTarget::Answer),
            "posts" => Ok(VoteTarget::Post),
            "post-comments" => Ok(VoteTarget::PostComment),
            _ => Err(ServiceError::NotFound("Vote target")),
        }
    }
}

/// Author of the target. 404 when it does not exist.
async fn target_owner<C: ConnectionTrait>(
    db: &C,
    target: VoteTarget,
    target_id: i32,
) -> Result<i32, ServiceError> {
    Ok(match target {
        VoteTarget::Question => questions::get_question(db, target_id).await?.user_id,
        VoteTarget::Answer => answers::get_answer(db, target_id).await?.user_id,
        VoteTarget::Post => posts::get_post(db, target_id).await?.user_id,
        VoteTarget::PostComment => post_comments::get_post_comment(db, target_id).await?.user_id,
    })
}

async fn bump_votes<C: ConnectionTrait>(
    db: &C,
    target: VoteTarget,
    target_id: i32,
    delta: i32,
) -> Result<(), DbErr> {
    match target {
        VoteTarget::Question => {
            bump(db, q::Entity, q::Column::VoteCount, q::Column::Id, target_id, delta).await
        }
        VoteTarget::Answer => {
            bump(db, a::Entity, a::Column::VoteCount, a::Column::Id, target_id, delta).await
        }
        VoteTarget::Post => {
            bump(db, p::Entity, p::Column::VoteCount, p::Column::Id, target_id, delta).await
        }
        VoteTarget::PostComment => {
            bump(db, pc::Entity, pc::Column::VoteCount, pc::Column::Id, target_id, delta).await
        }
    }
}

/// Current `vote_count` of the target.
pub async fn vote_count<C: ConnectionTrait>(
    db: &C,
    target: VoteTarget,
    target_id: i32,
) -> Result<i32, ServiceError> {
    let count = match target {
        VoteTarget::Question => q::Entity::find_by_id(target_id)
            .one(db)
            .await?
            .map(|m| m.vote_count),
        VoteTarget::Answer => a::Entity::find_by_id(target_id)
            .one(db)
            .await?
            .map(|m| m.vote_count),
        VoteTarget::Post => p::Entity::find_by_id(target_id)
            .one(db)
            .await?
            .map(|m| m.vote_count),
        VoteTarget::PostComment => pc::Entity::find_by_id(target_id)
            .one(db)
            .await?
            .map(|m| m.vote_count),
    };
    count.ok_or(ServiceError::NotFound("Vote target"))
}

fn user_action(target: VoteTarget, target_id: i32) -> NewUserAction {
    match target {
        VoteTarget::Question => NewUserAction::VoteQuestion(target_id),
        VoteTarget::Answer => NewUserAction::VoteAnswer(target_id),
        VoteTarget::Post => NewUserAction::VotePost(target_id),
        VoteTarget::PostComment => NewUserAction::VotePostComment(target_id),
    }
}

fn notification(target: VoteTarget, notice: Notice) -> NewNotification {
    match target {
        VoteTarget::Question => NewNotification::VoteQuestion(notice),
        VoteTarget::Answer => NewNotification::VoteAnswer(notice),
        VoteTarget::Post => NewNotification::VotePost(notice),
        VoteTarget::PostComment => NewNotification::VotePostComment(notice),
    }
}

pub async fn find_vote<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    target: VoteTarget,
    target_id: i32,
) -> Result<Option<votes::Model>, DbErr> {
    votes::Entity::find()
        .filter(votes::Column::UserId.eq(user_id))
        .filter(votes::Column::Target.eq(target))
        .filter(votes::Column::TargetId.eq(target_id))
        .one(db)
        .await
}

/// Records a vote. Returns the new vote count.
pub async fn cast_vote(
    db: &DatabaseConnection,
    user_id: i32,
    target: VoteTarget,
    target_id: i32,
) -> Result<i32, ServiceError> {
    let txn = db.begin().await?;
    let owner_id = target_owner(&txn, target, target_id).await?;

    if find_vote(&txn, user_id, target, target_id).await?.is_some() {
        return Err(ServiceError::Conflict("Already voted".to_owned()).with_trigger("already-voted"));
    }

    votes::ActiveModel {
        user_id: Set(user_id),
        target: Set(target),
        target_id: Set(target_id),
        created_at: Set(super::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    bump_votes(&txn, target, target_id, 1).await?;
    let action = user_action(target, target_id);
    activities::create_user_action(&txn, user_id, action).await?;
    let notice = notifications::create_notification(
        &txn,
        notification(
            target,
            Notice {
                to_user_id: owner_id,
                from_user_id: user_id,
                target_id,
            },
        ),
    )
    .await?;

    let count = vote_count(&txn, target, target_id).await?;
    txn.commit().await?;
    notifications::publish_notification(notice.as_ref()).await;

    log::info!("User {} voted {:?} {}", user_id, target, target_id);
    Ok(count)
}

/// Takes a vote back. Returns the new vote count.
pub async fn retract_vote(
    db: &DatabaseConnection,
    user_id: i32,
    target: VoteTarget,
    target_id: i32,
) -> Result<i32, ServiceError> {
    let txn = db.begin().await?;
    let owner_id = target_owner(&txn, target, target_id).await?;
    let vote = find_vote(&txn, user_id, target, target_id)
        .await?
        .ok_or(ServiceError::NotFound("Vote"))?;

    vote.delete(&txn).await?;
    bump_votes(&txn, target, target_id, -1).await?;

    let action = user_action(target, target_id);
    activities::delete_user_action(
        &txn,
        user_id,
        &action.action_type().to_value(),
        target_id,
        None,
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
        )
        .notification_type();
        match notifications::delete_notification(
            &txn,
            owner_id,
            &kind.to_value(),
            target_id,
            user_id,
            None,
        )
        .await
        {
            Ok(()) | Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let count = vote_count(&txn, target, target_id).await?;
    txn.commit().await?;

    Ok(count)
}

/// Takes back every vote a user cast, moving each target's count down.
/// The matching actions and notifications are left to the caller.
pub(crate) async fn retract_votes_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<usize, DbErr> {
    let cast = votes::Entity::find()
        .filter(votes::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    for vote in &cast {
        bump_votes(db, vote.target, vote.target_id, -1).await?;
    }
    votes::Entity::delete_many()
        .filter(votes::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(cast.len())
}

/// Removes every vote on the target. Used when the target is deleted.
pub(crate) async fn delete_votes_for_target<C: ConnectionTrait>(
    db: &C,
    target: VoteTarget,
    target_id: i32,
) -> Result<u64, DbErr> {
    let res = votes::Entity::delete_many()
        .filter(votes::Column::Target.eq(target))
        .filter(votes::Column::TargetId.eq(target_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_target_from_path() {
        assert_eq!(
            "post-comments".parse::<VoteTarget>().unwrap(),
            VoteTarget::PostComment
        );
        assert_eq!("questions".parse::<VoteTarget>().unwrap(), VoteTarget::Question);
        // Answer comments cannot be voted on.
        assert!("answer-comments".parse::<VoteTarget>().is_err());
    }

    #[test]
    fn test_dispatch_matches_target() {
        assert_eq!(
            user_action(VoteTarget::Answer, 4).action_type().to_value(),
            "vote_answer"
        );
        let notice = Notice {
            to_user_id: 1,
            from_user_id: 2,
            target_id: 4,
        };
        assert_eq!(
            notification(VoteTarget::PostComment, notice)
                .notification_type()
                .to_value(),
            "vote_post_comment"
        );
    }
}
