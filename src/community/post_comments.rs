//! Comments on posts, with one level of replies.

use super::{bump, check_content, ensure_owner, now, posts};
use crate::activities::{self, NewUserAction};
use crate::commons::{ListQuery, Listable, Page};
use crate::error::ServiceError;
use crate::notifications::{self, NewNotification, Notice};
use crate::orm::notifications::NotificationType;
use crate::orm::reactions::ReactionTarget;
use crate::orm::user_actions::ActionType;
use crate::orm::votes::VoteTarget;
use crate::orm::{post_comment_histories, post_comments, posts as p};
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, Order, TransactionTrait};

impl Listable for post_comments::Entity {
    fn created_at() -> Self::Column {
        post_comments::Column::CreatedAt
    }

    fn text_columns() -> Vec<Self::Column> {
        vec![post_comments::Column::Content]
    }

    fn author_column() -> Option<Self::Column> {
        Some(post_comments::Column::UserId)
    }
}

/// Top-level comments of a post, oldest first.
pub async fn list_post_comments(
    db: &DatabaseConnection,
    post_id: i32,
    query: &ListQuery,
) -> Result<Page<post_comments::Model>, ServiceError> {
    posts::get_post(db, post_id).await?;
    let select = post_comments::Entity::find()
        .filter(post_comments::Column::PostId.eq(post_id))
        .filter(post_comments::Column::ParentId.is_null())
        .filter(post_comments::Column::DeletedAt.is_null());
    query.fetch(db, select, Order::Asc).await
}

/// Replies to one top-level comment, oldest first.
pub async fn list_comment_replies(
    db: &DatabaseConnection,
    post_id: i32,
    comment_id: i32,
    query: &ListQuery,
) -> Result<Page<post_comments::Model>, ServiceError> {
    get_comment_of_post(db, post_id, comment_id).await?;
    let select = post_comments::Entity::find()
        .filter(post_comments::Column::ParentId.eq(comment_id))
        .filter(post_comments::Column::DeletedAt.is_null());
    query.fetch(db, select, Order::Asc).await
}

pub async fn get_post_comment<C: ConnectionTrait>(
    db: &C,
    comment_id: i32,
) -> Result<post_comments::Model, ServiceError> {
    post_comments::Entity::find_by_id(comment_id)
        .filter(post_comments::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Comment"))
}

async fn get_comment_of_post<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
    comment_id: i32,
) -> Result<post_comments::Model, ServiceError> {
    let comment = get_post_comment(db, comment_id).await?;
    if comment.post_id != post_id {
        return Err(ServiceError::NotFound("Comment"));
    }
    Ok(comment)
}

async fn insert_comment<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    post_id: i32,
    parent_id: Option<i32>,
    content: String,
) -> Result<post_comments::Model, ServiceError> {
    let comment = post_comments::ActiveModel {
        user_id: Set(user_id),
        post_id: Set(post_id),
        parent_id: Set(parent_id),
        content: Set(content),
        vote_count: Set(0),
        comment_count: Set(0),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    activities::create_user_action(db, user_id, NewUserAction::CreatePostComment(comment.id))
        .await?;
    Ok(comment)
}

/// Comments on a post and tells the post's author.
pub async fn create_post_comment(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
    content: &str,
) -> Result<post_comments::Model, ServiceError> {
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let post = posts::get_post(&txn, post_id).await?;
    let comment = insert_comment(&txn, user_id, post.id, None, content).await?;

    bump(&txn, p::Entity, p::Column::CommentCount, p::Column::Id, post.id, 1).await?;
    let notice = notifications::create_notification(
        &txn,
        NewNotification::CreatePostComment(Notice {
            to_user_id: post.user_id,
            from_user_id: user_id,
            target_id: comment.id,
        }),
    )
    .await?;
    txn.commit().await?;
    notifications::publish_notification(notice.as_ref()).await;

    Ok(comment)
}

/// Replies to a top-level comment and tells that comment's author.
pub async fn create_comment_reply(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
    parent_id: i32,
    content: &str,
) -> Result<post_comments::Model, ServiceError> {
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let parent = get_comment_of_post(&txn, post_id, parent_id).await?;
    if parent.parent_id.is_some() {
        return Err(ServiceError::validation("Replies cannot be replied to"));
    }

    let reply = insert_comment(&txn, user_id, post_id, Some(parent.id), content).await?;
    bump(
        &txn,
        post_comments::Entity,
        post_comments::Column::CommentCount,
        post_comments::Column::Id,
        parent.id,
        1,
    )
    .await?;
    let notice = notifications::create_notification(
        &txn,
        NewNotification::CreatePostComment(Notice {
            to_user_id: parent.user_id,
            from_user_id: user_id,
            target_id: reply.id,
        }),
    )
    .await?;
    txn.commit().await?;
    notifications::publish_notification(notice.as_ref()).await;

    Ok(reply)
}

pub async fn update_post_comment(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
    comment_id: i32,
    content: &str,
) -> Result<post_comments::Model, ServiceError> {
    let txn = db.begin().await?;
    let old = get_comment_of_post(&txn, post_id, comment_id).await?;
    ensure_owner(old.user_id, user_id)?;
    let content = check_content(content)?;

    post_comment_histories::ActiveModel {
        post_comment_id: Set(old.id),
        content: Set(old.content.clone()),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut comment: post_comments::ActiveModel = old.into();
    comment.content = Set(content);
    comment.updated_at = Set(Some(now()));
    let comment = comment.update(&txn).await?;
    txn.commit().await?;

    Ok(comment)
}

/// Drops the votes, reactions, actions, notifications and history of a
/// comment. The comment row itself is left to the caller.
pub(crate) async fn purge_post_comment_refs<C: ConnectionTrait>(
    db: &C,
    comment_id: i32,
) -> Result<(), ServiceError> {
    super::votes::delete_votes_for_target(db, VoteTarget::PostComment, comment_id).await?;
    super::reactions::delete_reactions_for_target(db, ReactionTarget::PostComment, comment_id)
        .await?;
    activities::delete_user_actions_for_target(
        db,
        &[
            ActionType::CreatePostComment,
            ActionType::VotePostComment,
            ActionType::ReactionPostComment,
        ],
        comment_id,
    )
    .await?;
    notifications::delete_notifications_for_target(
        db,
        &[
            NotificationType::CreatePostComment,
            NotificationType::VotePostComment,
            NotificationType::ReactionPostComment,
        ],
        comment_id,
    )
    .await?;
    post_comment_histories::Entity::delete_many()
        .filter(post_comment_histories::Column::PostCommentId.eq(comment_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Deletes a comment. A top-level comment takes its replies with it.
pub async fn delete_post_comment(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
    comment_id: i32,
) -> Result<post_comments::Model, ServiceError> {
    let txn = db.begin().await?;
    let comment = get_comment_of_post(&txn, post_id, comment_id).await?;
    ensure_owner(comment.user_id, user_id)?;

    remove_post_comment(&txn, &comment).await?;
    txn.commit().await?;

    Ok(comment)
}

/// Deletes a comment with its replies and takes it off its parent's count.
/// The caller owns the transaction.
pub(crate) async fn remove_post_comment<C: ConnectionTrait>(
    db: &C,
    comment: &post_comments::Model,
) -> Result<(), ServiceError> {
    let replies = post_comments::Entity::find()
        .filter(post_comments::Column::ParentId.eq(comment.id))
        .all(db)
        .await?;
    for reply in &replies {
        purge_post_comment_refs(db, reply.id).await?;
        post_comments::Entity::delete_by_id(reply.id)
            .exec(db)
            .await?;
    }
    purge_post_comment_refs(db, comment.id).await?;
    post_comments::Entity::delete_by_id(comment.id)
        .exec(db)
        .await?;

    match comment.parent_id {
        Some(parent_id) => {
            bump(
                db,
                post_comments::Entity,
                post_comments::Column::CommentCount,
                post_comments::Column::Id,
                parent_id,
                -1,
            )
            .await?
        }
        None => {
            bump(db, p::Entity, p::Column::CommentCount, p::Column::Id, comment.post_id, -1)
                .await?
        }
    }
    Ok(())
}
