//! Notification inbox.
//!
//! A notification tells a content owner that someone else answered,
//! commented, voted or reacted. Nobody is notified about their own doings.

use crate::commons::{ListQuery, Listable, Page};
use crate::error::ServiceError;
use crate::orm::notifications::{self, NotificationType};
use crate::orm::reactions::ReactionCode;
use crate::sse::{self, EventStream};
use chrono::Utc;
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ActiveEnum, ConnectionTrait, DatabaseConnection, DbErr,
    Iterable, Order,
};

pub use crate::orm::notifications::NotificationType as Type;

/// SSE event name used for new notifications.
pub const SSE_EVENT: &str = "notification";

/// Who is told about what.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notice {
    /// Content owner, the recipient.
    pub to_user_id: i32,
    /// The user who acted.
    pub from_user_id: i32,
    pub target_id: i32,
}

/// A notification about to be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewNotification {
    CreateAnswer(Notice),
    CreateAnswerComment(Notice),
    CreatePostComment(Notice),
    VotePost(Notice),
    VotePostComment(Notice),
    VoteQuestion(Notice),
    VoteAnswer(Notice),
    ReactionPost(Notice, ReactionCode),
    ReactionPostComment(Notice, ReactionCode),
    ReactionQuestion(Notice, ReactionCode),
    ReactionAnswer(Notice, ReactionCode),
    ReactionAnswerComment(Notice, ReactionCode),
}

impl NewNotification {
    pub fn notification_type(&self) -> NotificationType {
        match self {
            Self::CreateAnswer(_) => NotificationType::CreateAnswer,
            Self::CreateAnswerComment(_) => NotificationType::CreateAnswerComment,
            Self::CreatePostComment(_) => NotificationType::CreatePostComment,
            Self::VotePost(_) => NotificationType::VotePost,
            Self::VotePostComment(_) => NotificationType::VotePostComment,
            Self::VoteQuestion(_) => NotificationType::VoteQuestion,
            Self::VoteAnswer(_) => NotificationType::VoteAnswer,
            Self::ReactionPost(..) => NotificationType::ReactionPost,
            Self::ReactionPostComment(..) => NotificationType::ReactionPostComment,
            Self::ReactionQuestion(..) => NotificationType::ReactionQuestion,
            Self::ReactionAnswer(..) => NotificationType::ReactionAnswer,
            Self::ReactionAnswerComment(..) => NotificationType::ReactionAnswerComment,
        }
    }

    pub fn notice(&self) -> &Notice {
        match self {
            Self::CreateAnswer(n)
            | Self::CreateAnswerComment(n)
            | Self::CreatePostComment(n)
            | Self::VotePost(n)
            | Self::VotePostComment(n)
            | Self::VoteQuestion(n)
            | Self::VoteAnswer(n)
            | Self::ReactionPost(n, _)
            | Self::ReactionPostComment(n, _)
            | Self::ReactionQuestion(n, _)
            | Self::ReactionAnswer(n, _)
            | Self::ReactionAnswerComment(n, _) => n,
        }
    }

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

pub fn parse_notification_type(name: &str) -> Result<NotificationType, ServiceError> {
    NotificationType::iter()
        .find(|t| t.to_value() == name)
        .ok_or_else(|| ServiceError::validation(format!("Unknown notification type `{}`", name)))
}

impl Listable for notifications::Entity {
    fn created_at() -> Self::Column {
        notifications::Column::CreatedAt
    }

    fn text_columns() -> Vec<Self::Column> {
        vec![notifications::Column::Data]
    }

    /// Searching by author finds notifications sent by that user.
    fn author_column() -> Option<Self::Column> {
        Some(notifications::Column::FromUserId)
    }
}

/// Stores the notification. Returns `None` when the actor is the recipient.
///
/// Nothing is pushed yet: the caller publishes with [`publish_notification`]
/// once its transaction has committed.
pub async fn create_notification<C: ConnectionTrait>(
    db: &C,
    new: NewNotification,
) -> Result<Option<notifications::Model>, DbErr> {
    let notice = *new.notice();
    if notice.to_user_id == notice.from_user_id {
        return Ok(None);
    }

    let notification = notifications::ActiveModel {
        user_id: Set(notice.to_user_id),
        notification_type: Set(new.notification_type()),
        notification_value: Set(new.value().map(str::to_owned)),
        notification_target_id: Set(Some(notice.target_id)),
        from_user_id: Set(Some(notice.from_user_id)),
        to_user_id: Set(Some(notice.to_user_id)),
        data: Set(None),
        read: Set(false),
        urgent: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!(
        "Notified user {} of {:?} by user {}",
        notice.to_user_id,
        notification.notification_type,
        notice.from_user_id
    );
    Ok(Some(notification))
}

/// Pushes a committed notification to the recipient's stream.
pub async fn publish_notification(notification: Option<&notifications::Model>) {
    let Some(notification) = notification else {
        return;
    };
    match serde_json::to_string(notification) {
        Ok(data) => {
            sse::publish_to_user(
                notification.user_id,
                &EventStream {
                    id: Some(notification.id.to_string()),
                    ..EventStream::message(SSE_EVENT, data)
                },
            )
            .await
        }
        Err(e) => log::error!("Failed to serialize notification {}: {}", notification.id, e),
    }
}

/// Deletes the notification a retracted vote or reaction produced.
pub async fn delete_notification<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    notification_type: &str,
    target_id: i32,
    from_user_id: i32,
    value: Option<&str>,
) -> Result<(), ServiceError> {
    let notification_type = parse_notification_type(notification_type)?;

    let mut select = notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::NotificationType.eq(notification_type))
        .filter(notifications::Column::NotificationTargetId.eq(target_id))
        .filter(notifications::Column::FromUserId.eq(from_user_id));
    select = match value {
        Some(value) => select.filter(notifications::Column::NotificationValue.eq(value)),
        None => select.filter(notifications::Column::NotificationValue.is_null()),
    };

    let notification = select
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Notification"))?;
    notification.delete(db).await?;
    Ok(())
}

/// Removes every notification of the given types about `target_id`.
pub async fn delete_notifications_for_target<C: ConnectionTrait>(
    db: &C,
    notification_types: &[NotificationType],
    target_id: i32,
) -> Result<u64, DbErr> {
    let res = notifications::Entity::delete_many()
        .filter(
            notifications::Column::NotificationType.is_in(notification_types.iter().copied()),
        )
        .filter(notifications::Column::NotificationTargetId.eq(target_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// Removes every notification the user caused in other inboxes.
pub async fn delete_notifications_from_user<C: ConnectionTrait>(
    db: &C,
    from_user_id: i32,
) -> Result<u64, DbErr> {
    let res = notifications::Entity::delete_many()
        .filter(notifications::Column::FromUserId.eq(from_user_id))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}

/// One page of the user's inbox, newest first.
pub async fn list_notifications(
    db: &DatabaseConnection,
    user_id: i32,
    query: &ListQuery,
) -> Result<Page<notifications::Model>, ServiceError> {
    let select = notifications::Entity::find().filter(notifications::Column::UserId.eq(user_id));
    query.fetch(db, select, Order::Desc).await
}

pub async fn count_unread<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::Read.eq(false))
        .count(db)
        .await
}

/// Marks one notification read. 404 unless it belongs to `user_id`.
pub async fn mark_read<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    notification_id: i32,
) -> Result<notifications::Model, ServiceError> {
    let notification = notifications::Entity::find_by_id(notification_id)
        .filter(notifications::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Notification"))?;

    if notification.read {
        return Ok(notification);
    }

    let mut active: notifications::ActiveModel = notification.into();
    active.read = Set(true);
    active.updated_at = Set(Some(Utc::now().naive_utc()));
    Ok(active.update(db).await?)
}

/// Returns how many notifications changed.
pub async fn mark_all_read<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64, DbErr> {
    let res = notifications::Entity::update_many()
        .col_expr(notifications::Column::Read, Expr::value(true))
        .col_expr(
            notifications::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(notifications::Column::UserId.eq(user_id))
        .filter(notifications::Column::Read.eq(false))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
