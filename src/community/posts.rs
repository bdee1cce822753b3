//! Posts on the category boards.

use super::{bump, check_category, check_content, check_title, ensure_author, now, tags};
use crate::activities::{self, NewUserAction};
use crate::commons::{ListQuery, Listable, Page};
use crate::error::ServiceError;
use crate::notifications;
use crate::orm::notifications::NotificationType;
use crate::orm::reactions::ReactionTarget;
use crate::orm::user_actions::ActionType;
use crate::orm::votes::VoteTarget;
use crate::orm::{post_comments, post_histories, post_images, post_tag_links, posts, users};
use sea_orm::sea_query::Expr;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, Order, TransactionTrait};
use serde::Serialize;

impl Listable for posts::Entity {
    fn created_at() -> Self::Column {
        posts::Column::CreatedAt
    }

    fn text_columns() -> Vec<Self::Column> {
        vec![posts::Column::Title, posts::Column::Content]
    }

    fn author_column() -> Option<Self::Column> {
        Some(posts::Column::UserId)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: posts::Model,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

pub async fn list_posts_by_category(
    db: &DatabaseConnection,
    category: &str,
    query: &ListQuery,
) -> Result<Page<posts::Model>, ServiceError> {
    check_category(category)?;
    let select = posts::Entity::find()
        .filter(posts::Column::Category.eq(category))
        .filter(posts::Column::DeletedAt.is_null());
    query.fetch(db, select, Order::Desc).await
}

pub async fn get_post<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
) -> Result<posts::Model, ServiceError> {
    posts::Entity::find_by_id(post_id)
        .filter(posts::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Post"))
}

pub async fn view_post(db: &DatabaseConnection, post_id: i32) -> Result<PostView, ServiceError> {
    get_post(db, post_id).await?;
    bump(
        db,
        posts::Entity,
        posts::Column::ViewCount,
        posts::Column::Id,
        post_id,
        1,
    )
    .await?;

    let post = get_post(db, post_id).await?;
    let author = users::Entity::find_by_id(post.user_id)
        .one(db)
        .await?
        .map(|u| u.nickname);
    let tags = tags::post_tags_of(db, post_id)
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    Ok(PostView { post, author, tags })
}

pub async fn create_post(
    db: &DatabaseConnection,
    user_id: i32,
    category: &str,
    title: &str,
    content: &str,
    tag_names: &[String],
) -> Result<posts::Model, ServiceError> {
    check_category(category)?;
    let title = check_title(title)?;
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let post = posts::ActiveModel {
        user_id: Set(user_id),
        category: Set(category.to_owned()),
        title: Set(title),
        content: Set(content),
        view_count: Set(0),
        vote_count: Set(0),
        comment_count: Set(0),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    tags::set_post_tags(&txn, post.id, tag_names).await?;
    activities::create_user_action(&txn, user_id, NewUserAction::CreatePost(post.id)).await?;
    txn.commit().await?;

    log::info!("User {} posted {} in {}", user_id, post.id, category);
    Ok(post)
}

pub async fn update_post(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
    title: &str,
    content: &str,
    tag_names: &[String],
) -> Result<posts::Model, ServiceError> {
    let title = check_title(title)?;
    let content = check_content(content)?;

    let txn = db.begin().await?;
    let old = get_post(&txn, post_id).await?;
    ensure_author(old.user_id, user_id)?;

    post_histories::ActiveModel {
        post_id: Set(old.id),
        title: Set(old.title.clone()),
        content: Set(old.content.clone()),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut post: posts::ActiveModel = old.into();
    post.title = Set(title);
    post.content = Set(content);
    post.updated_at = Set(Some(now()));
    let post = post.update(&txn).await?;

    tags::set_post_tags(&txn, post.id, tag_names).await?;
    txn.commit().await?;

    Ok(post)
}

/// Deletes a post for good, together with its comments, replies, history,
/// tag links and every vote, reaction, action and notification about any
/// of them. Uploaded images stay but are detached.
pub async fn delete_post(
    db: &DatabaseConnection,
    user_id: i32,
    post_id: i32,
) -> Result<posts::Model, ServiceError> {
    let txn = db.begin().await?;
    let post = get_post(&txn, post_id).await?;
    ensure_author(post.user_id, user_id)?;

    let comments = purge_post(&txn, &post).await?;
    txn.commit().await?;

    log::info!(
        "User {} deleted post {} and {} comments",
        user_id,
        post_id,
        comments
    );
    Ok(post)
}

/// Removes the post and everything hanging off it. Returns how many
/// comments went with it. The caller owns the transaction.
pub(crate) async fn purge_post<C: ConnectionTrait>(
    db: &C,
    post: &posts::Model,
) -> Result<usize, ServiceError> {
    let comments = post_comments::Entity::find()
        .filter(post_comments::Column::PostId.eq(post.id))
        .all(db)
        .await?;
    for comment in &comments {
        super::post_comments::purge_post_comment_refs(db, comment.id).await?;
    }
    // Replies first; not every backend cascades the self reference.
    post_comments::Entity::delete_many()
        .filter(post_comments::Column::PostId.eq(post.id))
        .filter(post_comments::Column::ParentId.is_not_null())
        .exec(db)
        .await?;
    post_comments::Entity::delete_many()
        .filter(post_comments::Column::PostId.eq(post.id))
        .exec(db)
        .await?;

    super::votes::delete_votes_for_target(db, VoteTarget::Post, post.id).await?;
    super::reactions::delete_reactions_for_target(db, ReactionTarget::Post, post.id).await?;
    activities::delete_user_actions_for_target(
        db,
        &[
            ActionType::CreatePost,
            ActionType::VotePost,
            ActionType::ReactionPost,
        ],
        post.id,
    )
    .await?;
    notifications::delete_notifications_for_target(
        db,
        &[NotificationType::VotePost, NotificationType::ReactionPost],
        post.id,
    )
    .await?;

    post_histories::Entity::delete_many()
        .filter(post_histories::Column::PostId.eq(post.id))
        .exec(db)
        .await?;
    post_tag_links::Entity::delete_many()
        .filter(post_tag_links::Column::PostId.eq(post.id))
        .exec(db)
        .await?;
    post_images::Entity::update_many()
        .col_expr(post_images::Column::PostId, Expr::value(Option::<i32>::None))
        .filter(post_images::Column::PostId.eq(post.id))
        .exec(db)
        .await?;
    posts::Entity::delete_by_id(post.id).exec(db).await?;
    Ok(comments.len())
}

pub async fn list_post_histories(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<post_histories::Model>, ServiceError> {
    Ok(post_histories::Entity::find()
        .filter(post_histories::Column::PostId.eq(post_id))
        .order_by_asc(post_histories::Column::Id)
        .all(db)
        .await?)
}
