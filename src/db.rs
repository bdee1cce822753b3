//! Database connection and schema setup.

use crate::orm::*;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;

/// Opens a connection pool.
///
/// In-memory SQLite databases live and die with their connection, so they
/// are pinned to a single connection that is never recycled.
pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());
    if url.starts_with("sqlite::memory:") {
        opt.max_connections(1)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(u32::MAX as u64))
            .max_lifetime(Duration::from_secs(u32::MAX as u64));
    } else {
        opt.max_connections(max_connections)
            .connect_timeout(Duration::from_secs(8));
    }
    opt.sqlx_logging(false);

    let db = Database::connect(opt).await?;
    log::info!("Connected to database ({:?})", db.get_database_backend());
    Ok(db)
}

/// Connects and makes sure every table exists.
pub async fn init_db(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let db = connect(url, max_connections).await?;
    create_schema(&db).await?;
    Ok(db)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let stmt = schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, stmt: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Creates every table in foreign key order, then the composite unique
/// indexes the entity derive cannot express. Safe to run repeatedly.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, user_avatars::Entity).await?;
    create_table(db, user_backdrops::Entity).await?;
    create_table(db, user_sns::Entity).await?;
    create_table(db, user_verification_emails::Entity).await?;
    create_table(db, user_password_resets::Entity).await?;

    create_table(db, questions::Entity).await?;
    create_table(db, question_histories::Entity).await?;
    create_table(db, question_tags::Entity).await?;
    create_table(db, question_tag_links::Entity).await?;
    create_table(db, question_images::Entity).await?;
    create_table(db, answers::Entity).await?;
    create_table(db, answer_histories::Entity).await?;
    create_table(db, answer_comments::Entity).await?;
    create_table(db, answer_comment_histories::Entity).await?;

    create_table(db, posts::Entity).await?;
    create_table(db, post_histories::Entity).await?;
    create_table(db, post_tags::Entity).await?;
    create_table(db, post_tag_links::Entity).await?;
    create_table(db, post_images::Entity).await?;
    create_table(db, post_comments::Entity).await?;
    create_table(db, post_comment_histories::Entity).await?;

    create_table(db, votes::Entity).await?;
    create_table(db, reactions::Entity).await?;
    create_table(db, user_actions::Entity).await?;
    create_table(db, notifications::Entity).await?;

    create_index(
        db,
        Index::create()
            .name("ux_votes_user_target")
            .table(votes::Entity)
            .col(votes::Column::UserId)
            .col(votes::Column::Target)
            .col(votes::Column::TargetId)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("ux_reactions_user_target_code")
            .table(reactions::Entity)
            .col(reactions::Column::UserId)
            .col(reactions::Column::Target)
            .col(reactions::Column::TargetId)
            .col(reactions::Column::Code)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("ux_notifications_user_type_value_target_from")
            .table(notifications::Entity)
            .col(notifications::Column::UserId)
            .col(notifications::Column::NotificationType)
            .col(notifications::Column::NotificationValue)
            .col(notifications::Column::NotificationTargetId)
            .col(notifications::Column::FromUserId)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;
    create_index(
        db,
        Index::create()
            .name("ix_user_actions_user_created")
            .table(user_actions::Entity)
            .col(user_actions::Column::UserId)
            .col(user_actions::Column::CreatedAt)
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    log::debug!("Schema is up to date");
    Ok(())
}
