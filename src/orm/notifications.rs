//! SeaORM Entity for notifications table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Recipient.
    pub user_id: i32,
    pub notification_type: NotificationType,
    /// Reaction code for `reaction_*` notifications.
    pub notification_value: Option<String>,
    /// Id of the content the notification is about; not a foreign key.
    pub notification_target_id: Option<i32>,
    pub from_user_id: Option<i32>,
    pub to_user_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub data: Option<String>,
    pub read: bool,
    pub urgent: bool,
    pub created_at: DateTime,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(40))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[sea_orm(string_value = "create_answer")]
    CreateAnswer,
    #[sea_orm(string_value = "create_answer_comment")]
    CreateAnswerComment,
    #[sea_orm(string_value = "create_post_comment")]
    CreatePostComment,
    #[sea_orm(string_value = "vote_post")]
    VotePost,
    #[sea_orm(string_value = "vote_post_comment")]
    VotePostComment,
    #[sea_orm(string_value = "vote_question")]
    VoteQuestion,
    #[sea_orm(string_value = "vote_answer")]
    VoteAnswer,
    #[sea_orm(string_value = "reaction_post")]
    ReactionPost,
    #[sea_orm(string_value = "reaction_post_comment")]
    ReactionPostComment,
    #[sea_orm(string_value = "reaction_question")]
    ReactionQuestion,
    #[sea_orm(string_value = "reaction_answer")]
    ReactionAnswer,
    #[sea_orm(string_value = "reaction_answer_comment")]
    ReactionAnswerComment,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FromUserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    FromUser,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
