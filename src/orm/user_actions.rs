//! SeaORM Entity for user_actions table
//!
//! Append-only activity log. `target_id` refers to whichever table the
//! `action_type` implies and is not a foreign key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "user_actions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub action_type: ActionType,
    /// Reaction code for `reaction_*` actions.
    pub action_value: Option<String>,
    pub target_id: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(40))")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    #[sea_orm(string_value = "create_post")]
    CreatePost,
    #[sea_orm(string_value = "create_question")]
    CreateQuestion,
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
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
