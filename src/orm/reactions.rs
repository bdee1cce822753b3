//! SeaORM Entity for reactions table

use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "reactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub target: ReactionTarget,
    pub target_id: i32,
    pub code: ReactionCode,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReactionTarget {
    #[sea_orm(string_value = "question")]
    Question,
    #[sea_orm(string_value = "answer")]
    Answer,
    #[sea_orm(string_value = "answer_comment")]
    AnswerComment,
    #[sea_orm(string_value = "post")]
    Post,
    #[sea_orm(string_value = "post_comment")]
    PostComment,
}

/// The closed set of reactions. Stored as plain text; anything else is
/// turned away before it reaches the database.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum ReactionCode {
    #[sea_orm(string_value = "thumbs_up")]
    ThumbsUp,
    #[sea_orm(string_value = "thumbs_down")]
    ThumbsDown,
    #[sea_orm(string_value = "heart")]
    Heart,
    #[sea_orm(string_value = "tada")]
    Tada,
    #[sea_orm(string_value = "smile")]
    Smile,
    #[sea_orm(string_value = "sweat")]
    Sweat,
    #[sea_orm(string_value = "eyes")]
    Eyes,
}

impl ReactionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionCode::ThumbsUp => "thumbs_up",
            ReactionCode::ThumbsDown => "thumbs_down",
            ReactionCode::Heart => "heart",
            ReactionCode::Tada => "tada",
            ReactionCode::Smile => "smile",
            ReactionCode::Sweat => "sweat",
            ReactionCode::Eyes => "eyes",
        }
    }
}

impl std::str::FromStr for ReactionCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReactionCode::iter().find(|c| c.as_str() == s).ok_or(())
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_code_parse() {
        assert_eq!("heart".parse::<ReactionCode>(), Ok(ReactionCode::Heart));
        assert_eq!(
            "thumbs_down".parse::<ReactionCode>(),
            Ok(ReactionCode::ThumbsDown)
        );
        assert!("rocket".parse::<ReactionCode>().is_err());
        assert!("Heart".parse::<ReactionCode>().is_err());
    }
}
