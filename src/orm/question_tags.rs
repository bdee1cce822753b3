//! SeaORM Entity for question_tags table

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "question_tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Case-sensitive; looked up by exact match.
    #[sea_orm(unique)]
    pub name: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question_tag_links::Entity")]
    Links,
}

impl Related<super::questions::Entity> for Entity {
    fn to() -> RelationDef {
        super::question_tag_links::Relation::Question.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::question_tag_links::Relation::Tag.def().rev())
    }
}

impl Related<super::question_tag_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Links.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
