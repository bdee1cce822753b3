//! SeaORM Entity for post_tags table

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "post_tags")]
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
    #[sea_orm(has_many = "super::post_tag_links::Entity")]
    Links,
}

impl Related<super::posts::Entity> for Entity {
    fn to() -> RelationDef {
        super::post_tag_links::Relation::Post.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::post_tag_links::Relation::Tag.def().rev())
    }
}

impl Related<super::post_tag_links::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Links.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
