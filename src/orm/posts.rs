//! SeaORM Entity for posts table

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    /// Board the post lives on, e.g. `free` or `notice`.
    pub category: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub view_count: i32,
    pub vote_count: i32,
    /// Number of top-level comments.
    pub comment_count: i32,
    pub created_at: DateTime,
    pub updated_at: Option<DateTime>,
    pub deleted_at: Option<DateTime>,
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
    #[sea_orm(has_many = "super::post_comments::Entity")]
    Comments,
    #[sea_orm(has_many = "super::post_histories::Entity")]
    Histories,
    #[sea_orm(has_many = "super::post_tag_links::Entity")]
    TagLinks,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::post_comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::post_histories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Histories.def()
    }
}

impl Related<super::post_tags::Entity> for Entity {
    fn to() -> RelationDef {
        super::post_tag_links::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::post_tag_links::Relation::Post.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
