//! SeaORM Entity for users table

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Sign-in name; always an e-mail address.
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub nickname: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub active: bool,
    pub verified: bool,
    pub role: Role,
    #[sea_orm(column_type = "Text", nullable)]
    pub about_me: Option<String>,
    pub created_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::user_avatars::Entity")]
    Avatar,
    #[sea_orm(has_one = "super::user_backdrops::Entity")]
    Backdrop,
    #[sea_orm(has_many = "super::user_sns::Entity")]
    Sns,
}

impl Related<super::user_avatars::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Avatar.def()
    }
}

impl Related<super::user_backdrops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Backdrop.def()
    }
}

impl Related<super::user_sns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
