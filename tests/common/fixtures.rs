//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::Utc;
use flowduck::orm::users;
use flowduck::session::hash_password;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Meets the password policy.
pub const TEST_PASSWORD: &str = "Quack!Quack1";

/// Test user fixture
pub struct TestUser {
    pub id: i32,
    pub username: String,
    pub nickname: String,
    pub password: String,
}

/// Create an active, verified user. `name` becomes the nickname and the
/// local part of the e-mail address.
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<TestUser, DbErr> {
    let password_hash = hash_password(TEST_PASSWORD)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))?;

    let user = users::ActiveModel {
        username: Set(format!("{}@flowduck.test", name)),
        nickname: Set(name.to_owned()),
        password: Set(password_hash),
        active: Set(true),
        verified: Set(true),
        role: Set(users::Role::User),
        about_me: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(TestUser {
        id: user.id,
        username: user.username,
        nickname: user.nickname,
        password: TEST_PASSWORD.to_owned(),
    })
}

/// A question by `user_id` with a single tag.
pub async fn create_test_question(
    db: &DatabaseConnection,
    user_id: i32,
    title: &str,
) -> flowduck::orm::questions::Model {
    flowduck::community::questions::create_question(
        db,
        user_id,
        title,
        "<p>How do I do this?</p>",
        &["python".to_owned()],
    )
    .await
    .expect("Failed to create question")
}

/// A post on the `free` board.
pub async fn create_test_post(
    db: &DatabaseConnection,
    user_id: i32,
    title: &str,
) -> flowduck::orm::posts::Model {
    flowduck::community::posts::create_post(
        db,
        user_id,
        "free",
        title,
        "<p>Hello ducks</p>",
        &[],
    )
    .await
    .expect("Failed to create post")
}
