//! Integration tests for profile settings

mod common;
use serial_test::serial;

use actix_web::http::StatusCode;
use actix_web::ResponseError;
use common::*;
use flowduck::auth::{self, profile, SignUpForm};
use flowduck::orm::user_sns::SnsPlatform;
use flowduck::storage::{local::LocalStorage, StorageBackend};
use sea_orm::DatabaseConnection;

async fn signed_up(db: &DatabaseConnection, name: &str) -> flowduck::orm::users::Model {
    auth::sign_up(
        db,
        &SignUpForm {
            username: format!("{}@flowduck.test", name),
            nickname: name.to_owned(),
            password: TEST_PASSWORD.to_owned(),
        },
    )
    .await
    .expect("Sign up should succeed")
}

#[actix_rt::test]
#[serial]
async fn test_about_me_limits() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let user = signed_up(&db, "mallard").await;

    let updated = profile::update_about_me(&db, user.id, "Quack quack")
        .await
        .unwrap();
    assert_eq!(updated.about_me.as_deref(), Some("Quack quack"));

    let cleared = profile::update_about_me(&db, user.id, "   ").await.unwrap();
    assert_eq!(cleared.about_me, None);

    let err = profile::update_about_me(&db, user.id, &"꽥".repeat(1001))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
#[serial]
async fn test_sns_links_replace_all() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let user = signed_up(&db, "mallard").await;

    let saved = profile::update_sns(
        &db,
        user.id,
        &[
            profile::SnsEntry {
                platform: SnsPlatform::Github,
                link: "https://github.com/mallard".to_owned(),
                public: true,
            },
            profile::SnsEntry {
                platform: SnsPlatform::Twitter,
                link: String::new(),
                public: false,
            },
        ],
    )
    .await
    .unwrap();
    assert_eq!(saved.len(), 2);

    let profile = profile::get_profile(&db, user.id).await.unwrap();
    let github = profile
        .sns
        .iter()
        .find(|s| s.platform == SnsPlatform::Github)
        .expect("Github link");
    assert!(github.public);
    assert_eq!(github.link, "https://github.com/mallard");

    // An empty submission leaves the links alone.
    let kept = profile::update_sns(&db, user.id, &[]).await.unwrap();
    assert_eq!(kept.len(), 2);
}

#[actix_rt::test]
#[serial]
async fn test_change_nickname_and_password() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let user = signed_up(&db, "mallard").await;
    signed_up(&db, "teal").await;

    let err = profile::change_nickname(&db, user.id, "teal")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_eq!(err.trigger(), Some("nickname-already-exists"));

    let err = profile::change_nickname(&db, user.id, "x").await.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let renamed = profile::change_nickname(&db, user.id, "청둥오리")
        .await
        .unwrap();
    assert_eq!(renamed.nickname, "청둥오리");

    let err = profile::change_password(&db, user.id, "Wrong!Pass1", "New!Quack22")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.trigger(), Some("password-dont-match"));

    profile::change_password(&db, user.id, TEST_PASSWORD, "New!Quack22")
        .await
        .expect("Password change should succeed");
}

#[actix_rt::test]
#[serial]
async fn test_avatar_replacement_removes_old_file() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path().to_path_buf(), "/uploads").unwrap();
    let user = signed_up(&db, "mallard").await;

    let err = profile::update_avatar(
        &db,
        &storage,
        user.id,
        b"GIF89a".to_vec(),
        "duck.gif",
        Some("image/gif".to_owned()),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let first = profile::update_avatar(
        &db,
        &storage,
        user.id,
        b"first png bytes".to_vec(),
        "duck.png",
        Some("image/png".to_owned()),
    )
    .await
    .unwrap();
    assert!(first.url.starts_with("/uploads/"));
    assert!(storage.exists(&first.filename).await.unwrap());

    let second = profile::update_avatar(
        &db,
        &storage,
        user.id,
        b"second png bytes".to_vec(),
        "duck2.png",
        Some("image/png".to_owned()),
    )
    .await
    .unwrap();
    assert_ne!(first.filename, second.filename);
    assert!(storage.exists(&second.filename).await.unwrap());
    assert!(
        !storage.exists(&first.filename).await.unwrap(),
        "The replaced file is removed"
    );
}
