//! Integration tests for sign-up, sign-in, password reset and goodbye

mod common;
use serial_test::serial;

use actix_web::http::StatusCode;
use actix_web::ResponseError;
use chrono::{Duration, Utc};
use common::*;
use flowduck::auth::{self, SignUpForm, GOODBYE_CONFIRMATION};
use flowduck::community::{answer_comments, answers, post_comments, reactions, votes};
use flowduck::error::ServiceError;
use flowduck::orm::reactions::{ReactionCode, ReactionTarget};
use flowduck::orm::user_actions::{self, ActionType};
use flowduck::orm::votes::VoteTarget;
use flowduck::orm::{
    answers as answers_orm, notifications as notifications_orm, post_comments as post_comments_orm,
    posts as posts_orm, questions as questions_orm, reactions as reactions_orm,
    votes as votes_orm,
};
use flowduck::orm::{user_avatars, user_password_resets, user_sns, user_verification_emails, users};
use sea_orm::{entity::*, query::*, ActiveValue::Set, DatabaseConnection, PaginatorTrait};

fn form(username: &str, nickname: &str) -> SignUpForm {
    SignUpForm {
        username: username.to_owned(),
        nickname: nickname.to_owned(),
        password: TEST_PASSWORD.to_owned(),
    }
}

async fn verification_code(db: &DatabaseConnection, user_id: i32) -> String {
    user_verification_emails::Entity::find()
        .filter(user_verification_emails::Column::UserId.eq(user_id))
        .one(db)
        .await
        .expect("Failed to query verification")
        .expect("Verification row should exist")
        .vcode
}

async fn reset_code(db: &DatabaseConnection, user_id: i32) -> Option<user_password_resets::Model> {
    user_password_resets::Entity::find()
        .filter(user_password_resets::Column::UserId.eq(user_id))
        .one(db)
        .await
        .expect("Failed to query reset")
}

#[actix_rt::test]
#[serial]
async fn test_sign_up_creates_profile_rows() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    let user = auth::sign_up(&db, &form("duck@flowduck.test", "오리"))
        .await
        .expect("Sign up should succeed");

    assert!(user.active);
    assert!(!user.verified, "New accounts start unverified");
    assert_ne!(user.password, TEST_PASSWORD, "Password must be hashed");

    let avatar = user_avatars::Entity::find()
        .filter(user_avatars::Column::UserId.eq(user.id))
        .one(&db)
        .await
        .unwrap()
        .expect("Default avatar should exist");
    assert_eq!(avatar.url, auth::DEFAULT_AVATAR_URL);

    let sns = user_sns::Entity::find()
        .filter(user_sns::Column::UserId.eq(user.id))
        .all(&db)
        .await
        .unwrap();
    assert!(!sns.is_empty());
    assert!(sns.iter().all(|s| s.link.is_empty() && !s.public));

    let vcode = verification_code(&db, user.id).await;
    assert_eq!(vcode.len(), 32);
}

#[actix_rt::test]
#[serial]
async fn test_sign_up_rejects_taken_names() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    auth::sign_up(&db, &form("duck@flowduck.test", "duck"))
        .await
        .expect("First sign up should succeed");

    let err = auth::sign_up(&db, &form("duck@flowduck.test", "duck"))
        .await
        .expect_err("Duplicate sign up must fail");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let trigger: serde_json::Value =
        serde_json::from_str(err.trigger().expect("Trigger should be set")).unwrap();
    assert!(trigger.get("username-exists").is_some());
    assert!(trigger.get("nickname-exists").is_some());

    let err = auth::sign_up(&db, &form("other@flowduck.test", "duck"))
        .await
        .expect_err("Taken nickname must fail");
    let trigger: serde_json::Value = serde_json::from_str(err.trigger().unwrap()).unwrap();
    assert!(trigger.get("username-exists").is_none());
    assert!(trigger.get("nickname-exists").is_some());
}

#[actix_rt::test]
#[serial]
async fn test_sign_up_validates_form() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    let mut weak = form("weak@flowduck.test", "weak");
    weak.password = "password".to_owned();
    let err = auth::sign_up(&db, &weak).await.expect_err("Weak password");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let err = auth::sign_up(&db, &form("not-an-email", "someone"))
        .await
        .expect_err("Username must be an e-mail address");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let count = users::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 0);
}

#[actix_rt::test]
#[serial]
async fn test_verify_then_sign_in() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");

    let user = auth::sign_up(&db, &form("duck@flowduck.test", "duck"))
        .await
        .unwrap();

    let err = auth::sign_in(&db, "duck@flowduck.test", TEST_PASSWORD)
        .await
        .expect_err("Unverified users cannot sign in");
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.trigger(), Some("email-not-verified"));

    let err = auth::verify_sign_up(&db, "duck@flowduck.test", "0000")
        .await
        .expect_err("Wrong code");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let vcode = verification_code(&db, user.id).await;
    let verified = auth::verify_sign_up(&db, "duck@flowduck.test", &vcode)
        .await
        .expect("Verification should succeed");
    assert!(verified.verified);

    // The code is single use.
    assert!(auth::verify_sign_up(&db, "duck@flowduck.test", &vcode)
        .await
        .is_err());

    let signed_in = auth::sign_in(&db, "duck@flowduck.test", TEST_PASSWORD)
        .await
        .expect("Sign in should succeed");
    assert_eq!(signed_in.id, user.id);
}

#[actix_rt::test]
#[serial]
async fn test_sign_in_failures_carry_triggers() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let user = create_test_user(&db, "mallard").await.unwrap();

    let err = auth::sign_in(&db, "nobody@flowduck.test", TEST_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.trigger(), Some("username-dont-exist"));

    let err = auth::sign_in(&db, &user.username, "Wrong!Pass1")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.trigger(), Some("password-dont-match"));
}

#[actix_rt::test]
#[serial]
async fn test_password_reset_flow() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let user = create_test_user(&db, "mallard").await.unwrap();

    let err = auth::forgot_password(&db, "nobody@flowduck.test")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    auth::forgot_password(&db, &user.username).await.unwrap();
    let first = reset_code(&db, user.id).await.expect("Reset row");
    // Asking again replaces the code.
    auth::forgot_password(&db, &user.username).await.unwrap();
    let second = reset_code(&db, user.id).await.expect("Reset row");
    assert_ne!(first.vcode, second.vcode);

    assert!(auth::verify_forgot_password(&db, &user.username, &first.vcode)
        .await
        .is_err());
    auth::verify_forgot_password(&db, &user.username, &second.vcode)
        .await
        .expect("Fresh code is valid");

    let err = auth::reset_password(&db, &user.username, &second.vcode, "short")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    auth::reset_password(&db, &user.username, &second.vcode, "New!Quack22")
        .await
        .expect("Reset should succeed");
    assert!(reset_code(&db, user.id).await.is_none());

    assert!(auth::sign_in(&db, &user.username, TEST_PASSWORD).await.is_err());
    auth::sign_in(&db, &user.username, "New!Quack22")
        .await
        .expect("New password works");
}

#[actix_rt::test]
#[serial]
async fn test_expired_reset_code_is_gone() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let user = create_test_user(&db, "mallard").await.unwrap();

    auth::forgot_password(&db, &user.username).await.unwrap();
    let reset = reset_code(&db, user.id).await.unwrap();
    let vcode = reset.vcode.clone();

    let mut stale: user_password_resets::ActiveModel = reset.into();
    stale.created_at = Set(Utc::now().naive_utc() - Duration::hours(2));
    stale.update(&db).await.unwrap();

    let err = auth::verify_forgot_password(&db, &user.username, &vcode)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::GONE);
    assert!(
        reset_code(&db, user.id).await.is_none(),
        "Expired codes are removed"
    );
}

#[actix_rt::test]
#[serial]
async fn test_goodbye_removes_account_and_content() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let user = create_test_user(&db, "mallard").await.unwrap();
    create_test_question(&db, user.id, "Leaving soon").await;

    let err = auth::goodbye(&db, user.id, TEST_PASSWORD, "bye")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let err = auth::goodbye(&db, user.id, "Wrong!Pass1", GOODBYE_CONFIRMATION)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), ServiceError::Unauthorized));

    auth::goodbye(&db, user.id, TEST_PASSWORD, GOODBYE_CONFIRMATION)
        .await
        .expect("Goodbye should succeed");

    assert!(users::Entity::find_by_id(user.id)
        .one(&db)
        .await
        .unwrap()
        .is_none());
    let questions = flowduck::orm::questions::Entity::find()
        .count(&db)
        .await
        .unwrap();
    assert_eq!(questions, 0);
    let actions = user_actions::Entity::find()
        .filter(user_actions::Column::UserId.eq(user.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(actions, 0);
}

#[actix_rt::test]
#[serial]
async fn test_goodbye_keeps_counters_of_others() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let asker = create_test_user(&db, "asker").await.unwrap();
    let leaver = create_test_user(&db, "leaver").await.unwrap();

    // On the asker's question: an accepted answer, a vote, a reaction and
    // a comment under the asker's own answer, all by the leaver.
    let question = create_test_question(&db, asker.id, "Who stays?").await;
    let accepted = answers::create_answer(&db, leaver.id, question.id, "<p>Me</p>")
        .await
        .unwrap();
    let own = answers::create_answer(&db, asker.id, question.id, "<p>Myself</p>")
        .await
        .unwrap();
    answers::mark_answered(&db, asker.id, accepted.id).await.unwrap();
    votes::cast_vote(&db, leaver.id, VoteTarget::Question, question.id)
        .await
        .unwrap();
    reactions::add_reaction(
        &db,
        leaver.id,
        ReactionTarget::Question,
        question.id,
        ReactionCode::Heart,
    )
    .await
    .unwrap();
    answer_comments::create_answer_comment(&db, leaver.id, own.id, "<p>Nice</p>")
        .await
        .unwrap();

    // On the asker's post: a thread started by the leaver and a reply by
    // the leaver under the asker's comment.
    let post = create_test_post(&db, asker.id, "Stay a while").await;
    let theirs = post_comments::create_post_comment(&db, leaver.id, post.id, "<p>Hi</p>")
        .await
        .unwrap();
    let reply = post_comments::create_comment_reply(&db, asker.id, post.id, theirs.id, "<p>Yo</p>")
        .await
        .unwrap();
    let mine = post_comments::create_post_comment(&db, asker.id, post.id, "<p>Hey</p>")
        .await
        .unwrap();
    post_comments::create_comment_reply(&db, leaver.id, post.id, mine.id, "<p>Bye</p>")
        .await
        .unwrap();
    votes::cast_vote(&db, leaver.id, VoteTarget::Post, post.id)
        .await
        .unwrap();
    votes::cast_vote(&db, leaver.id, VoteTarget::PostComment, mine.id)
        .await
        .unwrap();

    // The asker's activity on the leaver's question.
    let gone = create_test_question(&db, leaver.id, "Soon gone").await;
    let late = answers::create_answer(&db, asker.id, gone.id, "<p>Too late</p>")
        .await
        .unwrap();
    votes::cast_vote(&db, asker.id, VoteTarget::Question, gone.id)
        .await
        .unwrap();

    auth::goodbye(&db, leaver.id, TEST_PASSWORD, GOODBYE_CONFIRMATION)
        .await
        .expect("Goodbye should succeed");

    let question = questions_orm::Entity::find_by_id(question.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(question.vote_count, 0);
    assert_eq!(question.comment_count, 1);
    assert!(!question.answered, "The accepted answer left with its author");
    let own = answers_orm::Entity::find_by_id(own.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(own.comment_count, 0);

    let post = posts_orm::Entity::find_by_id(post.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.vote_count, 0);
    assert_eq!(post.comment_count, 1);
    let mine = post_comments_orm::Entity::find_by_id(mine.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mine.vote_count, 0);
    assert_eq!(mine.comment_count, 0);
    assert!(post_comments_orm::Entity::find_by_id(reply.id)
        .one(&db)
        .await
        .unwrap()
        .is_none());

    assert_eq!(votes_orm::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(reactions_orm::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(notifications_orm::Entity::find().count(&db).await.unwrap(), 0);

    // The asker's actions on removed content went with it.
    for (kind, target_id) in [
        (ActionType::CreateAnswer, late.id),
        (ActionType::VoteQuestion, gone.id),
        (ActionType::CreatePostComment, reply.id),
    ] {
        let left = user_actions::Entity::find()
            .filter(user_actions::Column::ActionType.eq(kind))
            .filter(user_actions::Column::TargetId.eq(target_id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(left, 0, "{:?} {}", kind, target_id);
    }
    assert!(answers_orm::Entity::find_by_id(late.id)
        .one(&db)
        .await
        .unwrap()
        .is_none());
}
