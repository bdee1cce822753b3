//! Integration tests for votes and reactions

mod common;
use serial_test::serial;

use actix_web::http::StatusCode;
use actix_web::ResponseError;
use common::*;
use flowduck::community::reactions::{self, ReactionAction};
use flowduck::community::votes;
use flowduck::orm::reactions::{ReactionCode, ReactionTarget};
use flowduck::orm::votes::VoteTarget;
use flowduck::orm::{notifications as n, user_actions};
use sea_orm::{entity::*, query::*, PaginatorTrait};
use std::str::FromStr;

#[actix_rt::test]
#[serial]
async fn test_vote_once_per_user() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let asker = create_test_user(&db, "asker").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let question = create_test_question(&db, asker.id, "Vote me").await;

    let count = votes::cast_vote(&db, voter.id, VoteTarget::Question, question.id)
        .await
        .expect("First vote counts");
    assert_eq!(count, 1);

    let err = votes::cast_vote(&db, voter.id, VoteTarget::Question, question.id)
        .await
        .expect_err("Second vote is a conflict");
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_eq!(err.trigger(), Some("already-voted"));

    let count = votes::cast_vote(&db, asker.id, VoteTarget::Question, question.id)
        .await
        .unwrap();
    assert_eq!(count, 2);

    // Only the foreign vote reached the asker's inbox.
    let inbox = n::Entity::find()
        .filter(n::Column::UserId.eq(asker.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(inbox, 1);
}

#[actix_rt::test]
#[serial]
async fn test_retract_vote() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let author = create_test_user(&db, "author").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let post = create_test_post(&db, author.id, "Vote me").await;

    let err = votes::retract_vote(&db, voter.id, VoteTarget::Post, post.id)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    votes::cast_vote(&db, voter.id, VoteTarget::Post, post.id)
        .await
        .unwrap();
    let count = votes::retract_vote(&db, voter.id, VoteTarget::Post, post.id)
        .await
        .expect("Retract existing vote");
    assert_eq!(count, 0);

    assert_eq!(n::Entity::find().count(&db).await.unwrap(), 0);
    let actions = user_actions::Entity::find()
        .filter(user_actions::Column::UserId.eq(voter.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(actions, 0);
}

#[actix_rt::test]
#[serial]
async fn test_vote_on_missing_target() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let voter = create_test_user(&db, "voter").await.unwrap();

    let err = votes::cast_vote(&db, voter.id, VoteTarget::Answer, 4242)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let err = VoteTarget::from_str("users").unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
#[serial]
async fn test_reactions_summary() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let asker = create_test_user(&db, "asker").await.unwrap();
    let first = create_test_user(&db, "first").await.unwrap();
    let second = create_test_user(&db, "second").await.unwrap();
    let question = create_test_question(&db, asker.id, "React to me").await;

    reactions::apply_reaction(
        &db,
        first.id,
        ReactionTarget::Question,
        question.id,
        "react heart".parse().unwrap(),
    )
    .await
    .unwrap();
    let summary = reactions::apply_reaction(
        &db,
        second.id,
        ReactionTarget::Question,
        question.id,
        ReactionAction::React(ReactionCode::Heart),
    )
    .await
    .unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].code, ReactionCode::Heart);
    assert_eq!(summary[0].count, 2);
    assert!(summary[0].reacted);

    let err = reactions::add_reaction(
        &db,
        second.id,
        ReactionTarget::Question,
        question.id,
        ReactionCode::Heart,
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);

    let summary = reactions::apply_reaction(
        &db,
        second.id,
        ReactionTarget::Question,
        question.id,
        ReactionAction::Unreact(ReactionCode::Heart),
    )
    .await
    .unwrap();
    assert_eq!(summary[0].count, 1);
    assert!(!summary[0].reacted);

    let viewer = reactions::reaction_summary(&db, ReactionTarget::Question, question.id, None)
        .await
        .unwrap();
    assert_eq!(viewer[0].count, 1);

    let inbox = n::Entity::find()
        .filter(n::Column::UserId.eq(asker.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1, "Withdrawn reactions take their notice along");
    assert_eq!(inbox[0].notification_value.as_deref(), Some("heart"));
}

#[actix_rt::test]
#[serial]
async fn test_invalid_reaction_action() {
    let err = "react rocket".parse::<ReactionAction>().unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    let err = ReactionTarget::from_str("users").unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
#[serial]
async fn test_same_reaction_from_two_users_notifies_twice() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let author = create_test_user(&db, "author").await.unwrap();
    let alice = create_test_user(&db, "alice").await.unwrap();
    let bobby = create_test_user(&db, "bobby").await.unwrap();
    let post = create_test_post(&db, author.id, "Hearts welcome").await;

    for user in [&alice, &bobby] {
        reactions::add_reaction(&db, user.id, ReactionTarget::Post, post.id, ReactionCode::Heart)
            .await
            .expect("Each user may react once");
    }

    let inbox = n::Entity::find()
        .filter(n::Column::UserId.eq(author.id))
        .order_by_asc(n::Column::Id)
        .all(&db)
        .await
        .unwrap();
    let senders: Vec<_> = inbox.iter().map(|row| row.from_user_id).collect();
    assert_eq!(senders, vec![Some(alice.id), Some(bobby.id)]);

    let summary = reactions::reaction_summary(&db, ReactionTarget::Post, post.id, None)
        .await
        .unwrap();
    assert_eq!(summary[0].count, 2);
}
