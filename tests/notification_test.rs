//! Integration tests for the notification inbox and activity log

mod common;
use serial_test::serial;

use actix_web::http::StatusCode;
use actix_web::ResponseError;
use common::*;
use flowduck::activities::{self, ActivityGroup};
use flowduck::commons::{CommonParameters, ListQuery};
use flowduck::community::{answers, votes};
use flowduck::notifications;
use flowduck::orm::notifications as n;
use flowduck::orm::user_actions::ActionType;
use flowduck::orm::votes::VoteTarget;
use flowduck::sse::{self, Broker, EventStream};
use futures::StreamExt;
use sea_orm::EntityTrait;
use std::time::Duration;

#[actix_rt::test]
#[serial]
async fn test_unread_and_mark_read() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let asker = create_test_user(&db, "asker").await.unwrap();
    let helper = create_test_user(&db, "helper").await.unwrap();
    let question = create_test_question(&db, asker.id, "Inbox").await;

    answers::create_answer(&db, helper.id, question.id, "<p>One</p>")
        .await
        .unwrap();
    votes::cast_vote(&db, helper.id, VoteTarget::Question, question.id)
        .await
        .unwrap();
    assert_eq!(notifications::count_unread(&db, asker.id).await.unwrap(), 2);
    assert_eq!(notifications::count_unread(&db, helper.id).await.unwrap(), 0);

    let page = notifications::list_notifications(&db, asker.id, &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    let first = page.items[0].id;

    let err = notifications::mark_read(&db, helper.id, first)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let read = notifications::mark_read(&db, asker.id, first).await.unwrap();
    assert!(read.read);
    assert_eq!(notifications::count_unread(&db, asker.id).await.unwrap(), 1);

    assert_eq!(notifications::mark_all_read(&db, asker.id).await.unwrap(), 1);
    assert_eq!(notifications::mark_all_read(&db, asker.id).await.unwrap(), 0);
    assert_eq!(notifications::count_unread(&db, asker.id).await.unwrap(), 0);
}

#[actix_rt::test]
#[serial]
async fn test_activity_groups() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let asker = create_test_user(&db, "asker").await.unwrap();
    let helper = create_test_user(&db, "helper").await.unwrap();
    let question = create_test_question(&db, asker.id, "Activity").await;
    create_test_post(&db, helper.id, "Chatter").await;
    answers::create_answer(&db, helper.id, question.id, "<p>Answer</p>")
        .await
        .unwrap();
    votes::cast_vote(&db, helper.id, VoteTarget::Question, question.id)
        .await
        .unwrap();

    let all = activities::list_user_actions(&db, helper.id, ActivityGroup::All, &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let written = activities::list_user_actions(
        &db,
        helper.id,
        ActivityGroup::QuestionsAndPosts,
        &ListQuery::default(),
    )
    .await
    .unwrap();
    assert_eq!(written.total, 1);
    assert_eq!(written.items[0].action_type, ActionType::CreatePost);

    let voted = activities::list_user_actions(&db, helper.id, ActivityGroup::Votes, &ListQuery::default())
        .await
        .unwrap();
    assert_eq!(voted.total, 1);
    assert_eq!(voted.items[0].action_type, ActionType::VoteQuestion);
}

#[actix_rt::test]
#[serial]
async fn test_list_parameters() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let asker = create_test_user(&db, "asker").await.unwrap();
    for i in 0..5 {
        create_test_question(&db, asker.id, &format!("Question {}", i)).await;
    }

    let query = CommonParameters {
        page: 2,
        per_page: 2,
        sorters: Some("id-asc".to_owned()),
        ..Default::default()
    }
    .parse()
    .unwrap();
    let page = flowduck::community::questions::list_questions(&db, &query)
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.pages, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].title, "Question 2");
    assert!(page.has_next() && page.has_prev());

    let past_end = CommonParameters {
        page: 9,
        per_page: 2,
        ..Default::default()
    }
    .parse()
    .unwrap();
    let page = flowduck::community::questions::list_questions(&db, &past_end)
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 5);

    let search = CommonParameters {
        query: Some("title-contains-Question 4".to_owned()),
        ..Default::default()
    }
    .parse()
    .unwrap();
    let page = flowduck::community::questions::list_questions(&db, &search)
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let by_author = CommonParameters {
        query: Some("author-eq-ask".to_owned()),
        ..Default::default()
    }
    .parse()
    .unwrap();
    let page = flowduck::community::questions::list_questions(&db, &by_author)
        .await
        .unwrap();
    assert_eq!(page.total, 5);

    let unknown_field = CommonParameters {
        filters: Some("password-eq-x".to_owned()),
        ..Default::default()
    }
    .parse()
    .unwrap();
    let err = flowduck::community::questions::list_questions(&db, &unknown_field)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let too_big = CommonParameters {
        per_page: 500,
        ..Default::default()
    };
    assert!(too_big.parse().is_err());
}

#[actix_rt::test]
#[serial]
async fn test_stream_event_follows_commit() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let asker = create_test_user(&db, "asker").await.unwrap();
    let helper = create_test_user(&db, "helper").await.unwrap();
    let question = create_test_question(&db, asker.id, "Streamed").await;

    let mut events = sse::get_broker()
        .subscribe(&sse::user_channel(asker.id))
        .await
        .unwrap();

    // A failed answer publishes nothing.
    answers::create_answer(&db, helper.id, question.id + 100, "<p>Lost</p>")
        .await
        .unwrap_err();
    answers::create_answer(&db, helper.id, question.id, "<p>Found</p>")
        .await
        .unwrap();

    let payload = actix_rt::time::timeout(Duration::from_secs(1), events.next())
        .await
        .expect("An event arrives")
        .expect("Stream stays open");
    let event: EventStream = serde_json::from_str(&payload).unwrap();
    assert_eq!(event.event.as_deref(), Some(notifications::SSE_EVENT));
    let id: i32 = event.id.unwrap().parse().unwrap();
    let stored = n::Entity::find_by_id(id).one(&db).await.unwrap();
    assert!(stored.is_some(), "The event names a committed notification");

    let quiet = actix_rt::time::timeout(Duration::from_millis(100), events.next()).await;
    assert!(quiet.is_err(), "Exactly one event per notification");
}
