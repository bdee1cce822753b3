//! HTTP tests: tenant routing, sessions, htmx headers and the event stream

mod common;
use serial_test::serial;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{test, App};
use common::*;
use flowduck::middleware::ClientCtx;
use flowduck::storage::{local::LocalStorage, StorageBackend};
use flowduck::web;
use std::sync::Arc;

const PYDUCK_HOST: &str = "pyduck.localhost:8080";

macro_rules! test_app {
    ($db:expr, $storage:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new($db.clone()))
                .app_data(Data::from($storage.clone()))
                .wrap(ClientCtx::default())
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::from(&[7u8; 64]))
                        .cookie_secure(false)
                        .build(),
                )
                .configure(web::configure),
        )
        .await
    };
}

fn temp_storage(dir: &tempfile::TempDir) -> Arc<dyn StorageBackend> {
    Arc::new(LocalStorage::new(dir.path().to_path_buf(), "/uploads").expect("Storage"))
}

/// Signs in through the form and returns the session cookie.
macro_rules! sign_in {
    ($app:expr, $user:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/sign-in")
            .insert_header(("Host", PYDUCK_HOST))
            .set_form(&[
                ("username", $user.username.as_str()),
                ("password", $user.password.as_str()),
            ])
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "Sign in should succeed");
        assert_eq!(resp.headers().get("HX-Redirect").unwrap(), "/");
        let cookie: Cookie<'static> = resp
            .response()
            .cookies()
            .next()
            .expect("Session cookie")
            .into_owned();
        cookie
    }};
}

#[actix_rt::test]
#[serial]
async fn test_tenant_routing() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let dir = tempfile::tempdir().unwrap();
    let storage = temp_storage(&dir);
    let app = test_app!(db, storage);

    for (host, marker) in [
        (PYDUCK_HOST, "Recent questions"),
        ("csduck.localhost", "<h1>csduck</h1>"),
        ("faduck.localhost:8080", "<h1>faduck</h1>"),
        ("flowduck.example", "<h1>rodi</h1>"),
    ] {
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("Host", host))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", host);
        let body = test::read_body(resp).await;
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains(marker), "{} should render {}", host, marker);
    }

    // Community routes only exist on the community host.
    let req = test::TestRequest::get()
        .uri("/community/questions")
        .insert_header(("Host", "csduck.localhost"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
#[serial]
async fn test_sign_up_duplicate_over_http() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let dir = tempfile::tempdir().unwrap();
    let storage = temp_storage(&dir);
    let app = test_app!(db, storage);
    let existing = create_test_user(&db, "mallard").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/auth/sign-up")
        .insert_header(("Host", PYDUCK_HOST))
        .set_form(&[
            ("username", existing.username.as_str()),
            ("nickname", "fresh"),
            ("password", TEST_PASSWORD),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let trigger = resp.headers().get("HX-Trigger").unwrap().to_str().unwrap();
    let trigger: serde_json::Value = serde_json::from_str(trigger).unwrap();
    assert!(trigger.get("username-exists").is_some());
    assert!(trigger.get("nickname-exists").is_none());
}

#[actix_rt::test]
#[serial]
async fn test_vote_over_http() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let dir = tempfile::tempdir().unwrap();
    let storage = temp_storage(&dir);
    let app = test_app!(db, storage);
    let asker = create_test_user(&db, "asker").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let question = create_test_question(&db, asker.id, "Vote over http").await;
    let uri = format!("/community/questions/{}/vote", question.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(("Host", PYDUCK_HOST))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get("HX-Trigger").unwrap(), "login-required");

    let cookie = sign_in!(app, voter);

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie.clone())
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["vote_count"], 1);
    assert_eq!(body["voted"], true);

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(resp.headers().get("HX-Trigger").unwrap(), "already-voted");

    let req = test::TestRequest::post()
        .uri(&format!("/community/users/{}/vote", asker.id))
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri(&format!("/community/questions/{}/reactions", question.id))
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie)
        .set_form(&[("action", "react rocket")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
#[serial]
async fn test_unread_count_over_http() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let dir = tempfile::tempdir().unwrap();
    let storage = temp_storage(&dir);
    let app = test_app!(db, storage);
    let asker = create_test_user(&db, "asker").await.unwrap();
    let helper = create_test_user(&db, "helper").await.unwrap();
    let question = create_test_question(&db, asker.id, "Anyone?").await;
    flowduck::community::answers::create_answer(&db, helper.id, question.id, "<p>Me</p>")
        .await
        .unwrap();

    let cookie = sign_in!(app, asker);
    let req = test::TestRequest::get()
        .uri("/notifications/unread-count")
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie.clone())
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);

    let req = test::TestRequest::put()
        .uri("/notifications/read-all")
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("HX-Trigger").unwrap(), "notifications-read");
}

#[actix_rt::test]
#[serial]
async fn test_event_stream_is_private() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    let dir = tempfile::tempdir().unwrap();
    let storage = temp_storage(&dir);
    let app = test_app!(db, storage);
    let owner = create_test_user(&db, "owner").await.unwrap();
    let snoop = create_test_user(&db, "snoop").await.unwrap();
    let uri = format!("/stream/users/{}", owner.id);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("Host", PYDUCK_HOST))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let cookie = sign_in!(app, snoop);
    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let cookie = sign_in!(app, owner);
    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(("Host", PYDUCK_HOST))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(resp.headers().get("Cache-Control").unwrap(), "no-cache");
}
