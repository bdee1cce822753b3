//! Server-sent events for a signed-in user.

use crate::app_config;
use crate::error::ServiceError;
use crate::middleware::ClientCtx;
use crate::sse;
use actix_web::{get, web, Error, HttpResponse, Responder};
use std::time::Duration;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(stream_to_user);
}

/// A user may only listen on their own channel.
#[get("/stream/users/{user_id}")]
async fn stream_to_user(
    client: ClientCtx,
    user_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_ownership(*user_id)?;

    let subscription = sse::get_broker()
        .subscribe(&sse::user_channel(user_id))
        .await
        .map_err(|e| ServiceError::Internal(format!("SSE subscribe failed: {}", e)))?;

    let config = app_config::sse();
    let body = sse::event_body(
        subscription,
        Duration::from_millis(config.ping_interval_ms),
        config.retry_ms,
    );

    log::debug!("SSE: user {} connected", user_id);
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(body))
}
