/// Notification inbox routes
use crate::commons::CommonParameters;
use crate::middleware::ClientCtx;
use crate::notifications;
use actix_web::{get, put, web, Error, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(unread_count)
        .service(read_all)
        .service(mark_read)
        .service(view_notifications);
}

/// GET /notifications - newest first
#[get("/notifications")]
async fn view_notifications(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let query = params.parse()?;
    let page = notifications::list_notifications(db.get_ref(), user_id, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /notifications/unread-count - badge number
#[get("/notifications/unread-count")]
async fn unread_count(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let count = notifications::count_unread(db.get_ref(), user_id)
        .await
        .map_err(crate::error::ServiceError::from)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "count": count })))
}

/// PUT /notifications/read-all
#[put("/notifications/read-all")]
async fn read_all(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let updated = notifications::mark_all_read(db.get_ref(), user_id)
        .await
        .map_err(crate::error::ServiceError::from)?;
    Ok(HttpResponse::Ok()
        .insert_header(("HX-Trigger", "notifications-read"))
        .json(serde_json::json!({ "updated": updated })))
}

/// PUT /notifications/{id}/read
#[put("/notifications/{notification_id}/read")]
async fn mark_read(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    notification_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let notification = notifications::mark_read(db.get_ref(), user_id, *notification_id).await?;
    Ok(HttpResponse::Ok().json(notification))
}
