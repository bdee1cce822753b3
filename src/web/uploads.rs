//! Editor image uploads and serving of stored files.

use super::{max_upload_bytes, read_file_field};
use crate::community::uploads;
use crate::error::ServiceError;
use crate::middleware::ClientCtx;
use crate::storage::{StorageBackend, StorageError};
use actix_multipart::Multipart;
use actix_web::{get, post, web, Error, HttpResponse, Responder, ResponseError};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(upload_image).service(view_upload);
}

/// Error body understood by the editor's upload adapter.
fn upload_error(message: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": { "message": message.to_string() }
    }))
}

/// Takes the `upload` field and answers `{"url": ...}`.
#[post("/community/{category}/upload/images")]
async fn upload_image(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn StorageBackend>,
    category: web::Path<String>,
    multipart: Multipart,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;

    let file = match read_file_field(multipart, "upload", max_upload_bytes()).await {
        Ok(Some(file)) => file,
        Ok(None) => return Ok(upload_error("No file was uploaded")),
        Err(e) => return Ok(upload_error(e)),
    };

    match uploads::upload_editor_image(
        db.get_ref(),
        storage.get_ref(),
        user_id,
        &category,
        file.data,
        &file.filename,
        file.mimetype,
    )
    .await
    {
        Ok(image) => Ok(HttpResponse::Ok().json(serde_json::json!({ "url": image.url }))),
        Err(e) if e.status_code().is_client_error() => Ok(upload_error(e)),
        Err(e) => Err(e.into()),
    }
}

#[get("/uploads/{filename}")]
async fn view_upload(
    storage: web::Data<dyn StorageBackend>,
    filename: web::Path<String>,
) -> Result<impl Responder, Error> {
    let object = storage.get_object(&filename).await.map_err(|e| match e {
        StorageError::Invalid(_) => ServiceError::NotFound("File"),
        other => ServiceError::from(other),
    })?;

    let mut res = HttpResponse::Ok();
    res.insert_header(("Cache-Control", "public, max-age=31536000, immutable"));
    if let Some(content_type) = object.content_type {
        res.content_type(content_type);
    }
    Ok(res.streaming(object.body))
}
