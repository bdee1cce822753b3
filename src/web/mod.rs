pub mod activity;
pub mod answers;
pub mod auth;
pub mod feedback;
pub mod landing;
pub mod notifications;
pub mod posts;
pub mod questions;
pub mod stream;
pub mod uploads;

use crate::app_config;
use crate::error::ServiceError;
use actix_multipart::Multipart;
use actix_web::{guard, web, HttpResponse, HttpResponseBuilder};
use futures::{StreamExt, TryStreamExt};

/// Sites served from subdomains of `site.server_name`.
pub const PYDUCK: &str = "pyduck";
pub const CSDUCK: &str = "csduck";
pub const FADUCK: &str = "faduck";

/// Host guards compare against the bare host name.
fn tenant_host(tenant: &str, server_name: &str) -> String {
    let host = server_name.split(':').next().unwrap_or(server_name);
    format!("{}.{}", tenant, host)
}

/// Configures the web app by mounting each tenant behind a `Host` guard.
///
/// Descending order. Order is important; the first scope whose guard
/// matches serves the request and every other host falls through to rodi.
pub fn configure(conf: &mut web::ServiceConfig) {
    let server_name = app_config::site().server_name;

    conf.service(
        web::scope("")
            .guard(guard::Host(tenant_host(PYDUCK, &server_name)))
            .configure(configure_pyduck),
    )
    .service(
        web::scope("")
            .guard(guard::Host(tenant_host(CSDUCK, &server_name)))
            .configure(landing::configure_csduck),
    )
    .service(
        web::scope("")
            .guard(guard::Host(tenant_host(FADUCK, &server_name)))
            .configure(landing::configure_faduck),
    )
    .service(web::scope("").configure(landing::configure_rodi));
}

/// The community site.
pub fn configure_pyduck(conf: &mut web::ServiceConfig) {
    landing::configure_pyduck(conf);
    auth::configure(conf);
    activity::configure(conf);
    notifications::configure(conf);
    stream::configure(conf);
    // Fixed paths before `{category}` patterns.
    questions::configure(conf);
    answers::configure(conf);
    feedback::configure(conf);
    uploads::configure(conf);
    posts::configure(conf);
}

/// 200 response carrying `HX-Trigger-After-Settle`.
pub(crate) fn settle(event: &str) -> HttpResponseBuilder {
    let mut res = HttpResponse::Ok();
    res.insert_header(("HX-Trigger-After-Settle", event.to_owned()));
    res
}

/// 200 response carrying `HX-Trigger`.
pub(crate) fn trigger(event: &str) -> HttpResponseBuilder {
    let mut res = HttpResponse::Ok();
    res.insert_header(("HX-Trigger", event.to_owned()));
    res
}

/// 200 response telling htmx to navigate.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header(("HX-Redirect", location.to_owned()))
        .finish()
}

/// A file read out of a multipart body.
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub mimetype: Option<String>,
}

/// Reads the field named `field_name`, stopping once it passes `max_bytes`.
/// Other fields are skipped.
pub(crate) async fn read_file_field(
    mut multipart: Multipart,
    field_name: &str,
    max_bytes: usize,
) -> Result<Option<UploadedFile>, ServiceError> {
    while let Some(mut field) = multipart
        .try_next()
        .await
        .map_err(|e| ServiceError::validation(format!("Malformed upload: {}", e)))?
    {
        let disposition = field.content_disposition();
        let name = disposition.get_name().map(str::to_owned);
        let filename = disposition.get_filename().unwrap_or_default().to_owned();
        if name.as_deref() != Some(field_name) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| ServiceError::validation(format!("Malformed upload: {}", e)))?;
            }
            continue;
        }

        let mimetype = field.content_type().map(|m| m.essence_str().to_owned());
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes =
                chunk.map_err(|e| ServiceError::validation(format!("Malformed upload: {}", e)))?;
            if data.len() + bytes.len() > max_bytes {
                return Err(ServiceError::validation(format!(
                    "file is larger than {} bytes",
                    max_bytes
                )));
            }
            data.extend_from_slice(&bytes);
        }

        return Ok(Some(UploadedFile {
            data,
            filename,
            mimetype,
        }));
    }

    Ok(None)
}

pub(crate) fn max_upload_bytes() -> usize {
    app_config::limits().max_upload_size_mb as usize * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_host_strips_port() {
        assert_eq!(tenant_host("pyduck", "localhost:8080"), "pyduck.localhost");
        assert_eq!(tenant_host("faduck", "flowduck.dev"), "faduck.flowduck.dev");
    }

    #[test]
    fn test_hx_helpers() {
        let res = settle("answer-created").finish();
        assert_eq!(
            res.headers().get("HX-Trigger-After-Settle").unwrap(),
            "answer-created"
        );
        let res = redirect("/community/free/posts");
        assert_eq!(
            res.headers().get("HX-Redirect").unwrap(),
            "/community/free/posts"
        );
    }
}
