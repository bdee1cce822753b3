//! Front pages of every tenant.

use super::PYDUCK;
use crate::app_config;
use crate::commons::ListQuery;
use crate::community::questions;
use crate::middleware::ClientCtx;
use crate::orm::questions as question;
use actix_web::{get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

const RECENT_QUESTIONS: u64 = 10;

#[derive(Template)]
#[template(path = "pyduck/index.html")]
struct PyduckIndexTemplate {
    client: ClientCtx,
    questions: Vec<question::Model>,
}

#[derive(Template)]
#[template(path = "csduck/index.html")]
struct CsduckIndexTemplate {
    community_url: String,
}

#[derive(Template)]
#[template(path = "faduck/index.html")]
struct FaduckIndexTemplate {
    community_url: String,
}

#[derive(Template)]
#[template(path = "rodi/index.html")]
struct RodiIndexTemplate {
    community_url: String,
}

/// Absolute link to the community subdomain, port included.
fn community_url() -> String {
    format!("//{}.{}/", PYDUCK, app_config::site().server_name)
}

pub fn configure_pyduck(conf: &mut web::ServiceConfig) {
    conf.service(pyduck_index);
}

pub fn configure_csduck(conf: &mut web::ServiceConfig) {
    conf.service(csduck_index);
}

pub fn configure_faduck(conf: &mut web::ServiceConfig) {
    conf.service(faduck_index);
}

pub fn configure_rodi(conf: &mut web::ServiceConfig) {
    conf.service(rodi_index);
}

#[get("/")]
async fn pyduck_index(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    let query = ListQuery {
        per_page: RECENT_QUESTIONS,
        ..ListQuery::default()
    };
    let page = questions::list_questions(db.get_ref(), &query).await?;
    Ok(PyduckIndexTemplate {
        client,
        questions: page.items,
    }
    .to_response())
}

#[get("/")]
async fn csduck_index() -> impl Responder {
    CsduckIndexTemplate {
        community_url: community_url(),
    }
    .to_response()
}

#[get("/")]
async fn faduck_index() -> impl Responder {
    FaduckIndexTemplate {
        community_url: community_url(),
    }
    .to_response()
}

#[get("/")]
async fn rodi_index() -> impl Responder {
    RodiIndexTemplate {
        community_url: community_url(),
    }
    .to_response()
}
