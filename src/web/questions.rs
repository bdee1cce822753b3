//! Help board: questions.

use super::redirect;
use crate::commons::CommonParameters;
use crate::community::{questions, tags};
use crate::middleware::ClientCtx;
use actix_web::{delete, get, post, web, Error, HttpResponse, Responder};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(list_questions)
        .service(create_question)
        .service(view_question)
        .service(delete_question)
        .service(update_question)
        .service(view_question_histories);
}

/// Form shared by question and post editors. `tags` is tagify JSON or a
/// comma separated list.
#[derive(Debug, Deserialize)]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
}

#[get("/community/questions")]
async fn list_questions(
    db: web::Data<DatabaseConnection>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    let query = params.parse()?;
    let page = questions::list_questions(db.get_ref(), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/community/help/new")]
async fn create_question(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<ArticleForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let tag_names = tags::parse_tags(form.tags.as_deref())?;

    let question =
        questions::create_question(db.get_ref(), user_id, &form.title, &form.content, &tag_names)
            .await?;

    Ok(HttpResponse::Created()
        .insert_header(("HX-Redirect", format!("/community/questions/{}", question.id)))
        .json(question))
}

#[get("/community/questions/{question_id}")]
async fn view_question(
    db: web::Data<DatabaseConnection>,
    question_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let view = questions::view_question(db.get_ref(), *question_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[delete("/community/questions/{question_id}")]
async fn delete_question(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    question_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    questions::delete_question(db.get_ref(), user_id, *question_id).await?;
    Ok(redirect("/community/questions"))
}

#[post("/community/questions/{question_id}/edit")]
async fn update_question(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    question_id: web::Path<i32>,
    form: web::Form<ArticleForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let tag_names = tags::parse_tags(form.tags.as_deref())?;

    let question = questions::update_question(
        db.get_ref(),
        user_id,
        *question_id,
        &form.title,
        &form.content,
        &tag_names,
    )
    .await?;

    Ok(HttpResponse::Ok()
        .insert_header(("HX-Redirect", format!("/community/questions/{}", question.id)))
        .json(question))
}

#[get("/community/questions/{question_id}/histories")]
async fn view_question_histories(
    db: web::Data<DatabaseConnection>,
    question_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    questions::get_question(db.get_ref(), *question_id).await?;
    let histories = questions::list_question_histories(db.get_ref(), *question_id).await?;
    Ok(HttpResponse::Ok().json(histories))
}
