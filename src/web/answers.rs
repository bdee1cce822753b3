//! Answers to questions and the comments under them.

use super::{settle, trigger};
use crate::commons::CommonParameters;
use crate::community::{answer_comments, answers, questions};
use crate::middleware::ClientCtx;
use actix_web::{delete, get, post, put, web, Error, HttpResponse, Responder};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(list_answers)
        .service(create_answer)
        .service(update_answer)
        .service(delete_answer)
        .service(mark_answered)
        .service(mark_unanswered)
        .service(view_answer_histories)
        .service(list_answer_comments)
        .service(create_answer_comment)
        .service(update_answer_comment)
        .service(delete_answer_comment);
}

#[derive(Debug, Deserialize)]
pub struct NewAnswerForm {
    pub question_id: i32,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentForm {
    pub content: String,
}

#[get("/community/questions/{question_id}/answers")]
async fn list_answers(
    db: web::Data<DatabaseConnection>,
    question_id: web::Path<i32>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    let query = params.parse()?;
    questions::get_question(db.get_ref(), *question_id).await?;
    let page = answers::list_answers(db.get_ref(), *question_id, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/community/answers")]
async fn create_answer(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<NewAnswerForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let answer =
        answers::create_answer(db.get_ref(), user_id, form.question_id, &form.content).await?;
    Ok(settle("answer-created").json(answer))
}

#[put("/community/answers/{answer_id}")]
async fn update_answer(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    answer_id: web::Path<i32>,
    form: web::Form<ContentForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let answer = answers::update_answer(db.get_ref(), user_id, *answer_id, &form.content).await?;
    Ok(HttpResponse::Ok().json(answer))
}

/// Answers with the question so the page can refresh its counters.
#[delete("/community/answers/{answer_id}")]
async fn delete_answer(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    answer_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let question = answers::delete_answer(db.get_ref(), user_id, *answer_id).await?;
    Ok(HttpResponse::Ok().json(question))
}

#[put("/community/answers/{answer_id}/answered")]
async fn mark_answered(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    answer_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let (answer, question) = answers::mark_answered(db.get_ref(), user_id, *answer_id).await?;
    Ok(trigger("question-answered").json(serde_json::json!({
        "answer": answer,
        "question": question,
    })))
}

#[put("/community/answers/{answer_id}/unanswered")]
async fn mark_unanswered(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    answer_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let (answer, question) = answers::mark_unanswered(db.get_ref(), user_id, *answer_id).await?;
    Ok(trigger("question-answered").json(serde_json::json!({
        "answer": answer,
        "question": question,
    })))
}

#[get("/community/answers/{answer_id}/histories")]
async fn view_answer_histories(
    db: web::Data<DatabaseConnection>,
    answer_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    answers::get_answer(db.get_ref(), *answer_id).await?;
    let histories = answers::list_answer_histories(db.get_ref(), *answer_id).await?;
    Ok(HttpResponse::Ok().json(histories))
}

#[get("/community/answers/{answer_id}/comments")]
async fn list_answer_comments(
    db: web::Data<DatabaseConnection>,
    answer_id: web::Path<i32>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    let query = params.parse()?;
    answers::get_answer(db.get_ref(), *answer_id).await?;
    let page = answer_comments::list_answer_comments(db.get_ref(), *answer_id, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/community/answers/{answer_id}/comments")]
async fn create_answer_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    answer_id: web::Path<i32>,
    form: web::Form<ContentForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let comment =
        answer_comments::create_answer_comment(db.get_ref(), user_id, *answer_id, &form.content)
            .await?;
    Ok(settle("comment-created").json(comment))
}

#[put("/community/answers/{answer_id}/comments/{comment_id}")]
async fn update_answer_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Form<ContentForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let (answer_id, comment_id) = path.into_inner();
    let comment = answer_comments::update_answer_comment(
        db.get_ref(),
        user_id,
        answer_id,
        comment_id,
        &form.content,
    )
    .await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[delete("/community/answers/{answer_id}/comments/{comment_id}")]
async fn delete_answer_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let (answer_id, comment_id) = path.into_inner();
    let comment =
        answer_comments::delete_answer_comment(db.get_ref(), user_id, answer_id, comment_id)
            .await?;
    Ok(HttpResponse::Ok().json(comment))
}
