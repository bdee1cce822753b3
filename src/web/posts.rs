//! Category boards: posts and their threaded comments.

use super::answers::ContentForm;
use super::questions::ArticleForm;
use super::{redirect, settle};
use crate::commons::CommonParameters;
use crate::community::{check_category, post_comments, posts, tags};
use crate::middleware::ClientCtx;
use actix_web::{delete, get, post, put, web, Error, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_post)
        .service(delete_post)
        .service(update_post)
        .service(view_post_histories)
        .service(list_post_comments)
        .service(create_post_comment)
        .service(update_post_comment)
        .service(delete_post_comment)
        .service(list_comment_replies)
        .service(create_comment_reply)
        // `{category}` patterns last.
        .service(list_posts)
        .service(create_post);
}

#[get("/community/{category}/posts")]
async fn list_posts(
    db: web::Data<DatabaseConnection>,
    category: web::Path<String>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    check_category(&category)?;
    let query = params.parse()?;
    let page = posts::list_posts_by_category(db.get_ref(), &category, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/community/{category}/new")]
async fn create_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    category: web::Path<String>,
    form: web::Form<ArticleForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let tag_names = tags::parse_tags(form.tags.as_deref())?;

    let post = posts::create_post(
        db.get_ref(),
        user_id,
        &category,
        &form.title,
        &form.content,
        &tag_names,
    )
    .await?;

    Ok(HttpResponse::Created()
        .insert_header(("HX-Redirect", format!("/community/posts/{}", post.id)))
        .json(post))
}

#[get("/community/posts/{post_id}")]
async fn view_post(
    db: web::Data<DatabaseConnection>,
    post_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let view = posts::view_post(db.get_ref(), *post_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Sends the browser back to the board the post was on.
#[delete("/community/posts/{post_id}")]
async fn delete_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    post_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let post = posts::delete_post(db.get_ref(), user_id, *post_id).await?;
    Ok(redirect(&format!("/community/{}/posts", post.category)))
}

#[post("/community/posts/{post_id}/edit")]
async fn update_post(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    post_id: web::Path<i32>,
    form: web::Form<ArticleForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let tag_names = tags::parse_tags(form.tags.as_deref())?;

    let post = posts::update_post(
        db.get_ref(),
        user_id,
        *post_id,
        &form.title,
        &form.content,
        &tag_names,
    )
    .await?;

    Ok(HttpResponse::Ok()
        .insert_header(("HX-Redirect", format!("/community/posts/{}", post.id)))
        .json(post))
}

#[get("/community/posts/{post_id}/histories")]
async fn view_post_histories(
    db: web::Data<DatabaseConnection>,
    post_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    posts::get_post(db.get_ref(), *post_id).await?;
    let histories = posts::list_post_histories(db.get_ref(), *post_id).await?;
    Ok(HttpResponse::Ok().json(histories))
}

#[get("/community/posts/{post_id}/comments")]
async fn list_post_comments(
    db: web::Data<DatabaseConnection>,
    post_id: web::Path<i32>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    let query = params.parse()?;
    posts::get_post(db.get_ref(), *post_id).await?;
    let page = post_comments::list_post_comments(db.get_ref(), *post_id, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/community/posts/{post_id}/comments")]
async fn create_post_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    post_id: web::Path<i32>,
    form: web::Form<ContentForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let comment =
        post_comments::create_post_comment(db.get_ref(), user_id, *post_id, &form.content).await?;
    Ok(settle("postcomment-created").json(comment))
}

#[put("/community/posts/{post_id}/comments/{comment_id}")]
async fn update_post_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Form<ContentForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let (post_id, comment_id) = path.into_inner();
    let comment = post_comments::update_post_comment(
        db.get_ref(),
        user_id,
        post_id,
        comment_id,
        &form.content,
    )
    .await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[delete("/community/posts/{post_id}/comments/{comment_id}")]
async fn delete_post_comment(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let (post_id, comment_id) = path.into_inner();
    let comment =
        post_comments::delete_post_comment(db.get_ref(), user_id, post_id, comment_id).await?;
    Ok(settle("postcomment-deleted").json(comment))
}

#[get("/community/posts/{post_id}/comments/{comment_id}/comments")]
async fn list_comment_replies(
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    let query = params.parse()?;
    let (post_id, comment_id) = path.into_inner();
    let page =
        post_comments::list_comment_replies(db.get_ref(), post_id, comment_id, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/community/posts/{post_id}/comments/{comment_id}/comments")]
async fn create_comment_reply(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(i32, i32)>,
    form: web::Form<ContentForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let (post_id, comment_id) = path.into_inner();
    let reply = post_comments::create_comment_reply(
        db.get_ref(),
        user_id,
        post_id,
        comment_id,
        &form.content,
    )
    .await?;
    Ok(settle("comment-to-post-comment-created").json(reply))
}
