//! `/auth`: accounts and profile settings.

use super::{max_upload_bytes, read_file_field, redirect, settle};
use crate::auth::{self, profile, SignUpForm};
use crate::error::ServiceError;
use crate::middleware::ClientCtx;
use crate::session;
use crate::storage::StorageBackend;
use actix_multipart::Multipart;
use actix_session::Session;
use actix_web::{delete, get, post, put, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::collections::HashMap;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(sign_up)
        .service(sign_up_verification)
        .service(welcome)
        .service(sign_in)
        .service(sign_out)
        .service(goodbye)
        .service(forgot_password)
        .service(forgot_password_verification)
        .service(view_reset_password)
        .service(reset_password)
        .service(view_my_profile)
        .service(update_about_me)
        .service(update_sns)
        .service(update_avatar)
        .service(update_backdrop)
        .service(change_password)
        .service(change_nickname);
}

#[derive(Template)]
#[template(path = "pyduck/welcome.html")]
struct WelcomeTemplate {
    client: ClientCtx,
}

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub username: String,
    pub vcode: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GoodbyeForm {
    pub password: String,
    pub confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub username: String,
    pub vcode: String,
    pub newpassword: String,
}

#[derive(Debug, Deserialize)]
pub struct AboutMeForm {
    pub about_me: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub oldpassword: String,
    pub newpassword: String,
}

#[derive(Debug, Deserialize)]
pub struct NicknameForm {
    pub nickname: String,
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location.to_owned()))
        .finish()
}

#[post("/auth/sign-up")]
async fn sign_up(
    db: web::Data<DatabaseConnection>,
    form: web::Form<SignUpForm>,
) -> Result<impl Responder, Error> {
    let user = auth::sign_up(db.get_ref(), &form).await?;
    Ok(HttpResponse::Created().json(user))
}

#[get("/auth/sign-up/verification")]
async fn sign_up_verification(
    db: web::Data<DatabaseConnection>,
    query: web::Query<CodeQuery>,
) -> Result<impl Responder, Error> {
    auth::verify_sign_up(db.get_ref(), &query.username, &query.vcode).await?;
    Ok(see_other("/auth/sign-up/welcome"))
}

#[get("/auth/sign-up/welcome")]
async fn welcome(client: ClientCtx) -> impl Responder {
    WelcomeTemplate { client }.to_response()
}

#[post("/auth/sign-in")]
async fn sign_in(
    db: web::Data<DatabaseConnection>,
    cookies: Session,
    form: web::Form<SignInForm>,
) -> Result<impl Responder, Error> {
    let user = auth::sign_in(db.get_ref(), &form.username, &form.password).await?;
    session::login(&cookies, user.id)?;
    log::info!("User {} signed in", user.id);
    Ok(redirect("/"))
}

#[get("/auth/sign-out")]
async fn sign_out(client: ClientCtx, cookies: Session) -> Result<impl Responder, Error> {
    client.require_login()?;
    session::logout(&cookies);
    Ok(see_other("/"))
}

#[delete("/auth/goodbye")]
async fn goodbye(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    cookies: Session,
    form: web::Form<GoodbyeForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    auth::goodbye(db.get_ref(), user_id, &form.password, &form.confirm).await?;
    session::logout(&cookies);
    Ok(redirect("/"))
}

#[post("/auth/forgot-password")]
async fn forgot_password(
    db: web::Data<DatabaseConnection>,
    form: web::Form<ForgotPasswordForm>,
) -> Result<impl Responder, Error> {
    let user = auth::forgot_password(db.get_ref(), &form.username).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "username": user.username })))
}

/// The e-mailed link. A valid code leads on to the reset form.
#[get("/auth/forgot-password/verification")]
async fn forgot_password_verification(
    db: web::Data<DatabaseConnection>,
    query: web::Query<CodeQuery>,
) -> Result<impl Responder, Error> {
    let user = auth::verify_forgot_password(db.get_ref(), &query.username, &query.vcode).await?;

    let params = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("username", &user.username)
        .append_pair("vcode", &query.vcode)
        .finish();
    Ok(see_other(&format!("/auth/reset-password?{}", params)))
}

#[get("/auth/reset-password")]
async fn view_reset_password(
    db: web::Data<DatabaseConnection>,
    query: web::Query<CodeQuery>,
) -> Result<impl Responder, Error> {
    let user = auth::verify_forgot_password(db.get_ref(), &query.username, &query.vcode).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "username": user.username,
        "vcode": query.vcode,
    })))
}

#[put("/auth/reset-password")]
async fn reset_password(
    db: web::Data<DatabaseConnection>,
    form: web::Form<ResetPasswordForm>,
) -> Result<impl Responder, Error> {
    auth::reset_password(db.get_ref(), &form.username, &form.vcode, &form.newpassword).await?;
    Ok(redirect("/"))
}

#[get("/auth/me/profile")]
async fn view_my_profile(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let profile = profile::get_profile(db.get_ref(), user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[post("/auth/me/about_me")]
async fn update_about_me(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<AboutMeForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let user = profile::update_about_me(db.get_ref(), user_id, &form.about_me).await?;
    Ok(settle("about-me-modified-successfully").json(user))
}

#[post("/auth/me/sns")]
async fn update_sns(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<HashMap<String, String>>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let entries = profile::parse_sns_form(&form);
    let sns = profile::update_sns(db.get_ref(), user_id, &entries).await?;
    Ok(settle("sns-modified-successfully").json(sns))
}

#[put("/auth/me/avatar")]
async fn update_avatar(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn StorageBackend>,
    multipart: Multipart,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let file = read_file_field(multipart, "avatar", max_upload_bytes())
        .await?
        .ok_or_else(|| ServiceError::validation("No file was uploaded"))?;

    let avatar = profile::update_avatar(
        db.get_ref(),
        storage.get_ref(),
        user_id,
        file.data,
        &file.filename,
        file.mimetype,
    )
    .await?;
    Ok(settle("avatar-modified-successfully").json(avatar))
}

#[put("/auth/me/backdrop")]
async fn update_backdrop(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn StorageBackend>,
    multipart: Multipart,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let file = read_file_field(multipart, "backdrop", max_upload_bytes())
        .await?
        .ok_or_else(|| ServiceError::validation("No file was uploaded"))?;

    let backdrop = profile::update_backdrop(
        db.get_ref(),
        storage.get_ref(),
        user_id,
        file.data,
        &file.filename,
        file.mimetype,
    )
    .await?;
    Ok(settle("backdrop-modified-successfully").json(backdrop))
}

#[put("/auth/me/account/password")]
async fn change_password(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<PasswordForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    profile::change_password(db.get_ref(), user_id, &form.oldpassword, &form.newpassword).await?;
    Ok(HttpResponse::Ok()
        .insert_header(("HX-Reswap", "outerHTML"))
        .insert_header(("HX-Trigger", "password-changed-successfully"))
        .finish())
}

#[put("/auth/me/account/nickname")]
async fn change_nickname(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    form: web::Form<NicknameForm>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;
    let user = profile::change_nickname(db.get_ref(), user_id, &form.nickname).await?;
    Ok(HttpResponse::Ok()
        .insert_header(("HX-Reswap", "outerHTML"))
        .insert_header(("HX-Trigger-After-Swap", "nickname-changed-successfully"))
        .json(serde_json::json!({ "nickname": user.nickname })))
}
