//! Votes and reactions, addressed as `/community/{target}/{id}/...` where
//! target is the plural path segment of the content type.

use crate::community::{reactions, votes};
use crate::middleware::ClientCtx;
use crate::orm::reactions::ReactionTarget;
use crate::orm::votes::VoteTarget;
use actix_web::{delete, get, post, web, Error, HttpResponse, Responder};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(cast_vote)
        .service(retract_vote)
        .service(view_reactions)
        .service(react);
}

#[derive(Debug, Deserialize)]
pub struct ReactionForm {
    /// `react <code>` or `unreact <code>`
    pub action: String,
}

#[post("/community/{target}/{target_id}/vote")]
async fn cast_vote(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
) -> Result<impl Responder, Error> {
    let (target, target_id) = path.into_inner();
    let target: VoteTarget = target.parse()?;
    let user_id = client.require_login()?;

    let vote_count = votes::cast_vote(db.get_ref(), user_id, target, target_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "vote_count": vote_count,
        "voted": true,
    })))
}

#[delete("/community/{target}/{target_id}/vote")]
async fn retract_vote(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
) -> Result<impl Responder, Error> {
    let (target, target_id) = path.into_inner();
    let target: VoteTarget = target.parse()?;
    let user_id = client.require_login()?;

    let vote_count = votes::retract_vote(db.get_ref(), user_id, target, target_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "vote_count": vote_count,
        "voted": false,
    })))
}

#[get("/community/{target}/{target_id}/reactions")]
async fn view_reactions(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
) -> Result<impl Responder, Error> {
    let (target, target_id) = path.into_inner();
    let target: ReactionTarget = target.parse()?;

    let summary =
        reactions::reaction_summary(db.get_ref(), target, target_id, client.get_id())
            .await
            .map_err(crate::error::ServiceError::from)?;
    Ok(HttpResponse::Ok().json(summary))
}

#[post("/community/{target}/{target_id}/reactions")]
async fn react(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    path: web::Path<(String, i32)>,
    form: web::Form<ReactionForm>,
) -> Result<impl Responder, Error> {
    let (target, target_id) = path.into_inner();
    let target: ReactionTarget = target.parse()?;
    let user_id = client.require_login()?;
    let action: reactions::ReactionAction = form.action.parse()?;

    let summary =
        reactions::apply_reaction(db.get_ref(), user_id, target, target_id, action).await?;
    Ok(HttpResponse::Ok().json(summary))
}
