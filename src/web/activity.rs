//! The signed-in user's own activity log.

use crate::activities::{self, ActivityGroup};
use crate::commons::CommonParameters;
use crate::error::ServiceError;
use crate::middleware::ClientCtx;
use actix_web::{get, web, Error, HttpResponse, Responder};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut web::ServiceConfig) {
    conf.service(view_activity).service(view_activity_tab);
}

fn group_of_tab(tab: &str) -> Result<ActivityGroup, ServiceError> {
    match tab {
        "questions-and-posts" => Ok(ActivityGroup::QuestionsAndPosts),
        "answers-and-comments" => Ok(ActivityGroup::AnswersAndComments),
        "votes" => Ok(ActivityGroup::Votes),
        "reactions" => Ok(ActivityGroup::Reactions),
        _ => Err(ServiceError::NotFound("Activity tab")),
    }
}

async fn render(
    client: &ClientCtx,
    db: &DatabaseConnection,
    group: ActivityGroup,
    params: &CommonParameters,
) -> Result<HttpResponse, Error> {
    let user_id = client.require_login()?;
    let query = params.parse()?;
    let page = activities::list_user_actions(db, user_id, group, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/users/me/activity")]
async fn view_activity(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    render(&client, db.get_ref(), ActivityGroup::All, &params).await
}

#[get("/users/me/activity/{tab}")]
async fn view_activity_tab(
    client: ClientCtx,
    db: web::Data<DatabaseConnection>,
    tab: web::Path<String>,
    params: web::Query<CommonParameters>,
) -> Result<impl Responder, Error> {
    let group = group_of_tab(&tab)?;
    render(&client, db.get_ref(), group, &params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_of_tab() {
        assert_eq!(group_of_tab("votes").unwrap(), ActivityGroup::Votes);
        assert_eq!(
            group_of_tab("questions-and-posts").unwrap(),
            ActivityGroup::QuestionsAndPosts
        );
        assert!(group_of_tab("everything").is_err());
    }
}
