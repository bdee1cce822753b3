//! Tags for questions and posts. Questions and posts keep separate tag
//! tables; a tag is looked up by its exact, case-sensitive name.

use super::now;
use crate::error::ServiceError;
use crate::orm::{post_tag_links, post_tags, question_tag_links, question_tags};
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use serde::Deserialize;

pub const MAX_TAGS: usize = 5;
pub const MAX_TAG_LENGTH: usize = 30;

#[derive(Deserialize)]
struct TagifyValue {
    value: String,
}

/// Parses the tag field of a form. Accepts the editor's JSON list
/// (`[{"value":"rust"}]`) or a comma separated string.
pub fn parse_tags(raw: Option<&str>) -> Result<Vec<String>, ServiceError> {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(Vec::new()),
    };

    let names: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str::<Vec<TagifyValue>>(raw)
            .map_err(|e| ServiceError::validation(format!("Malformed tags: {}", e)))?
            .into_iter()
            .map(|t| t.value)
            .collect()
    } else {
        raw.split(',').map(str::to_owned).collect()
    };

    let mut tags: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() || tags.iter().any(|t| t == name) {
            continue;
        }
        if name.chars().count() > MAX_TAG_LENGTH {
            return Err(ServiceError::validation(format!(
                "Tags must be at most {} characters",
                MAX_TAG_LENGTH
            )));
        }
        tags.push(name.to_owned());
    }

    if tags.len() > MAX_TAGS {
        return Err(ServiceError::validation(format!(
            "At most {} tags are allowed",
            MAX_TAGS
        )));
    }
    Ok(tags)
}

pub async fn get_or_create_question_tags<C: ConnectionTrait>(
    db: &C,
    names: &[String],
) -> Result<Vec<question_tags::Model>, DbErr> {
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let existing = question_tags::Entity::find()
            .filter(question_tags::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        let tag = match existing {
            Some(tag) => tag,
            None => {
                question_tags::ActiveModel {
                    name: Set(name.to_owned()),
                    created_at: Set(now()),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };
        tags.push(tag);
    }
    Ok(tags)
}

pub async fn get_or_create_post_tags<C: ConnectionTrait>(
    db: &C,
    names: &[String],
) -> Result<Vec<post_tags::Model>, DbErr> {
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let existing = post_tags::Entity::find()
            .filter(post_tags::Column::Name.eq(name.as_str()))
            .one(db)
            .await?;
        let tag = match existing {
            Some(tag) => tag,
            None => {
                post_tags::ActiveModel {
                    name: Set(name.to_owned()),
                    created_at: Set(now()),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };
        tags.push(tag);
    }
    Ok(tags)
}

/// Replaces the question's tag set.
pub async fn set_question_tags<C: ConnectionTrait>(
    db: &C,
    question_id: i32,
    names: &[String],
) -> Result<Vec<question_tags::Model>, DbErr> {
    question_tag_links::Entity::delete_many()
        .filter(question_tag_links::Column::QuestionId.eq(question_id))
        .exec(db)
        .await?;

    let tags = get_or_create_question_tags(db, names).await?;
    for tag in &tags {
        question_tag_links::ActiveModel {
            question_id: Set(question_id),
            tag_id: Set(tag.id),
        }
        .insert(db)
        .await?;
    }
    Ok(tags)
}

/// Replaces the post's tag set.
pub async fn set_post_tags<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
    names: &[String],
) -> Result<Vec<post_tags::Model>, DbErr> {
    post_tag_links::Entity::delete_many()
        .filter(post_tag_links::Column::PostId.eq(post_id))
        .exec(db)
        .await?;

    let tags = get_or_create_post_tags(db, names).await?;
    for tag in &tags {
        post_tag_links::ActiveModel {
            post_id: Set(post_id),
            tag_id: Set(tag.id),
        }
        .insert(db)
        .await?;
    }
    Ok(tags)
}

pub async fn question_tags_of<C: ConnectionTrait>(
    db: &C,
    question_id: i32,
) -> Result<Vec<question_tags::Model>, DbErr> {
    question_tags::Entity::find()
        .inner_join(question_tag_links::Entity)
        .filter(question_tag_links::Column::QuestionId.eq(question_id))
        .order_by_asc(question_tags::Column::Name)
        .all(db)
        .await
}

pub async fn post_tags_of<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
) -> Result<Vec<post_tags::Model>, DbErr> {
    post_tags::Entity::find()
        .inner_join(post_tag_links::Entity)
        .filter(post_tag_links::Column::PostId.eq(post_id))
        .order_by_asc(post_tags::Column::Name)
        .all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagify_json() {
        let tags = parse_tags(Some(r#"[{"value":"rust"},{"value":"Rust"},{"value":"rust"}]"#))
            .unwrap();
        assert_eq!(tags, vec!["rust", "Rust"]);
    }

    #[test]
    fn test_parse_comma_separated() {
        assert_eq!(
            parse_tags(Some(" flask , , sqlalchemy")).unwrap(),
            vec!["flask", "sqlalchemy"]
        );
        assert!(parse_tags(None).unwrap().is_empty());
        assert!(parse_tags(Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_too_many_or_too_long() {
        assert!(parse_tags(Some("a,b,c,d,e,f")).is_err());
        assert!(parse_tags(Some(&"x".repeat(31))).is_err());
        assert!(parse_tags(Some("[not json")).is_err());
    }
}
