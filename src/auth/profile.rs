//! Profile and account settings of the signed-in user.

use super::{get_user, now, validate_nickname, validate_password};
use crate::app_config;
use crate::error::ServiceError;
use crate::orm::user_sns::SnsPlatform;
use crate::orm::{user_avatars, user_backdrops, user_sns, users};
use crate::session::{hash_password, verify_password};
use crate::storage::{self, StorageBackend, StoredImage};
use sea_orm::{
    entity::*, query::*, ActiveEnum, DatabaseConnection, Iterable, PaginatorTrait,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;

const MAX_ABOUT_ME_LENGTH: usize = 1000;
const MAX_SNS_LINK_LENGTH: usize = 255;

/// Avatars and backdrops do not accept animated gifs.
const PROFILE_IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Everything the profile page shows.
#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub user: users::Model,
    pub avatar: Option<user_avatars::Model>,
    pub backdrop: Option<user_backdrops::Model>,
    pub sns: Vec<user_sns::Model>,
}

/// One profile link as submitted by the settings form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnsEntry {
    pub platform: SnsPlatform,
    pub link: String,
    pub public: bool,
}

/// Reads `sns_{platform}` and `sns_{platform}_public` fields. Platforms
/// missing from the form are left out.
pub fn parse_sns_form(form: &HashMap<String, String>) -> Vec<SnsEntry> {
    SnsPlatform::iter()
        .filter_map(|platform| {
            let name = platform.to_value();
            let link = form.get(&format!("sns_{}", name))?;
            let public = form
                .get(&format!("sns_{}_public", name))
                .map(|v| v == "true")
                .unwrap_or(false);
            Some(SnsEntry {
                platform,
                link: link.trim().to_owned(),
                public,
            })
        })
        .collect()
}

pub async fn get_profile(db: &DatabaseConnection, user_id: i32) -> Result<UserProfile, ServiceError> {
    let user = get_user(db, user_id).await?;
    let avatar = user_avatars::Entity::find()
        .filter(user_avatars::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    let backdrop = user_backdrops::Entity::find()
        .filter(user_backdrops::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    let sns = list_sns(db, user_id).await?;

    Ok(UserProfile {
        user,
        avatar,
        backdrop,
        sns,
    })
}

async fn list_sns(db: &DatabaseConnection, user_id: i32) -> Result<Vec<user_sns::Model>, ServiceError> {
    Ok(user_sns::Entity::find()
        .filter(user_sns::Column::UserId.eq(user_id))
        .order_by_asc(user_sns::Column::Id)
        .all(db)
        .await?)
}

pub async fn update_about_me(
    db: &DatabaseConnection,
    user_id: i32,
    about_me: &str,
) -> Result<users::Model, ServiceError> {
    let about_me = about_me.trim();
    if about_me.chars().count() > MAX_ABOUT_ME_LENGTH {
        return Err(ServiceError::validation(format!(
            "About me must be at most {} characters",
            MAX_ABOUT_ME_LENGTH
        )));
    }

    let mut user: users::ActiveModel = get_user(db, user_id).await?.into();
    user.about_me = Set(if about_me.is_empty() {
        None
    } else {
        Some(about_me.to_owned())
    });
    Ok(user.update(db).await?)
}

/// Replaces the user's profile links with `entries`. An empty submission
/// keeps the current links.
pub async fn update_sns(
    db: &DatabaseConnection,
    user_id: i32,
    entries: &[SnsEntry],
) -> Result<Vec<user_sns::Model>, ServiceError> {
    if entries.is_empty() {
        return list_sns(db, user_id).await;
    }
    if let Some(entry) = entries
        .iter()
        .find(|e| e.link.chars().count() > MAX_SNS_LINK_LENGTH)
    {
        return Err(ServiceError::validation(format!(
            "{} link is too long",
            entry.platform.to_value()
        )));
    }

    let created_at = now();
    let txn = db.begin().await?;
    user_sns::Entity::delete_many()
        .filter(user_sns::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    for entry in entries {
        user_sns::ActiveModel {
            user_id: Set(user_id),
            platform: Set(entry.platform),
            link: Set(entry.link.clone()),
            public: Set(entry.public),
            created_at: Set(created_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    list_sns(db, user_id).await
}

async fn store_profile_image(
    storage: &dyn StorageBackend,
    data: Vec<u8>,
    original_filename: &str,
    mimetype: Option<String>,
) -> Result<StoredImage, ServiceError> {
    let ext = storage::image_extension(&storage::sanitize_filename(original_filename))?;
    if !PROFILE_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ServiceError::validation(format!(
            "`.{}` is not allowed for profile images",
            ext
        )));
    }

    let max_bytes = app_config::limits().max_upload_size_mb as usize * 1024 * 1024;
    Ok(storage::store_image(storage, data, original_filename, mimetype, max_bytes).await?)
}

/// Removes a replaced profile image unless it is a shipped default or
/// another profile still points at the same stored file.
async fn discard_old_file(db: &DatabaseConnection, storage: &dyn StorageBackend, filename: &str) {
    if filename.starts_with("default_") {
        return;
    }

    let users_left = async {
        let avatars = user_avatars::Entity::find()
            .filter(user_avatars::Column::Filename.eq(filename))
            .count(db)
            .await?;
        let backdrops = user_backdrops::Entity::find()
            .filter(user_backdrops::Column::Filename.eq(filename))
            .count(db)
            .await?;
        Ok::<u64, sea_orm::DbErr>(avatars + backdrops)
    };

    match users_left.await {
        Ok(0) => {
            if let Err(e) = storage.delete_object(filename).await {
                log::error!("Failed to remove old profile image {}: {}", filename, e);
            }
        }
        Ok(_) => {}
        Err(e) => log::error!("Failed to check references to {}: {}", filename, e),
    }
}

pub async fn update_avatar(
    db: &DatabaseConnection,
    storage: &dyn StorageBackend,
    user_id: i32,
    data: Vec<u8>,
    original_filename: &str,
    mimetype: Option<String>,
) -> Result<user_avatars::Model, ServiceError> {
    let old = user_avatars::Entity::find()
        .filter(user_avatars::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Avatar"))?;
    let old_filename = old.filename.clone();

    let image = store_profile_image(storage, data, original_filename, mimetype).await?;
    let mut avatar: user_avatars::ActiveModel = old.into();
    avatar.url = Set(image.url);
    avatar.filename = Set(image.filename);
    avatar.original_filename = Set(Some(image.original_filename));
    avatar.mimetype = Set(image.mimetype);
    avatar.filesize = Set(Some(image.filesize));
    avatar.updated_at = Set(Some(now()));
    let avatar = avatar.update(db).await?;

    if avatar.filename != old_filename {
        discard_old_file(db, storage, &old_filename).await;
    }
    Ok(avatar)
}

pub async fn update_backdrop(
    db: &DatabaseConnection,
    storage: &dyn StorageBackend,
    user_id: i32,
    data: Vec<u8>,
    original_filename: &str,
    mimetype: Option<String>,
) -> Result<user_backdrops::Model, ServiceError> {
    let old = user_backdrops::Entity::find()
        .filter(user_backdrops::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Backdrop"))?;
    let old_filename = old.filename.clone();

    let image = store_profile_image(storage, data, original_filename, mimetype).await?;
    let mut backdrop: user_backdrops::ActiveModel = old.into();
    backdrop.url = Set(image.url);
    backdrop.filename = Set(image.filename);
    backdrop.original_filename = Set(Some(image.original_filename));
    backdrop.mimetype = Set(image.mimetype);
    backdrop.filesize = Set(Some(image.filesize));
    backdrop.updated_at = Set(Some(now()));
    let backdrop = backdrop.update(db).await?;

    if backdrop.filename != old_filename {
        discard_old_file(db, storage, &old_filename).await;
    }
    Ok(backdrop)
}

/// The old password is checked before the new one is judged.
pub async fn change_password(
    db: &DatabaseConnection,
    user_id: i32,
    oldpassword: &str,
    newpassword: &str,
) -> Result<(), ServiceError> {
    let user = get_user(db, user_id).await?;
    if !verify_password(oldpassword, &user.password) {
        return Err(ServiceError::Unauthorized.with_trigger("password-dont-match"));
    }
    validate_password(newpassword).map_err(|e| ServiceError::validation(e.to_string()))?;

    let password = hash_password(newpassword)
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))?;
    let mut user: users::ActiveModel = user.into();
    user.password = Set(password);
    user.update(db).await?;

    log::info!("User {} changed their password", user_id);
    Ok(())
}

pub async fn change_nickname(
    db: &DatabaseConnection,
    user_id: i32,
    nickname: &str,
) -> Result<users::Model, ServiceError> {
    validate_nickname(nickname).map_err(|e| ServiceError::validation(e.to_string()))?;

    let taken = users::Entity::find()
        .filter(users::Column::Nickname.eq(nickname))
        .count(db)
        .await?
        > 0;
    if taken {
        return Err(
            ServiceError::Conflict(format!("`{}` is taken", nickname))
                .with_trigger("nickname-already-exists"),
        );
    }

    let mut user: users::ActiveModel = get_user(db, user_id).await?.into();
    user.nickname = Set(nickname.to_owned());
    Ok(user.update(db).await?)
}
