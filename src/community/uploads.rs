//! Images uploaded from the editor while writing a question or a post.

use super::{check_category, now, HELP_CATEGORY};
use crate::app_config;
use crate::error::ServiceError;
use crate::orm::{post_images, question_images};
use crate::storage::{self, StorageBackend, StoredImage};
use sea_orm::{entity::*, DatabaseConnection};

/// Stores the image and records it against the board it was uploaded for.
/// Returns the stored image; the editor embeds its `url`.
pub async fn upload_editor_image(
    db: &DatabaseConnection,
    storage: &dyn StorageBackend,
    user_id: i32,
    category: &str,
    data: Vec<u8>,
    original_filename: &str,
    mimetype: Option<String>,
) -> Result<StoredImage, ServiceError> {
    if category != HELP_CATEGORY {
        check_category(category)?;
    }

    let max_bytes = app_config::limits().max_upload_size_mb as usize * 1024 * 1024;
    let image =
        storage::store_image(storage, data, original_filename, mimetype, max_bytes).await?;

    if category == HELP_CATEGORY {
        question_images::ActiveModel {
            user_id: Set(user_id),
            question_id: Set(None),
            url: Set(image.url.clone()),
            filename: Set(image.filename.clone()),
            original_filename: Set(Some(image.original_filename.clone())),
            mimetype: Set(image.mimetype.clone()),
            filesize: Set(Some(image.filesize)),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    } else {
        post_images::ActiveModel {
            user_id: Set(user_id),
            post_id: Set(None),
            url: Set(image.url.clone()),
            filename: Set(image.filename.clone()),
            original_filename: Set(Some(image.original_filename.clone())),
            mimetype: Set(image.mimetype.clone()),
            filesize: Set(Some(image.filesize)),
            created_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    log::info!(
        "User {} uploaded {} ({} bytes) for {}",
        user_id,
        image.filename,
        image.filesize,
        category
    );
    Ok(image)
}
