//! Local filesystem storage backend.

use super::{ByteStream, StorageBackend, StorageError, StorageObject};
use actix_web::web::{self, Bytes};
use async_trait::async_trait;
use futures::stream;
use std::fs;
use std::path::PathBuf;

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    public_url: String,
}

impl LocalStorage {
    /// The `base_path` directory will be created if it doesn't exist.
    pub fn new(base_path: PathBuf, public_url: &str) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path)?;
        log::info!("LocalStorage initialized at {:?}", base_path);
        Ok(Self {
            base_path,
            public_url: public_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Files fan out into two levels of directories by hash prefix.
    fn get_file_path(&self, filename: &str) -> PathBuf {
        if filename.len() < 4 {
            self.base_path.join(filename)
        } else {
            self.base_path
                .join(&filename[0..2])
                .join(&filename[2..4])
                .join(filename)
        }
    }

    /// Rejects names that could escape the base directory.
    fn check_name(filename: &str) -> Result<(), StorageError> {
        let plain = filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if filename.is_empty() || !plain || filename.starts_with('.') {
            return Err(StorageError::Invalid(format!("bad file name `{}`", filename)));
        }
        Ok(())
    }

    fn get_mime_type(filename: &str) -> Option<String> {
        let ext = filename.rsplit('.').next()?;
        let mime = match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => mime::IMAGE_JPEG,
            "png" => mime::IMAGE_PNG,
            "gif" => mime::IMAGE_GIF,
            "webp" => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
            _ => mime::APPLICATION_OCTET_STREAM,
        };
        Some(mime.essence_str().to_owned())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError> {
        Self::check_name(filename)?;
        let path = self.get_file_path(filename);
        log::info!("LocalStorage: put_object: {:?}", path);

        web::block(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, data)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        Ok(())
    }

    async fn get_object(&self, filename: &str) -> Result<StorageObject, StorageError> {
        Self::check_name(filename)?;
        let path = self.get_file_path(filename);

        let buffer = web::block(move || fs::read(&path))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        let content_length = buffer.len() as i64;
        let body: ByteStream = Box::pin(stream::once(async move { Ok(Bytes::from(buffer)) }));

        Ok(StorageObject {
            body,
            content_length: Some(content_length),
            content_type: Self::get_mime_type(filename),
        })
    }

    async fn delete_object(&self, filename: &str) -> Result<(), StorageError> {
        Self::check_name(filename)?;
        let path = self.get_file_path(filename);
        log::info!("LocalStorage: delete_object: {:?}", path);

        match web::block(move || fs::remove_file(&path))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
        {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        Self::check_name(filename)?;
        Ok(self.get_file_path(filename).exists())
    }

    fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_url, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store_image;

    #[actix_rt::test]
    async fn test_store_and_delete_image() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), "/uploads/").unwrap();

        let image = store_image(
            &storage,
            b"not really a png".to_vec(),
            "duck.png",
            Some("image/png".to_owned()),
            1024,
        )
        .await
        .unwrap();

        assert!(image.filename.ends_with(".png"));
        assert_eq!(image.url, format!("/uploads/{}", image.filename));
        assert_eq!(image.filesize, 16);
        assert!(storage.exists(&image.filename).await.unwrap());

        storage.delete_object(&image.filename).await.unwrap();
        assert!(!storage.exists(&image.filename).await.unwrap());
        // Deleting twice is fine.
        storage.delete_object(&image.filename).await.unwrap();
    }

    #[actix_rt::test]
    async fn test_rejects_oversized_and_unknown_types() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf(), "/uploads").unwrap();

        let too_big = store_image(&storage, vec![0u8; 11], "big.jpg", None, 10).await;
        assert!(matches!(too_big, Err(StorageError::Invalid(_))));

        let wrong = store_image(&storage, vec![1u8; 4], "tool.exe", None, 10).await;
        assert!(matches!(wrong, Err(StorageError::Invalid(_))));
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert!(LocalStorage::check_name("../secret").is_err());
        assert!(LocalStorage::check_name(".hidden").is_err());
        assert!(LocalStorage::check_name("abcd.png").is_ok());
    }
}
