//! Storage backend for uploaded images.
//!
//! Files are content-addressed: the stored name is the blake3 hash of the
//! bytes plus the original extension, so re-uploading the same picture
//! lands on the same object.

pub mod local;

use actix_web::web::Bytes;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming file content.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Image extensions accepted by every upload endpoint.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// A retrieved storage object with metadata.
pub struct StorageObject {
    pub body: ByteStream,
    pub content_length: Option<i64>,
    pub content_type: Option<String>,
}

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// File not found
    NotFound(String),
    /// I/O error
    Io(std::io::Error),
    /// Rejected upload
    Invalid(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::Invalid(msg) => write!(f, "Invalid upload: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file under `filename`.
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError>;

    async fn get_object(&self, filename: &str) -> Result<StorageObject, StorageError>;

    /// Remove a file. Missing files are not an error.
    async fn delete_object(&self, filename: &str) -> Result<(), StorageError>;

    async fn exists(&self, filename: &str) -> Result<bool, StorageError>;

    /// Public URL the file is served from.
    fn public_url(&self, filename: &str) -> String;
}

/// Metadata of an image after it has been written to storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub filename: String,
    pub original_filename: String,
    pub mimetype: Option<String>,
    pub filesize: i64,
}

/// Returns the lower-cased extension if it is an accepted image type.
pub fn image_extension(original_filename: &str) -> Result<String, StorageError> {
    let ext = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or_else(|| StorageError::Invalid("file has no extension".to_owned()))?;

    if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(StorageError::Invalid(format!(
            "`.{}` is not a supported image format",
            ext
        )))
    }
}

/// Strips any path components a browser may have sent along.
pub fn sanitize_filename(raw: &str) -> String {
    raw.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect()
}

/// Validates and writes an uploaded image.
pub async fn store_image(
    storage: &dyn StorageBackend,
    data: Vec<u8>,
    original_filename: &str,
    mimetype: Option<String>,
    max_bytes: usize,
) -> Result<StoredImage, StorageError> {
    if data.is_empty() {
        return Err(StorageError::Invalid("file is empty".to_owned()));
    }
    if data.len() > max_bytes {
        return Err(StorageError::Invalid(format!(
            "file is larger than {} bytes",
            max_bytes
        )));
    }

    let original_filename = sanitize_filename(original_filename);
    let ext = image_extension(&original_filename)?;
    let filename = format!("{}.{}", blake3::hash(&data).to_hex(), ext);
    let filesize = data.len() as i64;

    storage.put_object(data, &filename).await?;

    Ok(StoredImage {
        url: storage.public_url(&filename),
        filename,
        original_filename,
        mimetype,
        filesize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("duck.PNG").unwrap(), "png");
        assert_eq!(image_extension("a.b.webp").unwrap(), "webp");
        assert!(image_extension("script.js").is_err());
        assert!(image_extension("noext").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\pics\\my duck.jpg"), "myduck.jpg");
    }
}
