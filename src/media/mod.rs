//! Blob storage for product images.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("No file provided")]
    Empty,
    #[error("Only JPG, PNG, and WebP images are allowed")]
    UnsupportedType(String),
    #[error("Image must be less than 5MB")]
    TooLarge(usize),
    #[error("invalid blob path {0:?}")]
    InvalidPath(String),
    #[error("blob io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejects empty uploads, non-image types and anything over 5 MB.
pub fn validate_image(content_type: &str, size: usize) -> Result<(), BlobError> {
    if size == 0 { return Err(BlobError::Empty); }
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&mime.as_str()) { return Err(BlobError::UnsupportedType(mime)); }
    if size > MAX_IMAGE_BYTES { return Err(BlobError::TooLarge(size)); }
    Ok(())
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at `path` and returns its public URL.
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError>;

    /// Deletes the blob behind a URL previously returned by `upload`.
    async fn delete(&self, url: &str) -> Result<(), BlobError>;
}

/// Blobs as files under a root directory, served from `base_url`.
pub struct FsBlobStore {
    root: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self { root: root.into(), base_url: base_url.trim_end_matches('/').to_string() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(path);
        let clean = !path.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !clean { return Err(BlobError::InvalidPath(path.to_string())); }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(format!("{}/{}", self.base_url, path))
    }

    async fn delete(&self, url: &str) -> Result<(), BlobError> {
        let Some(path) = url.strip_prefix(&self.base_url).map(|p| p.trim_start_matches('/')) else {
            return Err(BlobError::InvalidPath(url.to_string()));
        };
        match tokio::fs::remove_file(self.resolve(path)?).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Storage path for a product image: `products/<product>/<millis>-<file name>`.
pub fn product_image_path(product_id: &str, file_name: &str, millis: i64) -> String {
    let name: String = file_name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    format!("products/{product_id}/{millis}-{}", name.trim_start_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_image() {
        assert!(validate_image("image/png", 1024).is_ok());
        assert!(validate_image("IMAGE/WEBP; charset=binary", 1024).is_ok());
        assert!(matches!(validate_image("image/gif", 1024), Err(BlobError::UnsupportedType(_))));
        assert!(matches!(validate_image("image/jpeg", MAX_IMAGE_BYTES + 1), Err(BlobError::TooLarge(_))));
        assert!(matches!(validate_image("image/jpeg", 0), Err(BlobError::Empty)));
    }

    #[test]
    fn test_product_image_path_sanitizes_name() {
        assert_eq!(product_image_path("p1", "../my photo.png", 42), "products/p1/42-_my_photo.png");
        assert_eq!(product_image_path("p1", "dress.jpg", 7), "products/p1/7-dress.jpg");
    }

    #[tokio::test]
    async fn test_fs_upload_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = FsBlobStore::new(dir.path(), "/media/");
        let url = blobs.upload("products/p1/1-a.png", b"png").await.unwrap();
        assert_eq!(url, "/media/products/p1/1-a.png");
        assert!(dir.path().join("products/p1/1-a.png").exists());
        blobs.delete(&url).await.unwrap();
        blobs.delete(&url).await.unwrap();
        assert!(!dir.path().join("products/p1/1-a.png").exists());
        assert!(blobs.upload("../escape.png", b"x").await.is_err());
    }
}
