//! Product administration and image uploads.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use validator::Validate;

use crate::domain::aggregates::{Product, ProductDraft};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::media::{self, BlobError, BlobStore};
use crate::services::events::{publish_detached, EventPublisher};
use crate::services::field_messages;
use crate::store::{self, DocumentStore, StoreError, PRODUCTS};

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Please fix the errors in the form")]
    Invalid(BTreeMap<String, String>),
    #[error("Product {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ProductAdmin {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    events: Arc<dyn EventPublisher>,
}

impl ProductAdmin {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, blobs, events }
    }

    fn check(draft: &ProductDraft) -> Result<(), ProductError> {
        draft.validate().map_err(|e| ProductError::Invalid(field_messages(&e)))
    }

    pub async fn create(&self, draft: ProductDraft) -> Result<Product, ProductError> {
        Self::check(&draft)?;
        let mut product = draft.into_product(String::new(), Utc::now());
        product.id = self.store.insert(PRODUCTS, store::encode(&product)?).await.map_err(|e| {
            tracing::error!(error = %e, "Error saving product");
            e
        })?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Replaces the editable fields. The rating aggregate is left as stored, and
    /// images dropped from the list are removed from the blob store.
    pub async fn update(&self, id: &str, draft: ProductDraft) -> Result<Product, ProductError> {
        Self::check(&draft)?;
        let mut product: Product = store::fetch(self.store.as_ref(), PRODUCTS, id).await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;
        let previous_images = std::mem::take(&mut product.images);
        draft.apply_to(&mut product);
        product.updated_at = Some(Utc::now());

        let mut patch = store::encode(&product)?;
        // The aggregate may have moved since the read; never write it back from here.
        patch.remove("averageRating");
        patch.remove("reviewCount");
        self.store.update(PRODUCTS, id, patch).await.map_err(|e| match e {
            StoreError::NotFound { .. } => ProductError::NotFound(id.to_string()),
            e => {
                tracing::error!(product_id = id, error = %e, "Error saving product");
                e.into()
            }
        })?;
        let dropped: Vec<String> = previous_images.into_iter().filter(|url| !product.images.contains(url)).collect();
        self.delete_blobs(&dropped).await;
        tracing::info!(product_id = id, "product updated");
        Ok(product)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ProductError> {
        let product: Product = store::fetch(self.store.as_ref(), PRODUCTS, id).await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;
        self.store.delete(PRODUCTS, id).await.map_err(|e| {
            tracing::error!(product_id = id, error = %e, "Error deleting product");
            e
        })?;
        self.delete_blobs(&product.images).await;
        tracing::info!(product_id = id, "product deleted");
        publish_detached(&self.events, DomainEvent::Product(ProductEvent::Deleted { product_id: id.to_string() }));
        Ok(())
    }

    /// Validates and stores an image, returning its public URL.
    pub async fn upload_image(&self, product_id: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Result<String, ProductError> {
        media::validate_image(content_type, bytes.len())?;
        let path = media::product_image_path(product_id, file_name, Utc::now().timestamp_millis());
        let url = self.blobs.upload(&path, bytes).await.map_err(|e| {
            tracing::error!(path = %path, error = %e, "Error uploading image");
            e
        })?;
        tracing::info!(product_id, url = %url, size = bytes.len(), "image uploaded");
        Ok(url)
    }

    async fn delete_blobs(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.blobs.delete(url).await {
                tracing::warn!(url = %url, error = %e, "Error deleting image");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Category, SizeStock};
    use crate::media::FsBlobStore;
    use crate::services::events::testing::RecordingPublisher;
    use crate::store::{Fields, MemoryStore};

    struct Fixture {
        _dir: tempfile::TempDir,
        root: std::path::PathBuf,
        store: Arc<MemoryStore>,
        admin: ProductAdmin,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(FsBlobStore::new(root.clone(), "/media"));
        let admin = ProductAdmin::new(store.clone(), blobs, Arc::new(RecordingPublisher::default()));
        Fixture { _dir: dir, root, store, admin }
    }

    fn draft(images: Vec<String>) -> ProductDraft {
        ProductDraft {
            name: "Leather Mules".into(), category: Category::Shoes, price: 32000, description: String::new(),
            images, sizes: vec![SizeStock { size: "40".into(), stock: 2 }, SizeStock { size: "41".into(), stock: 1 }],
            colors: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_validates_and_starts_unrated() {
        let f = fixture();
        let invalid = ProductDraft { price: 0, ..draft(vec![]) };
        match f.admin.create(invalid).await.unwrap_err() {
            ProductError::Invalid(fields) => {
                assert_eq!(fields["price"], "Valid price is required");
                assert_eq!(fields["images"], "At least one image is required");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(f.store.is_empty(PRODUCTS));

        let created = f.admin.create(draft(vec!["/media/a.jpg".into()])).await.unwrap();
        let stored: Product = store::fetch(f.store.as_ref(), PRODUCTS, &created.id).await.unwrap().unwrap();
        assert_eq!(stored.review_count, 0);
        assert_eq!(stored.stock_for("40"), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_rating_aggregate() {
        let f = fixture();
        let created = f.admin.create(draft(vec!["/media/a.jpg".into()])).await.unwrap();
        let mut rating = Fields::new();
        rating.insert("averageRating".into(), 4.5.into());
        rating.insert("reviewCount".into(), 2.into());
        f.store.update(PRODUCTS, &created.id, rating).await.unwrap();

        f.admin.update(&created.id, ProductDraft { price: 30000, ..draft(vec!["/media/a.jpg".into()]) }).await.unwrap();
        let stored: Product = store::fetch(f.store.as_ref(), PRODUCTS, &created.id).await.unwrap().unwrap();
        assert_eq!(stored.price, 30000);
        assert_eq!(stored.review_count, 2);
        assert_eq!(stored.average_rating, 4.5);
        assert!(stored.updated_at.is_some());

        assert!(matches!(f.admin.update("nope", draft(vec!["/media/a.jpg".into()])).await, Err(ProductError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upload_then_delete_removes_images() {
        let f = fixture();
        let url = f.admin.upload_image("new", "look book.png", "image/png", b"\x89PNG").await.unwrap();
        assert!(url.starts_with("/media/products/new/"));
        assert!(url.ends_with("-look_book.png"));
        let file = f.root.join(url.trim_start_matches("/media/"));
        assert!(file.exists());

        let created = f.admin.create(draft(vec![url])).await.unwrap();
        f.admin.delete(&created.id).await.unwrap();
        assert!(f.store.is_empty(PRODUCTS));
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_upload_rules() {
        let f = fixture();
        assert!(matches!(f.admin.upload_image("p", "a.gif", "image/gif", b"GIF8").await, Err(ProductError::Blob(BlobError::UnsupportedType(_)))));
        assert!(matches!(f.admin.upload_image("p", "a.png", "image/png", b"").await, Err(ProductError::Blob(BlobError::Empty))));
    }
}
