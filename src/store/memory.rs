use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

use super::{compare_values, new_id, Direction, Document, DocumentStore, Fields, Query, StoreError};

/// In-process document store. Used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<DashMap<(String, String), Fields>>,
    faults: Arc<DashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Makes every operation on `target` fail with `Unavailable`. `target` is either a
    /// collection name or `collection/id`.
    pub fn inject_fault(&self, target: impl Into<String>) { self.faults.insert(target.into()); }

    pub fn clear_fault(&self, target: &str) { self.faults.remove(target); }

    pub fn len(&self, collection: &str) -> usize {
        self.docs.iter().filter(|e| e.key().0 == collection).count()
    }

    pub fn is_empty(&self, collection: &str) -> bool { self.len(collection) == 0 }

    fn check(&self, collection: &str, id: Option<&str>) -> Result<(), StoreError> {
        if self.faults.contains(collection) {
            return Err(StoreError::Unavailable(format!("{collection} is unreachable")));
        }
        if let Some(id) = id {
            let target = format!("{collection}/{id}");
            if self.faults.contains(&target) {
                return Err(StoreError::Unavailable(format!("{target} is unreachable")));
            }
        }
        Ok(())
    }

    fn key(collection: &str, id: &str) -> (String, String) { (collection.to_string(), id.to_string()) }

    fn with_array<F>(&self, collection: &str, id: &str, field: &str, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<Value>),
    {
        self.check(collection, Some(id))?;
        let mut doc = self.docs.get_mut(&Self::key(collection, id)).ok_or_else(|| StoreError::not_found(collection, id))?;
        let mut items = match doc.get(field) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        edit(&mut items);
        doc.insert(field.to_string(), Value::Array(items));
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check(collection, Some(id))?;
        Ok(self.docs.get(&Self::key(collection, id)).map(|d| Document { id: id.to_string(), data: d.clone() }))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check(collection, None)?;
        let mut found: Vec<Document> = self.docs.iter()
            .filter(|e| e.key().0 == collection)
            .filter(|e| query.filters.iter().all(|f| f.matches(e.value())))
            .filter(|e| query.order_by.as_ref().map_or(true, |o| e.value().contains_key(&o.field)))
            .map(|e| Document { id: e.key().1.clone(), data: e.value().clone() })
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(order) = &query.order_by {
            found.sort_by(|a, b| {
                let ord = match (a.field(&order.field), b.field(&order.field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                if order.direction == Direction::Desc { ord.reverse() } else { ord }
            });
        }
        Ok(found)
    }

    async fn insert(&self, collection: &str, data: Fields) -> Result<String, StoreError> {
        self.check(collection, None)?;
        let id = new_id();
        self.docs.insert(Self::key(collection, &id), data);
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError> {
        self.check(collection, Some(id))?;
        match self.docs.entry(Self::key(collection, id)) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::already_exists(collection, id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(data);
                Ok(())
            }
        }
    }

    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError> {
        self.check(collection, Some(id))?;
        self.docs.insert(Self::key(collection, id), data);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        self.check(collection, Some(id))?;
        let mut doc = self.docs.get_mut(&Self::key(collection, id)).ok_or_else(|| StoreError::not_found(collection, id))?;
        doc.extend(patch);
        Ok(())
    }

    async fn compare_and_set(&self, collection: &str, id: &str, field: &str, expected: &Value, new: Value) -> Result<bool, StoreError> {
        self.check(collection, Some(id))?;
        let mut doc = self.docs.get_mut(&Self::key(collection, id)).ok_or_else(|| StoreError::not_found(collection, id))?;
        if doc.get(field) != Some(expected) { return Ok(false); }
        doc.insert(field.to_string(), new);
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check(collection, Some(id))?;
        self.docs.remove(&Self::key(collection, id));
        Ok(())
    }

    async fn array_add(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<(), StoreError> {
        self.with_array(collection, id, field, |items| if !items.contains(&value) { items.push(value) })
    }

    async fn array_remove(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<(), StoreError> {
        self.with_array(collection, id, field, |items| items.retain(|v| v != &value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value { Value::Object(map) => map, _ => unreachable!() }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, price, rating) in [("a", 5000, 3.0), ("b", 15000, 4.5), ("c", 60000, 4.0)] {
            store.set("products", id, fields(json!({"price": price, "averageRating": rating, "category": "bags"}))).await.unwrap();
        }
        store.set("products", "d", fields(json!({"category": "shoes"}))).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let store = seeded().await;
        let q = Query::new().eq("category", "bags").gte("averageRating", 4).order_by("price", Direction::Desc);
        let ids: Vec<_> = store.query("products", &q).await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, ["c", "b"]);
    }

    #[tokio::test]
    async fn test_order_by_excludes_documents_missing_the_field() {
        let store = seeded().await;
        let q = Query::new().order_by("price", Direction::Asc);
        let ids: Vec<_> = store.query("products", &q).await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let store = MemoryStore::new();
        store.create("reviews", "p1__u1", Fields::new()).await.unwrap();
        let err = store.create("reviews", "p1__u1", Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update("orders", "nope", Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        store.delete("orders", "nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_compare_and_set() {
        let store = MemoryStore::new();
        store.set("products", "p", fields(json!({"sizes": [{"size": "M", "stock": 2}]}))).await.unwrap();
        let stale = json!([{"size": "M", "stock": 5}]);
        assert!(!store.compare_and_set("products", "p", "sizes", &stale, json!([])).await.unwrap());
        let current = json!([{"size": "M", "stock": 2}]);
        let next = json!([{"size": "M", "stock": 1}]);
        assert!(store.compare_and_set("products", "p", "sizes", &current, next.clone()).await.unwrap());
        assert_eq!(store.get("products", "p").await.unwrap().unwrap().field("sizes"), Some(&next));
    }

    #[tokio::test]
    async fn test_array_add_is_a_set_union() {
        let store = MemoryStore::new();
        store.set("users", "u", Fields::new()).await.unwrap();
        store.array_add("users", "u", "wishlist", json!("p1")).await.unwrap();
        store.array_add("users", "u", "wishlist", json!("p1")).await.unwrap();
        store.array_add("users", "u", "wishlist", json!("p2")).await.unwrap();
        store.array_remove("users", "u", "wishlist", json!("p1")).await.unwrap();
        let doc = store.get("users", "u").await.unwrap().unwrap();
        assert_eq!(doc.field("wishlist"), Some(&json!(["p2"])));
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = seeded().await;
        store.inject_fault("products/b");
        assert!(store.get("products", "a").await.is_ok());
        assert!(matches!(store.get("products", "b").await, Err(StoreError::Unavailable(_))));
        store.inject_fault("products");
        assert!(store.query("products", &Query::new()).await.is_err());
        store.clear_fault("products");
        assert!(store.query("products", &Query::new()).await.is_ok());
    }
}
