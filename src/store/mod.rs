//! Document store port.
//!
//! The storefront keeps every aggregate as a JSON document in a named
//! collection. Backends only need single-document reads and writes plus
//! equality / lower-bound queries with one sort key; anything richer (price
//! buckets, size availability, text search) is applied by the caller.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;
use uuid::Uuid;

pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";
pub const USERS: &str = "users";
pub const REVIEWS: &str = "reviews";
pub const SETTINGS: &str = "settings";

/// Field map of a stored document, without its id.
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },
    #[error("failed to decode {collection}/{id}: {source}")]
    Decode { collection: String, id: String, #[source] source: serde_json::Error },
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound { collection: collection.to_string(), id: id.to_string() }
    }
    pub fn already_exists(collection: &str, id: &str) -> Self {
        Self::AlreadyExists { collection: collection.to_string(), id: id.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    /// Deserializes the document, exposing its id as the `id` field.
    pub fn decode<T: DeserializeOwned>(self, collection: &str) -> Result<T, StoreError> {
        let Document { id, mut data } = self;
        data.insert("id".to_string(), Value::String(id.clone()));
        serde_json::from_value(Value::Object(data))
            .map_err(|source| StoreError::Decode { collection: collection.to_string(), id, source })
    }

    pub fn field(&self, name: &str) -> Option<&Value> { self.data.get(name) }
}

/// Serializes an aggregate into document fields. The `id` field is dropped; ids live beside the data.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value).map_err(StoreError::Encode)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Encode(<serde_json::Error as serde::ser::Error>::custom(
            format!("expected a JSON object, got {other}"),
        ))),
    }
}

/// Fresh, time-ordered document id.
pub fn new_id() -> String { Uuid::now_v7().simple().to_string() }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op { Eq, Gte }

#[derive(Clone, Debug, PartialEq)]
pub struct Filter { pub field: String, pub op: Op, pub value: Value }

impl Filter {
    /// A document lacking the field never matches.
    pub fn matches(&self, data: &Fields) -> bool {
        let Some(actual) = data.get(&self.field) else { return false };
        match self.op {
            Op::Eq => actual == &self.value || compare_values(actual, &self.value) == Some(Ordering::Equal),
            Op::Gte => matches!(compare_values(actual, &self.value), Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction { Asc, Desc }

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy { pub field: String, pub direction: Direction }

/// Conjunction of filters with at most one sort key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new() -> Self { Self::default() }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_string(), op: Op::Eq, value: value.into() });
        self
    }

    pub fn gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_string(), op: Op::Gte, value: value.into() });
        self
    }

    /// Replaces any previous sort key. Documents lacking the field are excluded from results.
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy { field: field.to_string(), direction });
        self
    }
}

/// Orders numbers numerically and strings lexically; mixed or composite values are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Inserts under a store-assigned id and returns it.
    async fn insert(&self, collection: &str, data: Fields) -> Result<String, StoreError>;

    /// Inserts under a caller-chosen id; fails with `AlreadyExists` if the id is taken.
    async fn create(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError>;

    /// Creates or fully replaces a document.
    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError>;

    /// Merges top-level fields into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError>;

    /// Writes `new` to `field` only if its current value equals `expected`.
    /// Returns whether the write happened.
    async fn compare_and_set(&self, collection: &str, id: &str, field: &str, expected: &Value, new: Value) -> Result<bool, StoreError>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Appends `value` to an array field unless already present.
    async fn array_add(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<(), StoreError>;

    /// Removes every occurrence of `value` from an array field.
    async fn array_remove(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<(), StoreError>;
}

/// Typed single-document read.
pub async fn fetch<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str, id: &str) -> Result<Option<T>, StoreError> {
    store.get(collection, id).await?.map(|doc| doc.decode(collection)).transpose()
}

/// Typed query.
pub async fn fetch_all<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str, query: &Query) -> Result<Vec<T>, StoreError> {
    store.query(collection, query).await?.into_iter().map(|doc| doc.decode(collection)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value { Value::Object(map) => map, _ => unreachable!() }
    }

    #[test]
    fn test_filter_semantics() {
        let data = fields(json!({"category": "bags", "averageRating": 4.5, "price": 15000}));
        assert!(Filter { field: "category".into(), op: Op::Eq, value: json!("bags") }.matches(&data));
        assert!(Filter { field: "averageRating".into(), op: Op::Gte, value: json!(4) }.matches(&data));
        assert!(!Filter { field: "averageRating".into(), op: Op::Gte, value: json!(5) }.matches(&data));
        assert!(Filter { field: "price".into(), op: Op::Eq, value: json!(15000.0) }.matches(&data));
        assert!(!Filter { field: "missing".into(), op: Op::Eq, value: Value::Null }.matches(&data));
    }

    #[test]
    fn test_encode_drops_id_and_decode_restores_it() {
        #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Thing { #[serde(default)] id: String, name: String }
        let encoded = encode(&Thing { id: "ignored".into(), name: "x".into() }).unwrap();
        assert!(!encoded.contains_key("id"));
        let doc = Document { id: "t1".into(), data: encoded };
        assert_eq!(doc.decode::<Thing>("things").unwrap(), Thing { id: "t1".into(), name: "x".into() });
    }

    #[test]
    fn test_encode_rejects_non_objects() {
        assert!(matches!(encode(&5), Err(StoreError::Encode(_))));
    }
}
