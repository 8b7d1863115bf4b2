use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;

use super::{new_id, Direction, Document, DocumentStore, Fields, Op, Query, StoreError};

/// Document store over a single `documents` table with a JSONB payload.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Builds the `SELECT` for a query. Field names and values are bound, never interpolated.
fn select_sql(query: &Query) -> String {
    let mut sql = String::from("SELECT id, data FROM documents WHERE collection = $1");
    let mut n = 1;
    for filter in &query.filters {
        let op = match filter.op { Op::Eq => "=", Op::Gte => ">=" };
        sql.push_str(&format!(" AND data -> ${} {op} ${}", n + 1, n + 2));
        n += 2;
    }
    match &query.order_by {
        Some(order) => {
            let dir = match order.direction { Direction::Asc => "ASC", Direction::Desc => "DESC" };
            sql.push_str(&format!(" AND data ? ${} ORDER BY data -> ${} {dir}, id", n + 1, n + 1));
        }
        None => sql.push_str(" ORDER BY id"),
    }
    sql
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, (String, Json<Fields>)>("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(id, Json(data))| Document { id, data }))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let sql = select_sql(query);
        let mut q = sqlx::query_as::<_, (String, Json<Fields>)>(&sql).bind(collection);
        for filter in &query.filters {
            q = q.bind(filter.field.as_str()).bind(Json(filter.value.clone()));
        }
        if let Some(order) = &query.order_by {
            q = q.bind(order.field.as_str());
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id, Json(data))| Document { id, data }).collect())
    }

    async fn insert(&self, collection: &str, data: Fields) -> Result<String, StoreError> {
        let id = new_id();
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection).bind(&id).bind(Json(data)).execute(&self.pool).await?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError> {
        let done = sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) ON CONFLICT (collection, id) DO NOTHING")
            .bind(collection).bind(id).bind(Json(data)).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::already_exists(collection, id)); }
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data")
            .bind(collection).bind(id).bind(Json(data)).execute(&self.pool).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let done = sqlx::query("UPDATE documents SET data = data || $3 WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).bind(Json(patch)).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::not_found(collection, id)); }
        Ok(())
    }

    async fn compare_and_set(&self, collection: &str, id: &str, field: &str, expected: &Value, new: Value) -> Result<bool, StoreError> {
        let done = sqlx::query(
            "UPDATE documents SET data = jsonb_set(data, ARRAY[$3], $5) \
             WHERE collection = $1 AND id = $2 AND data -> $3 = $4",
        )
        .bind(collection).bind(id).bind(field).bind(Json(expected)).bind(Json(new))
        .execute(&self.pool).await?;
        if done.rows_affected() == 1 { return Ok(true); }
        match self.get(collection, id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn array_add(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE documents SET data = jsonb_set(data, ARRAY[$3], \
               CASE WHEN COALESCE(data -> $3, '[]'::jsonb) @> jsonb_build_array($4::jsonb) \
                    THEN COALESCE(data -> $3, '[]'::jsonb) \
                    ELSE COALESCE(data -> $3, '[]'::jsonb) || jsonb_build_array($4::jsonb) END) \
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection).bind(id).bind(field).bind(Json(value))
        .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::not_found(collection, id)); }
        Ok(())
    }

    async fn array_remove(&self, collection: &str, id: &str, field: &str, value: Value) -> Result<(), StoreError> {
        let done = sqlx::query(
            "UPDATE documents SET data = jsonb_set(data, ARRAY[$3], \
               (SELECT COALESCE(jsonb_agg(e), '[]'::jsonb) \
                  FROM jsonb_array_elements(COALESCE(data -> $3, '[]'::jsonb)) AS e \
                 WHERE e <> $4::jsonb)) \
             WHERE collection = $1 AND id = $2",
        )
        .bind(collection).bind(id).bind(field).bind(Json(value))
        .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(StoreError::not_found(collection, id)); }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_sql_binds_every_field() {
        let q = Query::new().eq("category", "bags").gte("averageRating", 4).order_by("price", Direction::Desc);
        assert_eq!(
            select_sql(&q),
            "SELECT id, data FROM documents WHERE collection = $1 AND data -> $2 = $3 \
             AND data -> $4 >= $5 AND data ? $6 ORDER BY data -> $6 DESC, id"
        );
        assert_eq!(select_sql(&Query::new()), "SELECT id, data FROM documents WHERE collection = $1 ORDER BY id");
    }
}
