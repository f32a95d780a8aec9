//! Database operations for the documents table.

use chrono::{DateTime, Utc};
use curtain_engine::remote::wire::Document;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// A stored document row from the database.
#[derive(Debug)]
pub struct StoredDocument {
    pub id: Uuid,
    #[allow(dead_code)]
    pub collection: String,
    pub data: Value,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
    #[allow(dead_code)]
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            id: row.try_get("id")?,
            collection: row.try_get("collection")?,
            data: row.try_get("data")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredDocument {
    /// Convert to the wire representation, id merged into the payload.
    pub fn into_document(self) -> Document {
        let data = match self.data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Document {
            id: self.id.to_string(),
            data,
        }
    }
}

/// Insert a document and return its new id.
pub async fn insert_document(
    pool: &PgPool,
    collection: &str,
    data: &Value,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO documents (id, collection, data)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(id)
    .bind(collection)
    .bind(data)
    .execute(pool)
    .await?;

    Ok(id)
}

/// All documents in a collection, newest first.
pub async fn list_documents(
    pool: &PgPool,
    collection: &str,
) -> Result<Vec<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT id, collection, data, created_at, updated_at
        FROM documents
        WHERE collection = $1
        ORDER BY created_at DESC, id
        "#,
    )
    .bind(collection)
    .fetch_all(pool)
    .await
}

/// Get a document by collection and id.
pub async fn get_document(
    pool: &PgPool,
    collection: &str,
    id: Uuid,
) -> Result<Option<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT id, collection, data, created_at, updated_at
        FROM documents
        WHERE collection = $1 AND id = $2
        "#,
    )
    .bind(collection)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Shallow-merge `patch` into a document. Returns false if it does not exist.
pub async fn patch_document(
    pool: &PgPool,
    collection: &str,
    id: Uuid,
    patch: &Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET data = data || $3, updated_at = now()
        WHERE collection = $1 AND id = $2
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(patch)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a document. Returns false if it did not exist.
pub async fn delete_document(pool: &PgPool, collection: &str, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM documents
        WHERE collection = $1 AND id = $2
        "#,
    )
    .bind(collection)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
