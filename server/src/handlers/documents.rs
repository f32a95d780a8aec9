//! Document handlers - the remote store the engine's HTTP client talks to.

use curtain_engine::remote::apply_patch;
use curtain_engine::remote::wire::{AddDocumentResponse, Document, DocumentList};
use curtain_engine::validate_collection_key;
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, Result};

/// Validate a request body as a document payload.
///
/// The body must be a JSON object. `id` and `_needsSync` are dropped: the
/// server assigns ids and sync flags never leave the client.
pub fn sanitize_payload(body: Value) -> Result<Value> {
    let mut fields = Map::new();
    apply_patch(&mut fields, body).map_err(|_| {
        AppError::BadRequest("document body must be a JSON object".to_string())
    })?;
    Ok(Value::Object(fields))
}

/// Parse a document id. Anything that is not a UUID cannot exist here.
pub fn parse_document_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound(format!("document {}", id)))
}

/// Create a document.
pub async fn handle_add(
    pool: &PgPool,
    collection: &str,
    body: Value,
) -> Result<AddDocumentResponse> {
    validate_collection_key(collection)?;
    let data = sanitize_payload(body)?;

    let id = db::insert_document(pool, collection, &data).await?;
    tracing::debug!(collection = %collection, record_id = %id, "Document created");

    Ok(AddDocumentResponse { id: id.to_string() })
}

/// List a collection, newest first.
pub async fn handle_list(pool: &PgPool, collection: &str) -> Result<DocumentList> {
    validate_collection_key(collection)?;

    let documents: Vec<Document> = db::list_documents(pool, collection)
        .await?
        .into_iter()
        .map(|d| d.into_document())
        .collect();
    tracing::debug!(collection = %collection, count = documents.len(), "Listed documents");

    Ok(DocumentList { documents })
}

/// Fetch one document.
pub async fn handle_get(pool: &PgPool, collection: &str, id: &str) -> Result<Document> {
    validate_collection_key(collection)?;
    let uuid = parse_document_id(id)?;

    db::get_document(pool, collection, uuid)
        .await?
        .map(|d| d.into_document())
        .ok_or_else(|| AppError::NotFound(format!("document {}", id)))
}

/// Shallow-merge a patch into a document.
pub async fn handle_patch(pool: &PgPool, collection: &str, id: &str, patch: Value) -> Result<()> {
    validate_collection_key(collection)?;
    let uuid = parse_document_id(id)?;
    let patch = sanitize_payload(patch)?;

    if !db::patch_document(pool, collection, uuid, &patch).await? {
        return Err(AppError::NotFound(format!("document {}", id)));
    }
    tracing::debug!(collection = %collection, record_id = %id, "Document patched");
    Ok(())
}

/// Remove a document.
pub async fn handle_delete(pool: &PgPool, collection: &str, id: &str) -> Result<()> {
    validate_collection_key(collection)?;
    let uuid = parse_document_id(id)?;

    if !db::delete_document(pool, collection, uuid).await? {
        return Err(AppError::NotFound(format!("document {}", id)));
    }
    tracing::debug!(collection = %collection, record_id = %id, "Document deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_strips_reserved_fields() {
        let payload = sanitize_payload(json!({
            "id": "client-chosen",
            "_needsSync": true,
            "title": "Auditions"
        }))
        .unwrap();
        assert_eq!(payload, json!({"title": "Auditions"}));
    }

    #[test]
    fn sanitize_rejects_non_objects() {
        for body in [json!([1, 2]), json!("text"), json!(null)] {
            assert!(matches!(sanitize_payload(body), Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn document_ids_are_uuids() {
        let id = Uuid::new_v4();
        assert_eq!(parse_document_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_document_id("temp_123"),
            Err(AppError::NotFound(_))
        ));
    }
}
