//! Document store routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use curtain_engine::remote::wire::{AddDocumentResponse, Document, DocumentList};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_add, handle_delete, handle_get, handle_list, handle_patch};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections/{collection}/documents",
            get(list_handler).post(add_handler),
        )
        .route(
            "/collections/{collection}/documents/{id}",
            get(get_handler).patch(patch_handler).delete(delete_handler),
        )
}

/// POST /collections/{collection}/documents - Create a document.
async fn add_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<AddDocumentResponse>)> {
    let response = handle_add(&state.pool, &collection, body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /collections/{collection}/documents - List a collection.
async fn list_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
) -> Result<Json<DocumentList>> {
    let response = handle_list(&state.pool, &collection).await?;
    Ok(Json(response))
}

/// GET /collections/{collection}/documents/{id} - Fetch one document.
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Document>> {
    let response = handle_get(&state.pool, &collection, &id).await?;
    Ok(Json(response))
}

/// PATCH /collections/{collection}/documents/{id} - Shallow-merge fields.
async fn patch_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<StatusCode> {
    handle_patch(&state.pool, &collection, &id, patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /collections/{collection}/documents/{id} - Remove a document.
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    handle_delete(&state.pool, &collection, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
