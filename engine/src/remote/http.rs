//! HTTP client for the Curtain document store server.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::wire::{AddDocumentResponse, Document, DocumentList, ErrorBody};
use super::RemoteStore;
use crate::{error::RemoteResult, RecordId, RemoteError, SyncRecord};

/// Remote store reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteStore {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a preconfigured `reqwest` client (proxies, TLS, timeouts).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn documents_url(&self, collection: &str) -> String {
        format!("{}/collections/{}/documents", self.base_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.documents_url(collection), id)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(message));
        }
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn add(&self, collection: &str, data: Value) -> RemoteResult<RecordId> {
        let response = self
            .send(self.client.post(self.documents_url(collection)).json(&data))
            .await?;
        let body: AddDocumentResponse = Self::decode(response).await?;
        Ok(body.id)
    }

    async fn list(&self, collection: &str) -> RemoteResult<Vec<SyncRecord>> {
        let response = self
            .send(self.client.get(self.documents_url(collection)))
            .await?;
        let body: DocumentList = Self::decode(response).await?;
        Ok(body.documents.into_iter().map(SyncRecord::from).collect())
    }

    async fn get(&self, collection: &str, id: &str) -> RemoteResult<SyncRecord> {
        let response = self
            .send(self.client.get(self.document_url(collection, id)))
            .await?;
        let doc: Document = Self::decode(response).await?;
        Ok(doc.into())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> RemoteResult<()> {
        self.send(self.client.patch(self.document_url(collection, id)).json(&patch))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()> {
        self.send(self.client.delete(self.document_url(collection, id)))
            .await?;
        Ok(())
    }

    async fn ping(&self) -> RemoteResult<()> {
        self.send(self.client.get(format!("{}/health", self.base_url)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let store = HttpRemoteStore::new("http://localhost:3000/");
        assert_eq!(store.base_url(), "http://localhost:3000");
        assert_eq!(
            store.documents_url("activities"),
            "http://localhost:3000/collections/activities/documents"
        );
        assert_eq!(
            store.document_url("activity-reports", "abc"),
            "http://localhost:3000/collections/activity-reports/documents/abc"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_reported() {
        // Port 9 (discard) on localhost is not expected to serve HTTP.
        let store = HttpRemoteStore::new("http://127.0.0.1:9");
        assert!(matches!(store.ping().await, Err(RemoteError::Unreachable(_))));
    }
}
