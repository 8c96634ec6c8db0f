//! HTTP client for the document store service.

use async_trait::async_trait;
use notes_core::db::Document;
use notes_core::models::{Note, NOTES_COLLECTION};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{decode_notes, require_id, DocumentStore, FetchOutcome, StoreError, OWNER_FIELD};

/// Default URL for a locally running `snotes serve`.
pub const DEFAULT_STORE_URL: &str = "http://localhost:3000/api/v1";

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    id: String,
}

/// Store backed by a remote document store service.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the notes collection, or of one document in it. The id is
    /// percent-encoded as a single path segment.
    fn documents_url(&self, id: Option<&str>) -> Result<Url, StoreError> {
        let invalid = |reason: String| StoreError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["collections", NOTES_COLLECTION, "documents"])
            .extend(id);
        Ok(url)
    }

    /// Build a request against the notes collection with optional auth header.
    fn request(
        &self,
        method: Method,
        id: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, StoreError> {
        let mut req = self.client.request(method, self.documents_url(id)?);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        Ok(req)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Convert non-2xx responses into store errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED => Err(StoreError::Unauthorized),
        _ => Err(StoreError::Server {
            status: status.as_u16(),
            body,
        }),
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn fetch(&self, owner_id: &str) -> Result<FetchOutcome, StoreError> {
        let response = self
            .request(Method::GET, None)?
            .query(&[("field", OWNER_FIELD), ("equals", owner_id)])
            .send()
            .await?;
        let documents: Vec<Document> = self.handle_response(response).await?;
        tracing::debug!("Fetched {} note documents for {}", documents.len(), owner_id);
        Ok(decode_notes(documents))
    }

    async fn add(&self, note: &Note) -> Result<String, StoreError> {
        let response = self
            .request(Method::POST, None)?
            .json(&note.to_document())
            .send()
            .await?;
        let created: CreatedDocument = self.handle_response(response).await?;
        tracing::debug!("Saved note '{}' as {}", note.title, created.id);
        Ok(created.id)
    }

    async fn update(&self, note: &Note) -> Result<(), StoreError> {
        let id = require_id(note)?;
        let response = self
            .request(Method::PATCH, Some(id))?
            .json(&note.to_document())
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn delete(&self, note: &Note) -> Result<(), StoreError> {
        let id = require_id(note)?;
        let response = self
            .request(Method::DELETE, Some(id))?
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_ids_are_encoded_as_one_segment() {
        let store = RemoteStore::new("http://127.0.0.1:3000/api/v1/", None);

        let url = store.documents_url(Some("a/b?c#d")).unwrap();

        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3000/api/v1/collections/notes/documents/a%2Fb%3Fc%23d"
        );
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn collection_url_has_no_trailing_segment() {
        let store = RemoteStore::new("http://localhost:3000/api/v1", None);

        let url = store.documents_url(None).unwrap();

        assert_eq!(url.as_str(), "http://localhost:3000/api/v1/collections/notes/documents");
    }

    #[test]
    fn unusable_base_url_is_an_error() {
        let store = RemoteStore::new("not a url", None);
        assert!(matches!(
            store.documents_url(None),
            Err(StoreError::InvalidUrl { .. })
        ));
    }
}
