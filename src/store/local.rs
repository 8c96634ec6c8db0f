use async_trait::async_trait;
use notes_core::db::Database;
use notes_core::models::{Note, NOTES_COLLECTION};

use super::{decode_notes, require_id, DocumentStore, FetchOutcome, StoreError, OWNER_FIELD};

/// In-process store over the SQLite document database.
#[derive(Clone)]
pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn fetch(&self, owner_id: &str) -> Result<FetchOutcome, StoreError> {
        let documents = self
            .db
            .find_documents(NOTES_COLLECTION, OWNER_FIELD, owner_id)?;
        tracing::debug!("Fetched {} note documents for {}", documents.len(), owner_id);
        Ok(decode_notes(documents))
    }

    async fn add(&self, note: &Note) -> Result<String, StoreError> {
        let doc = self
            .db
            .insert_document(NOTES_COLLECTION, &note.to_document())?;
        tracing::debug!("Saved note '{}' as {}", note.title, doc.id);
        Ok(doc.id)
    }

    async fn update(&self, note: &Note) -> Result<(), StoreError> {
        let id = require_id(note)?;
        self.db
            .merge_document(NOTES_COLLECTION, id, &note.to_document())?;
        Ok(())
    }

    async fn delete(&self, note: &Note) -> Result<(), StoreError> {
        let id = require_id(note)?;
        self.db.delete_document(NOTES_COLLECTION, id)?;
        Ok(())
    }
}
