//! Document store adapters.
//!
//! A [`DocumentStore`] persists [`Note`]s in the `notes` collection. Fetches
//! are filtered by owner at the store and sorted by modification time on the
//! client, so the store never needs a composite index. Writes are
//! last-write-wins: there is no transaction or version check.

mod local;
mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;

use async_trait::async_trait;
use notes_core::db::Document;
use notes_core::models::Note;
use thiserror::Error;

/// Field on note documents that holds the owner identifier.
pub const OWNER_FIELD: &str = "userId";

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Note ID is missing")]
    MissingId,

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid store URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unauthorized: store API key required or invalid")]
    Unauthorized,

    #[error("Store returned {status}: {body}")]
    Server { status: u16, body: String },
}

/// Result of a fetch: the decodable notes plus how many documents were
/// dropped because they could not be decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub notes: Vec<Note>,
    pub skipped: usize,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Notes owned by `owner_id`, most recently modified first.
    async fn fetch(&self, owner_id: &str) -> Result<FetchOutcome, StoreError>;

    /// Persist a new note and return the identifier the store assigned.
    async fn add(&self, note: &Note) -> Result<String, StoreError>;

    /// Merge-write the note under its id.
    async fn update(&self, note: &Note) -> Result<(), StoreError>;

    /// Remove the note with the given id.
    async fn delete(&self, note: &Note) -> Result<(), StoreError>;
}

/// The note's id, or [`StoreError::MissingId`] before it was ever saved.
pub(crate) fn require_id(note: &Note) -> Result<&str, StoreError> {
    note.id().ok_or(StoreError::MissingId)
}

/// Decode fetched documents, skipping the ones that do not decode, and sort
/// the rest by modification time, newest first.
pub(crate) fn decode_notes(documents: Vec<Document>) -> FetchOutcome {
    let mut skipped = 0;
    let mut notes = Vec::with_capacity(documents.len());

    for doc in documents {
        match Note::from_document(&doc.id, doc.data) {
            Ok(note) => notes.push(note),
            Err(e) => {
                tracing::warn!("Skipping undecodable note document {}: {}", doc.id, e);
                skipped += 1;
            }
        }
    }

    notes.sort_by(|a, b| b.modified_at().cmp(&a.modified_at()));

    FetchOutcome { notes, skipped }
}
