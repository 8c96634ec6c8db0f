//! Note repository: the coordinating layer between the session's user and
//! the document store.
//!
//! Every mutation is followed by a full reload of the owner's notes instead
//! of patching the in-memory list. Operations take `&self` and only lock
//! the repository state for short synchronous sections, so concurrent calls
//! race each other at the store, where the last write wins.

use std::sync::{Arc, Mutex};

use notes_core::models::Note;
use thiserror::Error;

use crate::busy::Busy;
use crate::store::{DocumentStore, StoreError};

/// Whether a list operation is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
}

/// Repository failures, worded for the user.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Failed to load notes: {0}")]
    Load(#[source] StoreError),

    #[error("Failed to add note: {0}")]
    Add(#[source] StoreError),

    #[error("Failed to update note: {0}")]
    Update(#[source] StoreError),

    #[error("Failed to delete note: {0}")]
    Delete(#[source] StoreError),
}

impl RepositoryError {
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::Load(e) | Self::Add(e) | Self::Update(e) | Self::Delete(e) => e,
        }
    }
}

#[derive(Debug, Default)]
struct RepositoryState {
    notes: Vec<Note>,
    skipped: usize,
    loads_in_flight: usize,
    error_message: Option<String>,
    search_text: String,
}

pub struct NoteRepository {
    store: Arc<dyn DocumentStore>,
    state: Mutex<RepositoryState>,
}

impl NoteRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            state: Mutex::new(RepositoryState::default()),
        }
    }

    // ============================================================
    // List operations
    // ============================================================

    /// Replace the loaded list with `owner_id`'s notes. Returns how many
    /// notes were loaded.
    pub async fn load(&self, owner_id: &str) -> Result<usize, RepositoryError> {
        let busy = Busy::enter(&self.state, |state| &mut state.loads_in_flight);
        let outcome = self.store.fetch(owner_id).await;
        drop(busy);

        let result = self.with_state(|state| match outcome {
            Ok(fetched) => {
                let count = fetched.notes.len();
                state.notes = fetched.notes;
                state.skipped = fetched.skipped;
                Ok((count, fetched.skipped))
            }
            Err(e) => Err(RepositoryError::Load(e)),
        });

        match result {
            Ok((count, skipped)) => {
                if skipped > 0 {
                    tracing::warn!("Skipped {} undecodable notes for {}", skipped, owner_id);
                }
                tracing::debug!("Loaded {} notes for {}", count, owner_id);
                Ok(count)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Create a note for `owner_id`, then reload. Returns the saved note.
    pub async fn add(
        &self,
        title: &str,
        content: &str,
        owner_id: &str,
    ) -> Result<Note, RepositoryError> {
        let note = Note::new(title, content, owner_id);

        let id = match self.store.add(&note).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(RepositoryError::Add(e))),
        };
        tracing::info!("Added note {}", id);

        self.load(owner_id).await?;
        Ok(note.with_id(id))
    }

    /// Write the note's title and content with a fresh modification time,
    /// then reload its owner's notes. Unsaved notes never reach the store.
    pub async fn update(&self, mut note: Note) -> Result<Note, RepositoryError> {
        if note.id().is_none() {
            return Err(self.fail(RepositoryError::Update(StoreError::MissingId)));
        }
        note.touch();

        if let Err(e) = self.store.update(&note).await {
            return Err(self.fail(RepositoryError::Update(e)));
        }

        self.load(note.owner_id()).await?;
        Ok(note)
    }

    /// Remove the note, then reload its owner's notes.
    pub async fn delete(&self, note: &Note) -> Result<(), RepositoryError> {
        if note.id().is_none() {
            return Err(self.fail(RepositoryError::Delete(StoreError::MissingId)));
        }
        if let Err(e) = self.store.delete(note).await {
            return Err(self.fail(RepositoryError::Delete(e)));
        }
        tracing::info!("Deleted note {}", note.id().unwrap_or_default());

        self.load(note.owner_id()).await?;
        Ok(())
    }

    // ============================================================
    // Read-side state
    // ============================================================

    pub fn phase(&self) -> Phase {
        self.with_state(|state| {
            if state.loads_in_flight > 0 {
                Phase::Loading
            } else {
                Phase::Idle
            }
        })
    }

    /// Everything loaded by the last successful fetch.
    pub fn notes(&self) -> Vec<Note> {
        self.with_state(|state| state.notes.clone())
    }

    /// Loaded notes matching the current search text, computed on read.
    pub fn filtered(&self) -> Vec<Note> {
        self.with_state(|state| {
            state
                .notes
                .iter()
                .filter(|note| note.matches(&state.search_text))
                .cloned()
                .collect()
        })
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.with_state(|state| state.search_text = text);
    }

    pub fn search_text(&self) -> String {
        self.with_state(|state| state.search_text.clone())
    }

    /// Loaded note with the given id.
    pub fn find(&self, id: &str) -> Option<Note> {
        self.with_state(|state| state.notes.iter().find(|n| n.id() == Some(id)).cloned())
    }

    /// Documents the last fetch could not decode.
    pub fn skipped(&self) -> usize {
        self.with_state(|state| state.skipped)
    }

    /// Message describing the most recent failure.
    pub fn error_message(&self) -> Option<String> {
        self.with_state(|state| state.error_message.clone())
    }

    pub fn clear_error(&self) {
        self.with_state(|state| state.error_message = None);
    }

    fn fail(&self, error: RepositoryError) -> RepositoryError {
        tracing::warn!("{}", error);
        let message = error.to_string();
        self.with_state(|state| state.error_message = Some(message));
        error
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RepositoryState) -> T) -> T {
        let mut state = self.state.lock().expect("repository state poisoned");
        f(&mut state)
    }
}
