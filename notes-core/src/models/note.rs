use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the document collection holding notes.
pub const NOTES_COLLECTION: &str = "notes";

/// A user-authored note.
///
/// The identifier is assigned by the document store on first save, so a
/// freshly created note has no id. The owner and creation time are fixed at
/// construction; only `title` and `content` are freely editable, and
/// [`Note::touch`] is the only way to move `modified_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    id: Option<String>,
    pub title: String,
    pub content: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    owner_id: String,
}

/// Stored field layout of a note document. The id is the document key and is
/// never part of the body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteFields {
    title: String,
    content: String,
    date_created: DateTime<Utc>,
    date_modified: DateTime<Utc>,
    user_id: String,
}

impl Note {
    /// Create an unsaved note stamped with a fresh, equal timestamp pair.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            created_at: now,
            modified_at: now,
            owner_id: owner_id.into(),
        }
    }

    /// Decode a stored document. Fails if any field is missing or mistyped,
    /// or if the document was modified before it was created.
    pub fn from_document(id: impl Into<String>, data: Value) -> Result<Self, serde_json::Error> {
        let fields: NoteFields = serde_json::from_value(data)?;
        if fields.date_modified < fields.date_created {
            return Err(serde::de::Error::custom(
                "dateModified is earlier than dateCreated",
            ));
        }
        Ok(Self {
            id: Some(id.into()),
            title: fields.title,
            content: fields.content,
            created_at: fields.date_created,
            modified_at: fields.date_modified,
            owner_id: fields.user_id,
        })
    }

    /// Encode the note body for the document store.
    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "title": self.title,
            "content": self.content,
            "dateCreated": self.created_at,
            "dateModified": self.modified_at,
            "userId": self.owner_id,
        })
    }

    /// Attach the identifier the store assigned.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Record an edit. The new modification time is always strictly after
    /// the creation time, even when the clock has not advanced.
    pub fn touch(&mut self) {
        let floor = self.created_at + Duration::microseconds(1);
        self.modified_at = Utc::now().max(floor);
    }

    /// Case-insensitive substring match against title or content.
    /// An empty query matches every note.
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.content.to_lowercase().contains(&needle)
    }
}
