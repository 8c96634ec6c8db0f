mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A schema-less record in a collection: an id plus a JSON object body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// SQLite-backed document database.
///
/// Every record lives in a named collection and carries an arbitrary JSON
/// object. The database imposes no schema on the bodies; decoding them into
/// domain types is the caller's concern.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "smart-notes")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("smart-notes.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Document operations
    // ============================================================

    /// Insert a new document and return it with its generated id.
    pub fn insert_document(&self, collection: &str, data: &Value) -> Result<Document> {
        ensure_object(data)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4().simple().to_string();
        let now = timestamp();

        conn.execute(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?, ?, json(?), ?, ?)",
            (collection, &id, data.to_string(), &now, &now),
        )?;

        Ok(Document {
            id,
            data: data.clone(),
        })
    }

    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let raw = conn
            .query_row(
                "SELECT id, data FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        raw.map(parse_document).transpose()
    }

    /// All documents of a collection, oldest first.
    pub fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, data FROM documents WHERE collection = ? ORDER BY created_at, rowid",
        )?;

        let rows = stmt
            .query_map([collection], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;

        rows.into_iter().map(parse_document).collect()
    }

    /// Documents whose top-level `field` holds exactly the string `value`,
    /// oldest first.
    pub fn find_documents(&self, collection: &str, field: &str, value: &str) -> Result<Vec<Document>> {
        let path = field_path(field)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, data FROM documents
             WHERE collection = ? AND json_extract(data, ?) = ?
             ORDER BY created_at, rowid",
        )?;

        let rows = stmt
            .query_map((collection, &path, value), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<(String, String)>, _>>()?;

        rows.into_iter().map(parse_document).collect()
    }

    /// Merge `data` into the document with the given id, creating it when it
    /// does not exist. Keys present in `data` overwrite stored keys; other
    /// stored keys are kept.
    pub fn merge_document(&self, collection: &str, id: &str, data: &Value) -> Result<()> {
        ensure_object(data)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = timestamp();

        conn.execute(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?1, ?2, json(?3), ?4, ?4)
             ON CONFLICT (collection, id) DO UPDATE
             SET data = json_patch(documents.data, excluded.data),
                 updated_at = excluded.updated_at",
            (collection, id, data.to_string(), &now),
        )?;

        Ok(())
    }

    /// Remove a document. Returns whether anything was deleted.
    pub fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            (collection, id),
        )?;
        Ok(rows > 0)
    }

    pub fn count_documents(&self, collection: &str) -> Result<usize> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?",
            [collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Fixed-width UTC timestamp, so text ordering matches time ordering.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ensure_object(data: &Value) -> Result<()> {
    if !data.is_object() {
        anyhow::bail!("Document data must be a JSON object");
    }
    Ok(())
}

/// JSON path for a top-level field, quoted so dots and spaces stay literal.
fn field_path(field: &str) -> Result<String> {
    if field.is_empty() || field.contains('"') {
        anyhow::bail!("Invalid field name: {:?}", field);
    }
    Ok(format!("$.\"{}\"", field))
}

fn parse_document((id, data): (String, String)) -> Result<Document> {
    let data = serde_json::from_str(&data)
        .with_context(|| format!("Stored document {} is not valid JSON", id))?;
    Ok(Document { id, data })
}
