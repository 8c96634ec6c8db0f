use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use notes_core::db::{Database, Document};
use serde::Deserialize;
use serde_json::Value;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Validation failures raised by the database (non-object bodies, unusable
/// field names) are safe to expose and come back as BAD_REQUEST.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("must be a JSON object") || msg.contains("Invalid field name") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Documents
// ============================================================

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub field: Option<String>,
    pub equals: Option<String>,
}

pub async fn list_documents(
    State(db): State<Database>,
    Path(collection): Path<String>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<Document>>, (StatusCode, String)> {
    let documents = match (query.field, query.equals) {
        (Some(field), Some(value)) => db.find_documents(&collection, &field, &value),
        (Some(_), None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "`equals` is required when filtering by `field`".to_string(),
            ))
        }
        (None, _) => db.list_documents(&collection),
    };

    documents.map(Json).map_err(internal_error)
}

pub async fn create_document(
    State(db): State<Database>,
    Path(collection): Path<String>,
    Json(data): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    db.insert_document(&collection, &data)
        .map(|doc| {
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "id": doc.id })),
            )
        })
        .map_err(internal_error)
}

pub async fn get_document(
    State(db): State<Database>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Document>, (StatusCode, String)> {
    db.get_document(&collection, &id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Document not found".to_string()))
}

pub async fn merge_document(
    State(db): State<Database>,
    Path((collection, id)): Path<(String, String)>,
    Json(data): Json<Value>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.merge_document(&collection, &id, &data)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(internal_error)
}

pub async fn delete_document(
    State(db): State<Database>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.delete_document(&collection, &id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(internal_error)
}
