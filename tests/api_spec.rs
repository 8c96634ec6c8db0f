use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use smart_notes::api::{create_router, create_router_with_config, SecurityConfig};
use smart_notes::db::{Database, Document};

const DOCUMENTS: &str = "/api/v1/collections/notes/documents";

fn setup_db() -> Database {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    db
}

fn setup() -> TestServer {
    TestServer::new(create_router(setup_db())).expect("Failed to create test server")
}

async fn create_document(server: &TestServer, data: Value) -> String {
    let response = server.post(DOCUMENTS).json(&data).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"]
        .as_str()
        .expect("Response should carry an id")
        .to_string()
}

mod health {
    use super::*;

    #[tokio::test]
    async fn reports_ok() {
        let server = setup();

        let response = server.get("/api/v1/health").await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
    }
}

mod documents {
    use super::*;

    #[tokio::test]
    async fn created_document_can_be_fetched_by_id() {
        let server = setup();
        let id = create_document(&server, json!({ "title": "Groceries", "userId": "alice" })).await;

        let response = server.get(&format!("{}/{}", DOCUMENTS, id)).await;

        response.assert_status_ok();
        let doc: Document = response.json();
        assert_eq!(doc.id, id);
        assert_eq!(doc.data["title"], "Groceries");
    }

    #[tokio::test]
    async fn non_object_body_is_rejected() {
        let server = setup();

        let response = server.post(DOCUMENTS).json(&json!(["title"])).await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let server = setup();

        server
            .get(&format!("{}/missing", DOCUMENTS))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn filters_by_field_value() {
        let server = setup();
        create_document(&server, json!({ "title": "a", "userId": "alice" })).await;
        create_document(&server, json!({ "title": "b", "userId": "bob" })).await;
        create_document(&server, json!({ "title": "c", "userId": "alice" })).await;

        let response = server
            .get(&format!("{}?field=userId&equals=alice", DOCUMENTS))
            .await;

        response.assert_status_ok();
        let docs: Vec<Document> = response.json();
        let titles: Vec<&str> = docs.iter().filter_map(|d| d.data["title"].as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn lists_whole_collection_without_filter() {
        let server = setup();
        create_document(&server, json!({ "title": "a" })).await;
        create_document(&server, json!({ "title": "b" })).await;

        let docs: Vec<Document> = server.get(DOCUMENTS).await.json();

        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn field_without_value_is_a_bad_request() {
        let server = setup();

        server
            .get(&format!("{}?field=userId", DOCUMENTS))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn patch_merges_into_existing_fields() {
        let server = setup();
        let id = create_document(&server, json!({ "title": "Old", "content": "kept" })).await;

        server
            .patch(&format!("{}/{}", DOCUMENTS, id))
            .json(&json!({ "title": "New" }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let doc: Document = server.get(&format!("{}/{}", DOCUMENTS, id)).await.json();
        assert_eq!(doc.data, json!({ "title": "New", "content": "kept" }));
    }

    #[tokio::test]
    async fn patch_creates_missing_document() {
        let server = setup();

        server
            .patch(&format!("{}/chosen-id", DOCUMENTS))
            .json(&json!({ "title": "Fresh" }))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let doc: Document = server.get(&format!("{}/chosen-id", DOCUMENTS)).await.json();
        assert_eq!(doc.data["title"], "Fresh");
    }

    #[tokio::test]
    async fn delete_removes_document_and_is_idempotent() {
        let server = setup();
        let id = create_document(&server, json!({ "title": "Doomed" })).await;

        server
            .delete(&format!("{}/{}", DOCUMENTS, id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .delete(&format!("{}/{}", DOCUMENTS, id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        server
            .get(&format!("{}/{}", DOCUMENTS, id))
            .await
            .assert_status_not_found();
    }
}

mod authentication {
    use super::*;

    fn secured() -> TestServer {
        let app = create_router_with_config(setup_db(), SecurityConfig::with_api_key("secret"));
        TestServer::new(app).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn rejects_missing_key() {
        let server = secured();

        server
            .get(DOCUMENTS)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_wrong_key() {
        let server = secured();

        server
            .get(DOCUMENTS)
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_non_bearer_scheme() {
        let server = secured();

        server
            .get(DOCUMENTS)
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic secret"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_configured_key() {
        let server = secured();

        server
            .post(DOCUMENTS)
            .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"))
            .json(&json!({ "title": "Allowed" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn health_stays_open() {
        let server = secured();

        server.get("/api/v1/health").await.assert_status_ok();
    }
}
