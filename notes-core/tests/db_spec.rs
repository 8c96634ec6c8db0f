use notes_core::db::Database;
use notes_core::models::*;
use serde_json::json;
use speculate2::speculate;

fn insert_note(db: &Database, title: &str, owner: &str) -> String {
    let note = Note::new(title, "content", owner);
    db.insert_document(NOTES_COLLECTION, &note.to_document())
        .expect("Failed to insert document")
        .id
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "insert_document" {
        it "assigns a fresh id to every document" {
            let first = db.insert_document("notes", &json!({ "title": "a" })).expect("Insert failed");
            let second = db.insert_document("notes", &json!({ "title": "a" })).expect("Insert failed");

            assert!(!first.id.is_empty());
            assert_ne!(first.id, second.id);
            assert_eq!(db.count_documents("notes").expect("Count failed"), 2);
        }

        it "rejects bodies that are not JSON objects" {
            let result = db.insert_document("notes", &json!(["not", "an", "object"]));
            assert!(result.is_err());
            assert_eq!(db.count_documents("notes").expect("Count failed"), 0);
        }

        it "keeps collections separate" {
            db.insert_document("notes", &json!({ "title": "a" })).expect("Insert failed");
            db.insert_document("drafts", &json!({ "title": "b" })).expect("Insert failed");

            assert_eq!(db.count_documents("notes").expect("Count failed"), 1);
            assert_eq!(db.count_documents("drafts").expect("Count failed"), 1);
        }
    }

    describe "get_document" {
        it "returns None for an unknown id" {
            let found = db.get_document("notes", "missing").expect("Query failed");
            assert!(found.is_none());
        }

        it "returns the stored body" {
            let created = db.insert_document("notes", &json!({ "title": "Stored" })).expect("Insert failed");
            let found = db.get_document("notes", &created.id).expect("Query failed").expect("Missing document");

            assert_eq!(found.id, created.id);
            assert_eq!(found.data["title"], "Stored");
        }
    }

    describe "find_documents" {
        it "returns only documents whose field matches" {
            insert_note(&db, "Mine", "user-a");
            insert_note(&db, "Theirs", "user-b");
            insert_note(&db, "Also mine", "user-a");

            let docs = db.find_documents(NOTES_COLLECTION, "userId", "user-a").expect("Query failed");

            assert_eq!(docs.len(), 2);
            assert!(docs.iter().all(|d| d.data["userId"] == "user-a"));
        }

        it "returns an empty list when nothing matches" {
            insert_note(&db, "Mine", "user-a");
            let docs = db.find_documents(NOTES_COLLECTION, "userId", "nobody").expect("Query failed");
            assert!(docs.is_empty());
        }

        it "rejects field names that would break the path" {
            let result = db.find_documents(NOTES_COLLECTION, "user\"Id", "x");
            assert!(result.is_err());
        }
    }

    describe "merge_document" {
        it "overwrites given keys and keeps the rest" {
            let created = db.insert_document("notes", &json!({ "title": "Old", "content": "Keep" })).expect("Insert failed");

            db.merge_document("notes", &created.id, &json!({ "title": "New" })).expect("Merge failed");

            let found = db.get_document("notes", &created.id).expect("Query failed").expect("Missing document");
            assert_eq!(found.data["title"], "New");
            assert_eq!(found.data["content"], "Keep");
        }

        it "creates the document when the id is unknown" {
            db.merge_document("notes", "fresh-id", &json!({ "title": "Created" })).expect("Merge failed");

            let found = db.get_document("notes", "fresh-id").expect("Query failed").expect("Missing document");
            assert_eq!(found.data["title"], "Created");
        }
    }

    describe "delete_document" {
        it "removes the document" {
            let id = insert_note(&db, "Gone", "user-a");

            assert!(db.delete_document(NOTES_COLLECTION, &id).expect("Delete failed"));
            assert!(db.get_document(NOTES_COLLECTION, &id).expect("Query failed").is_none());
        }

        it "reports false for an unknown id" {
            assert!(!db.delete_document(NOTES_COLLECTION, "missing").expect("Delete failed"));
        }
    }

    describe "list_documents" {
        it "returns documents in insertion order" {
            insert_note(&db, "First", "u");
            insert_note(&db, "Second", "u");

            let docs = db.list_documents(NOTES_COLLECTION).expect("Query failed");
            let titles: Vec<_> = docs.iter().map(|d| d.data["title"].as_str().unwrap_or_default().to_string()).collect();
            assert_eq!(titles, vec!["First", "Second"]);
        }
    }
}
