use std::collections::HashMap;
use std::path::PathBuf;

use smart_notes::ai::DEFAULT_ENDPOINT;
use smart_notes::config::AppConfig;
use speculate2::speculate;

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.json");
    std::fs::write(&path, content).expect("Failed to write config");
    path
}

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
    }

    describe "config file" {
        it "fills every section it names" {
            let path = write_config(&dir, r#"{
                "store": { "url": "http://notes.example/api/v1", "api_key": null },
                "ai": { "api_key": "file-key" },
                "auth": { "google_client_id": null },
                "server": { "cors_origins": ["https://notes.example"] }
            }"#);

            let config = AppConfig::from_file(&path).expect("Failed to load config");

            assert_eq!(config.store.url.as_deref(), Some("http://notes.example/api/v1"));
            assert_eq!(config.ai.endpoint, DEFAULT_ENDPOINT);
            assert_eq!(config.ai.api_key.as_deref(), Some("file-key"));
            assert_eq!(config.server.cors_origins, Some(vec!["https://notes.example".to_string()]));
        }

        it "reports the path of an unreadable file" {
            let path = write_config(&dir, "not json");

            let err = AppConfig::from_file(&path).expect_err("Malformed config should fail");

            assert!(err.to_string().contains("config.json"));
        }
    }

    describe "environment overrides" {
        it "win over file values" {
            let path = write_config(&dir, r#"{ "ai": { "endpoint": "http://file/generate" } }"#);
            let mut config = AppConfig::from_file(&path).expect("Failed to load config");

            config.apply_env(lookup(&[
                ("SMART_NOTES_AI_ENDPOINT", "http://env/generate"),
                ("SMART_NOTES_SERVER_API_KEY", "server-key"),
                ("SMART_NOTES_GOOGLE_CLIENT_ID", "client-1"),
            ]));

            assert_eq!(config.ai.endpoint, "http://env/generate");
            assert_eq!(config.server.api_key.as_deref(), Some("server-key"));
            assert_eq!(config.auth.google_client_id.as_deref(), Some("client-1"));
        }

        it "ignore blank values" {
            let path = write_config(&dir, r#"{ "store": { "api_key": "file-key" } }"#);
            let mut config = AppConfig::from_file(&path).expect("Failed to load config");

            config.apply_env(lookup(&[("SMART_NOTES_STORE_API_KEY", "   ")]));

            assert_eq!(config.store.api_key.as_deref(), Some("file-key"));
        }
    }
}
