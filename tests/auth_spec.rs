use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use smart_notes::auth::{
    AuthError, ConsentRequest, GoogleIdentityProvider, IdentityProvider, ProviderCredential,
    SignInSurface,
};
use smart_notes::models::UserIdentity;
use smart_notes::session::{SessionEvent, SessionFile, SessionManager};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ada() -> UserIdentity {
    UserIdentity {
        uid: "uid-ada".to_string(),
        email: Some("ada@example.com".to_string()),
        display_name: Some("Ada".to_string()),
        id_token: "backend-token".to_string(),
        refresh_token: None,
    }
}

/// Provider that signs in as a fixed user, or fails when told to.
struct FakeProvider {
    fail: AtomicBool,
}

impl FakeProvider {
    fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_in(&self) -> Result<UserIdentity, AuthError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthError::MissingToken);
        }
        Ok(ada())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Surface that hands back a canned credential and records what it showed.
struct FakeSurface {
    credential: ProviderCredential,
    shown: Mutex<Option<ConsentRequest>>,
}

impl FakeSurface {
    fn returning(id_token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            credential: ProviderCredential {
                id_token: id_token.map(String::from),
                access_token: Some("ya29.access".to_string()),
            },
            shown: Mutex::new(None),
        })
    }
}

#[async_trait]
impl SignInSurface for FakeSurface {
    async fn present(&self, request: &ConsentRequest) -> Result<ProviderCredential, AuthError> {
        *self.shown.lock().expect("surface lock poisoned") = Some(request.clone());
        Ok(self.credential.clone())
    }
}

fn recorder() -> (
    Arc<Mutex<Vec<SessionEvent>>>,
    impl Fn(&SessionEvent) + Send + Sync + 'static,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let listener = move |event: &SessionEvent| {
        sink.lock().expect("events lock poisoned").push(event.clone());
    };
    (events, listener)
}

mod session_manager {
    use super::*;

    #[tokio::test]
    async fn notifies_on_load_sign_in_and_sign_out() {
        let session = SessionManager::new(Arc::new(FakeProvider::new()));
        let (events, listener) = recorder();
        let _subscription = session.subscribe(listener);

        session.load();
        let user = session.sign_in().await.expect("Sign-in failed");
        assert!(session.is_signed_in());
        assert_eq!(session.current_user(), Some(user.clone()));

        session.sign_out().await.expect("Sign-out failed");
        assert!(!session.is_signed_in());

        let events = events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                SessionEvent::Loaded(None),
                SessionEvent::SignedIn(user),
                SessionEvent::SignedOut,
            ]
        );
    }

    #[tokio::test]
    async fn late_subscribers_receive_the_current_state() {
        let session = SessionManager::new(Arc::new(FakeProvider::new()));
        session.sign_in().await.expect("Sign-in failed");

        let (events, listener) = recorder();
        let _subscription = session.subscribe(listener);

        let events = events.lock().unwrap().clone();
        assert_eq!(events, vec![SessionEvent::Loaded(Some(ada()))]);
        assert_eq!(events[0].user().map(|u| u.owner_id()), Some("uid-ada"));
    }

    #[tokio::test]
    async fn dropped_subscriptions_stop_receiving_events() {
        let session = SessionManager::new(Arc::new(FakeProvider::new()));
        let (events, listener) = recorder();
        let subscription = session.subscribe(listener);

        session.load();
        subscription.unsubscribe();
        session.sign_in().await.expect("Sign-in failed");

        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_state_and_listeners_untouched() {
        let provider = Arc::new(FakeProvider::new());
        provider.fail.store(true, Ordering::SeqCst);
        let session = SessionManager::new(provider);
        session.load();
        let (events, listener) = recorder();
        let _subscription = session.subscribe(listener);

        let result = session.sign_in().await;

        assert!(matches!(result, Err(AuthError::MissingToken)));
        assert!(!session.is_signed_in());
        assert_eq!(events.lock().unwrap().clone(), vec![SessionEvent::Loaded(None)]);
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_a_readable_message_until_cleared() {
        let provider = Arc::new(FakeProvider::new());
        provider.fail.store(true, Ordering::SeqCst);
        let session = SessionManager::new(provider.clone());
        session.load();

        session.sign_in().await.expect_err("Sign-in should fail");

        assert_eq!(
            session.error_message().as_deref(),
            Some("Sign-in failed: ID token missing")
        );
        assert!(!session.is_loading());

        session.clear_error();
        assert!(session.error_message().is_none());

        session.sign_in().await.expect_err("Sign-in should fail");
        provider.fail.store(false, Ordering::SeqCst);
        session.sign_in().await.expect("Sign-in failed");
        assert!(session.error_message().is_none());
    }

    #[tokio::test]
    async fn is_loading_until_the_initial_load() {
        let session = SessionManager::new(Arc::new(FakeProvider::new()));
        assert!(session.is_loading());

        session.load();

        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn provider_rejection_is_reported_through_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "INVALID_IDP_RESPONSE" }
            })))
            .mount(&server)
            .await;
        let provider =
            GoogleIdentityProvider::new(Some("client-1".to_string()), Some("web-key".to_string()))
                .with_endpoint(server.uri())
                .with_surface(FakeSurface::returning(Some("stale")));
        let session = SessionManager::new(Arc::new(provider));
        session.load();

        session.sign_in().await.expect_err("Rejected sign-in should fail");

        let message = session.error_message().expect("No error message kept");
        assert!(message.starts_with("Sign-in failed: "));
        assert!(message.contains("INVALID_IDP_RESPONSE"));
        assert!(!session.is_signed_in());
    }

    #[tokio::test]
    async fn sessions_persist_between_managers() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("session.json");

        let first = SessionManager::new(Arc::new(FakeProvider::new()))
            .with_file(SessionFile::new(&path));
        first.load();
        first.sign_in().await.expect("Sign-in failed");

        let second = SessionManager::new(Arc::new(FakeProvider::new()))
            .with_file(SessionFile::new(&path));
        assert_eq!(second.load(), Some(ada()));

        second.sign_out().await.expect("Sign-out failed");
        assert!(!path.exists());

        let third = SessionManager::new(Arc::new(FakeProvider::new()))
            .with_file(SessionFile::new(&path));
        assert_eq!(third.load(), None);
    }
}

mod google_provider {
    use super::*;

    fn provider(server: &MockServer) -> GoogleIdentityProvider {
        GoogleIdentityProvider::new(Some("client-1".to_string()), Some("web-key".to_string()))
            .with_endpoint(server.uri())
    }

    #[tokio::test]
    async fn exchanges_the_id_token_for_a_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithIdp"))
            .and(query_param("key", "web-key"))
            .and(body_partial_json(json!({
                "postBody": "id_token=google-id-token&providerId=google.com&access_token=ya29.access",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-ada",
                "email": "ada@example.com",
                "displayName": "Ada",
                "idToken": "backend-token",
                "refreshToken": "refresh"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let surface = FakeSurface::returning(Some("google-id-token"));

        let user = provider(&server)
            .with_surface(surface.clone())
            .sign_in()
            .await
            .expect("Sign-in failed");

        assert_eq!(user.uid, "uid-ada");
        assert_eq!(user.label(), "Ada");
        assert_eq!(user.refresh_token.as_deref(), Some("refresh"));

        let shown = surface.shown.lock().unwrap().clone().expect("Consent page not shown");
        assert!(shown.url.starts_with("https://accounts.google.com/"));
        assert!(shown.url.contains("client_id=client-1"));
    }

    #[tokio::test]
    async fn missing_client_id_is_a_configuration_error() {
        let provider = GoogleIdentityProvider::new(None, Some("web-key".to_string()))
            .with_surface(FakeSurface::returning(Some("token")));

        let result = provider.sign_in().await;

        assert!(matches!(result, Err(AuthError::MissingClientConfig(_))));
    }

    #[tokio::test]
    async fn no_surface_means_no_sign_in() {
        let server = MockServer::start().await;

        let result = provider(&server).sign_in().await;

        assert!(matches!(result, Err(AuthError::NoSurface)));
    }

    #[tokio::test]
    async fn consent_without_id_token_fails_before_the_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = provider(&server)
            .with_surface(FakeSurface::returning(None))
            .sign_in()
            .await;

        assert!(matches!(result, Err(AuthError::MissingToken)));
        assert_eq!(AuthError::MissingToken.to_string(), "ID token missing");
    }

    #[tokio::test]
    async fn backend_rejection_carries_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "INVALID_IDP_RESPONSE" }
            })))
            .mount(&server)
            .await;

        let result = provider(&server)
            .with_surface(FakeSurface::returning(Some("stale")))
            .sign_in()
            .await;

        match result {
            Err(AuthError::Rejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "INVALID_IDP_RESPONSE");
            }
            other => panic!("Expected rejection, got {:?}", other.map(|u| u.uid)),
        }
    }
}
