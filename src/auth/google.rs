use std::sync::Arc;

use async_trait::async_trait;
use notes_core::models::UserIdentity;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{AuthError, ConsentRequest, IdentityProvider, SignInSurface};

/// Default identity backend (token exchange).
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";

const GOOGLE_CONSENT_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInWithIdpResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Google sign-in exchanged for a session with the identity backend.
#[derive(Clone)]
pub struct GoogleIdentityProvider {
    client_id: Option<String>,
    api_key: Option<String>,
    endpoint: String,
    redirect_uri: String,
    surface: Option<Arc<dyn SignInSurface>>,
    client: Client,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client_id,
            api_key,
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            surface: None,
            client: Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_surface(mut self, surface: Arc<dyn SignInSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    fn client_id(&self) -> Result<&str, AuthError> {
        non_empty(self.client_id.as_deref()).ok_or(AuthError::MissingClientConfig("OAuth client ID"))
    }

    fn api_key(&self) -> Result<&str, AuthError> {
        non_empty(self.api_key.as_deref())
            .ok_or(AuthError::MissingClientConfig("identity backend API key"))
    }

    /// Consent page asking Google for an id token.
    pub fn consent_request(&self, client_id: &str) -> Result<ConsentRequest, AuthError> {
        let nonce = Uuid::new_v4().simple().to_string();
        let url = Url::parse_with_params(
            GOOGLE_CONSENT_URL,
            &[
                ("client_id", client_id),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "id_token token"),
                ("scope", "openid email profile"),
                ("nonce", nonce.as_str()),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| AuthError::InvalidEndpoint {
            url: GOOGLE_CONSENT_URL.to_string(),
            reason: e.to_string(),
        })?;

        Ok(ConsentRequest {
            url: url.to_string(),
            nonce,
        })
    }

    fn exchange_url(&self, api_key: &str) -> Result<Url, AuthError> {
        let base = format!("{}/v1/accounts:signInWithIdp", self.endpoint);
        Url::parse_with_params(&base, &[("key", api_key)]).map_err(|e| AuthError::InvalidEndpoint {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })
    }

    /// Trade the provider's id token for a backend session.
    async fn exchange(
        &self,
        api_key: &str,
        id_token: &str,
        access_token: Option<&str>,
    ) -> Result<UserIdentity, AuthError> {
        let mut post_body = format!("id_token={}&providerId=google.com", id_token);
        if let Some(access_token) = access_token {
            post_body.push_str("&access_token=");
            post_body.push_str(access_token);
        }

        let body = SignInWithIdpRequest {
            post_body,
            request_uri: &self.redirect_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };

        let response = self
            .client
            .post(self.exchange_url(api_key)?)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|json| {
                    json.pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(String::from)
                })
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            tracing::warn!("Identity backend rejected sign-in: {} {}", status, message);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let session: SignInWithIdpResponse =
            serde_json::from_slice(&bytes).map_err(|e| AuthError::Rejected {
                status: status.as_u16(),
                message: format!("unexpected sign-in response: {}", e),
            })?;

        Ok(UserIdentity {
            uid: session.local_id,
            email: session.email,
            display_name: session.display_name,
            id_token: session.id_token,
            refresh_token: session.refresh_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn sign_in(&self) -> Result<UserIdentity, AuthError> {
        let client_id = self.client_id()?;
        let api_key = self.api_key()?;
        let surface = self.surface.as_ref().ok_or(AuthError::NoSurface)?;

        let request = self.consent_request(client_id)?;
        let credential = surface.present(&request).await?;
        let id_token = credential.id_token.as_deref().ok_or(AuthError::MissingToken)?;

        let user = self
            .exchange(api_key, id_token, credential.access_token.as_deref())
            .await?;
        tracing::info!("Signed in as {}", user.label());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // Google id tokens are bearer credentials with no server-side
        // session to end; dropping them locally is the whole sign-out.
        tracing::debug!("Google sign-out requires no provider call");
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
