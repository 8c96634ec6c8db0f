//! Identity provider adapter.
//!
//! Sign-in is delegated entirely: a [`SignInSurface`] walks the user through
//! Google's consent page and hands back an id token, which the identity
//! backend exchanges for a session ([`UserIdentity`]).

mod google;
mod surface;

pub use google::{GoogleIdentityProvider, DEFAULT_IDENTITY_ENDPOINT};
pub use surface::{ConsentRequest, ProviderCredential, SignInSurface, TerminalSurface};

use async_trait::async_trait;
use notes_core::models::UserIdentity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing client configuration: {0}")]
    MissingClientConfig(&'static str),

    #[error("Invalid identity endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("No sign-in surface is available to present the consent page")]
    NoSurface,

    #[error("ID token missing")]
    MissingToken,

    #[error("Sign-in rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive sign-in flow.
    async fn sign_in(&self) -> Result<UserIdentity, AuthError>;

    /// End the provider-side session for the current user.
    async fn sign_out(&self) -> Result<(), AuthError>;
}
