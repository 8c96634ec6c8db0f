use std::io::IsTerminal;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::AuthError;

/// What a surface must show the user to start sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    /// Google consent page, fully parameterized.
    pub url: String,
    /// Nonce embedded in the consent URL; echoed inside the id token.
    pub nonce: String,
}

/// Credential handed back by the OAuth provider after consent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderCredential {
    pub id_token: Option<String>,
    pub access_token: Option<String>,
}

impl ProviderCredential {
    /// Parse what the user pasted: either a bare id token or the redirect
    /// URL (or its fragment) carrying `id_token=` and `access_token=`.
    pub fn from_pasted(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::default();
        }

        if !input.contains("token=") {
            return Self {
                id_token: Some(input.to_string()),
                access_token: None,
            };
        }

        let params = input
            .rsplit(['#', '?'])
            .next()
            .unwrap_or(input);
        let mut credential = Self::default();
        for pair in params.split('&') {
            match pair.split_once('=') {
                Some(("id_token", value)) if !value.is_empty() => {
                    credential.id_token = Some(value.to_string())
                }
                Some(("access_token", value)) if !value.is_empty() => {
                    credential.access_token = Some(value.to_string())
                }
                _ => {}
            }
        }
        credential
    }
}

/// Something that can present the consent page and collect the result.
#[async_trait]
pub trait SignInSurface: Send + Sync {
    async fn present(&self, request: &ConsentRequest) -> Result<ProviderCredential, AuthError>;
}

/// Interactive terminal: prints the consent URL and reads the pasted token.
#[derive(Debug, Clone, Copy)]
pub struct TerminalSurface;

impl TerminalSurface {
    /// A terminal surface, if stdin is attached to a terminal.
    pub fn detect() -> Option<Self> {
        std::io::stdin().is_terminal().then_some(Self)
    }
}

#[async_trait]
impl SignInSurface for TerminalSurface {
    async fn present(&self, request: &ConsentRequest) -> Result<ProviderCredential, AuthError> {
        eprintln!("Open this URL in a browser and sign in with Google:\n");
        eprintln!("  {}\n", request.url);
        eprintln!("Then paste the redirect URL (or the id_token value) here:");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

        Ok(ProviderCredential::from_pasted(&line))
    }
}
