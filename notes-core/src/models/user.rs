use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated user, as issued by the identity backend.
///
/// Tokens are redacted from the `Debug` output so identities can be logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Opaque user id. Used as the owner identifier of notes.
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Session token issued by the identity backend.
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl UserIdentity {
    pub fn owner_id(&self) -> &str {
        &self.uid
    }

    /// Human-readable name: display name, then email, then uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserIdentity")
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("id_token", &"<redacted>")
            .finish()
    }
}
