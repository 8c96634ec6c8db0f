//! Session state for the signed-in user.
//!
//! [`SessionManager`] owns the current [`UserIdentity`] and notifies
//! subscribers on every transition: the initial load, sign-in and sign-out.
//! Subscriptions are guards; dropping one unregisters its callback.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use notes_core::models::UserIdentity;

use crate::auth::{AuthError, IdentityProvider};
use crate::busy::Busy;

/// A session transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Initial state, restored from disk or empty.
    Loaded(Option<UserIdentity>),
    SignedIn(UserIdentity),
    SignedOut,
}

impl SessionEvent {
    /// The user signed in after this transition, if any.
    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            Self::Loaded(user) => user.as_ref(),
            Self::SignedIn(user) => Some(user),
            Self::SignedOut => None,
        }
    }
}

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Registration handle returned by [`SessionManager::subscribe`].
#[must_use = "dropping a Subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Stop receiving events. Same as dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock().expect("session listeners poisoned");
            listeners.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Session persisted as JSON so it survives between CLI invocations.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session. A missing or unreadable file means no session.
    pub fn load(&self) -> Option<UserIdentity> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read session file {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("Ignoring corrupt session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Write the session. The file holds bearer tokens, so on unix it is
    /// readable by its owner only.
    pub fn save(&self, user: &UserIdentity) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(user)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // Mode only applies on creation; tighten files left by older writes.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
struct SessionState {
    user: Option<UserIdentity>,
    loaded: bool,
    error_message: Option<String>,
    operations_in_flight: usize,
}

/// Current-session owner. One per process, passed explicitly to whoever
/// needs it.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    file: Option<SessionFile>,
    state: Mutex<SessionState>,
    listeners: Arc<Mutex<Listeners>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            file: None,
            state: Mutex::new(SessionState::default()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    /// Persist sessions to `file`.
    pub fn with_file(mut self, file: SessionFile) -> Self {
        self.file = Some(file);
        self
    }

    /// Register `listener`. If the initial load already happened, it is
    /// called right away with the current state.
    pub fn subscribe(
        &self,
        listener: impl Fn(&SessionEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let listener: Listener = Arc::new(listener);
        let id = {
            let mut listeners = self.listeners.lock().expect("session listeners poisoned");
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::clone(&listener)));
            id
        };

        let initial = {
            let state = self.state.lock().expect("session state poisoned");
            state.loaded.then(|| SessionEvent::Loaded(state.user.clone()))
        };
        if let Some(event) = initial {
            listener(&event);
        }

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Initial load: restore the persisted session, if any.
    pub fn load(&self) -> Option<UserIdentity> {
        let user = self.file.as_ref().and_then(SessionFile::load);
        {
            let mut state = self.state.lock().expect("session state poisoned");
            state.user = user.clone();
            state.loaded = true;
        }
        tracing::debug!("Session loaded (signed in: {})", user.is_some());
        self.emit(SessionEvent::Loaded(user.clone()));
        user
    }

    /// Run the provider's sign-in and persist the result. A failure is
    /// also kept as [`SessionManager::error_message`].
    pub async fn sign_in(&self) -> Result<UserIdentity, AuthError> {
        let busy = Busy::enter(&self.state, |state| &mut state.operations_in_flight);
        let result = self.sign_in_with_provider().await;
        drop(busy);

        let user = match result {
            Ok(user) => user,
            Err(e) => return Err(self.fail("Sign-in failed", e)),
        };
        {
            let mut state = self.state.lock().expect("session state poisoned");
            state.user = Some(user.clone());
            state.loaded = true;
            state.error_message = None;
        }
        self.emit(SessionEvent::SignedIn(user.clone()));
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let busy = Busy::enter(&self.state, |state| &mut state.operations_in_flight);
        let result = self.sign_out_with_provider().await;
        drop(busy);

        if let Err(e) = result {
            return Err(self.fail("Sign-out failed", e));
        }
        {
            let mut state = self.state.lock().expect("session state poisoned");
            state.user = None;
            state.loaded = true;
            state.error_message = None;
        }
        tracing::info!("Signed out");
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }

    async fn sign_in_with_provider(&self) -> Result<UserIdentity, AuthError> {
        let user = self.provider.sign_in().await?;
        if let Some(file) = &self.file {
            file.save(&user)?;
        }
        Ok(user)
    }

    async fn sign_out_with_provider(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        if let Some(file) = &self.file {
            file.clear()?;
        }
        Ok(())
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.state.lock().expect("session state poisoned").user.clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.lock().expect("session state poisoned").user.is_some()
    }

    /// True until the initial load, and while a sign-in or sign-out runs.
    pub fn is_loading(&self) -> bool {
        let state = self.state.lock().expect("session state poisoned");
        !state.loaded || state.operations_in_flight > 0
    }

    /// Message describing the most recent failed sign-in or sign-out.
    pub fn error_message(&self) -> Option<String> {
        self.state.lock().expect("session state poisoned").error_message.clone()
    }

    pub fn clear_error(&self) {
        self.state.lock().expect("session state poisoned").error_message = None;
    }

    fn fail(&self, action: &str, error: AuthError) -> AuthError {
        let message = format!("{}: {}", action, error);
        tracing::warn!("{}", message);
        self.state.lock().expect("session state poisoned").error_message = Some(message);
        error
    }

    /// Call every listener outside the lock, so callbacks may subscribe or
    /// drop subscriptions themselves.
    fn emit(&self, event: SessionEvent) {
        let listeners: Vec<Listener> = {
            let listeners = self.listeners.lock().expect("session listeners poisoned");
            listeners.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(&event);
        }
    }
}
