use std::{
    fs, io,
    path::PathBuf,
    sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::{debug, warn};
use secrecy::Secret;
use serde::{Deserialize, Serialize};

use taskdeck::{auth::AccessToken, user::UserProfile};

use crate::errors::ClientError;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    Authenticating,
    LoggedIn,
}

/// Persistence for the bearer credential, so a session survives an
/// application restart. Storage failures are logged and swallowed; a lost
/// credential only means the user has to log in again.
pub trait CredentialStorage: Send + Sync {
    fn load(&self) -> Option<Secret<AccessToken>>;
    fn store(&self, token: &Secret<AccessToken>);
    fn clear(&self);
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    access_token: Secret<AccessToken>,
}

pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CredentialStorage for FileCredentialStore {
    fn load(&self) -> Option<Secret<AccessToken>> {
        let Ok(json) = fs::read_to_string(&self.path) else {
            debug!("No credential found at {}", self.path.display());
            return None;
        };
        let Ok(stored) = serde_json::from_str::<StoredCredential>(&json) else {
            warn!(
                "Failed to parse the credential stored at {}. Ignoring it.",
                self.path.display()
            );
            return None;
        };
        Some(stored.access_token)
    }

    fn store(&self, token: &Secret<AccessToken>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!("Unable to create {}: {err}. Credential not saved.", parent.display());
                return;
            }
        }
        let stored = StoredCredential {
            access_token: token.clone(),
        };
        let Ok(json) = serde_json::to_string(&stored) else {
            warn!("Failed to serialize credential. Credential not saved.");
            return;
        };
        if let Err(err) = fs::write(&self.path, json) {
            warn!("Failed to save credential to {}: {err}", self.path.display());
        } else {
            debug!("Credential saved to {}", self.path.display());
        }
    }

    fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Failed to clear credential at {}: {err}", self.path.display());
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<Secret<AccessToken>>>,
}

impl CredentialStorage for MemoryCredentialStore {
    fn load(&self) -> Option<Secret<AccessToken>> {
        self.token
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn store(&self, token: &Secret<AccessToken>) {
        *self.token.lock().unwrap_or_else(|err| err.into_inner()) = Some(token.clone());
    }

    fn clear(&self) {
        *self.token.lock().unwrap_or_else(|err| err.into_inner()) = None;
    }
}

#[derive(Default)]
struct SessionInner {
    state: SessionState,
    access_token: Option<Secret<AccessToken>>,
    user: Option<UserProfile>,
}

/// Holds the current credential and cached user profile, and owns the
/// `LoggedOut -> Authenticating -> LoggedIn -> LoggedOut` lifecycle.
pub struct Session {
    storage: Box<dyn CredentialStorage>,
    inner: RwLock<SessionInner>,
}

impl Session {
    pub fn new(storage: Box<dyn CredentialStorage>) -> Self {
        let mut inner = SessionInner::default();
        if let Some(token) = storage.load() {
            debug!("Restoring persisted credential");
            inner.state = SessionState::LoggedIn;
            inner.access_token = Some(token);
        }
        Self {
            storage,
            inner: RwLock::new(inner),
        }
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    pub fn access_token(&self) -> Option<Secret<AccessToken>> {
        self.read().access_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    pub(crate) fn begin_authentication(&self) -> Result<(), ClientError> {
        let mut inner = self.write();
        if inner.state != SessionState::LoggedOut {
            return Err(ClientError::InvalidInputData {
                user_error: "A session is already active".to_string(),
            });
        }
        inner.state = SessionState::Authenticating;
        Ok(())
    }

    pub(crate) fn complete_login(&self, token: Secret<AccessToken>) {
        self.storage.store(&token);
        let mut inner = self.write();
        inner.state = SessionState::LoggedIn;
        inner.access_token = Some(token);
    }

    pub(crate) fn fail_login(&self) {
        let mut inner = self.write();
        inner.state = SessionState::LoggedOut;
        inner.access_token = None;
        inner.user = None;
    }

    pub(crate) fn set_user(&self, user: UserProfile) {
        self.write().user = Some(user);
    }

    /// Unconditional: clears the credential and cached profile without any
    /// network call.
    pub fn logout(&self) {
        self.storage.clear();
        *self.write() = SessionInner::default();
    }

    /// The remote service rejected the credential. Drop it so the user is
    /// prompted to authenticate again instead of retrying.
    pub(crate) fn invalidate(&self) {
        warn!("Session credential rejected by the remote service");
        self.logout();
    }

    fn read(&self) -> RwLockReadGuard<SessionInner> {
        self.inner.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<SessionInner> {
        self.inner.write().unwrap_or_else(|err| err.into_inner())
    }
}
