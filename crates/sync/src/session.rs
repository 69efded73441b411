//! Session context and credential persistence
//!
//! The session is an explicit context object injected into the HTTP
//! client and the reconciler rather than ambient global state. The
//! credential is persisted in client-local storage under a fixed file
//! name; its presence alone does not imply validity, which is
//! established only by a successful task-list probe against the backend.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::TaskBackend;
use crate::error::{Result, SyncError};

/// Fixed file name for the persisted credential
const CREDENTIAL_FILE: &str = "credential.json";

/// Authenticated user identity returned by login/register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Bearer credential plus the identity it was issued for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub token: String,
    pub user: User,
}

/// Result of probing the backend with the current credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionProbe {
    /// The backend accepted the credential
    Valid,
    /// No credential, or the backend rejected it; the session was torn
    /// down and the stored credential cleared
    Invalid,
    /// The backend could not be reached; validity unknown, credential
    /// kept for a later retry
    Unreachable,
}

#[derive(Debug, Default)]
struct SessionState {
    credential: Option<Credential>,
    validated: bool,
    epoch: u64,
}

/// Shared session context.
///
/// Cheap to clone; all clones observe the same state. The epoch counter
/// increases on every teardown so that results of calls still in flight
/// when the session ended can be recognized and discarded.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<SessionState>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bearer token to attach to requests, if any
    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.credential.as_ref().map(|c| c.token.clone())
    }

    /// The user the current credential was issued for, if any
    pub async fn user(&self) -> Option<User> {
        self.inner.read().await.credential.as_ref().map(|c| c.user.clone())
    }

    /// True only once the credential has been confirmed by the backend
    pub async fn is_authenticated(&self) -> bool {
        let state = self.inner.read().await;
        state.credential.is_some() && state.validated
    }

    /// Monotonic counter bumped on teardown
    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    /// Install a credential confirmed by the backend (login/register)
    pub async fn establish(&self, credential: Credential) {
        let mut state = self.inner.write().await;
        state.credential = Some(credential);
        state.validated = true;
    }

    /// Install a persisted credential whose validity is still unknown
    pub async fn restore(&self, credential: Credential) {
        let mut state = self.inner.write().await;
        state.credential = Some(credential);
        state.validated = false;
    }

    /// Record a successful validation probe
    pub async fn mark_validated(&self) {
        self.inner.write().await.validated = true;
    }

    /// Drop all session state and invalidate in-flight results
    pub async fn teardown(&self) {
        let mut state = self.inner.write().await;
        state.credential = None;
        state.validated = false;
        state.epoch += 1;
    }
}

/// Durable client-local credential storage.
///
/// A single JSON file under the data directory. An unreadable or corrupt
/// file is treated as "no credential" rather than an error.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: data_dir.into().join(CREDENTIAL_FILE),
        }
    }

    /// Load the persisted credential, if one exists
    pub async fn load(&self) -> Option<Credential> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read credential file: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!("Discarding corrupt credential file: {}", e);
                None
            }
        }
    }

    /// Persist the credential
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| SyncError::Storage(format!("Failed to serialize credential: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Storage(format!("Failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| SyncError::Storage(format!("Failed to write credential file: {}", e)))
    }

    /// Remove the persisted credential, if any
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Storage(format!(
                "Failed to remove credential file: {}",
                e
            ))),
        }
    }
}

/// Session lifecycle: init on load, login/register, teardown on logout
/// or expiry.
pub struct SessionManager {
    session: Session,
    backend: Arc<dyn TaskBackend>,
    credentials: CredentialStore,
}

impl SessionManager {
    /// `session` must be the same context injected into the backend
    /// client, so that established credentials flow into requests.
    pub fn new(
        session: Session,
        backend: Arc<dyn TaskBackend>,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            session,
            backend,
            credentials,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Restore any persisted credential and probe it against the backend
    pub async fn init(&self) -> SessionProbe {
        let Some(credential) = self.credentials.load().await else {
            debug!("No stored credential");
            return SessionProbe::Invalid;
        };
        self.session.restore(credential).await;
        self.validate().await
    }

    /// Probe the backend task list to establish credential validity
    pub async fn validate(&self) -> SessionProbe {
        if self.session.token().await.is_none() {
            return SessionProbe::Invalid;
        }
        match self.backend.list_tasks().await {
            Ok(_) => {
                self.session.mark_validated().await;
                SessionProbe::Valid
            }
            Err(SyncError::Auth(message)) => {
                warn!("Stored credential rejected: {}", message);
                if let Err(e) = self.logout().await {
                    warn!("Failed to clear stored credential: {}", e);
                }
                SessionProbe::Invalid
            }
            Err(e) => {
                debug!("Session validation inconclusive: {}", e);
                SessionProbe::Unreachable
            }
        }
    }

    /// Authenticate and persist the returned credential
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let credential = self.backend.login(username, password).await?;
        self.credentials.save(&credential).await?;
        let user = credential.user.clone();
        self.session.establish(credential).await;
        info!("Session established for {}", user.username);
        Ok(user)
    }

    /// Create an account and persist the returned credential
    pub async fn register(&self, username: &str, password: &str) -> Result<User> {
        let credential = self.backend.register(username, password).await?;
        self.credentials.save(&credential).await?;
        let user = credential.user.clone();
        self.session.establish(credential).await;
        info!("Session established for new user {}", user.username);
        Ok(user)
    }

    /// Tear down the session and clear the persisted credential
    pub async fn logout(&self) -> Result<()> {
        self.session.teardown().await;
        self.credentials.clear().await
    }
}
