//! Client configuration

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::HttpBackend;
use crate::reconciler::Reconciler;
use crate::session::{CredentialStore, Session, SessionManager};

/// Runtime configuration for the sync layer
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the task backend API
    pub api_url: String,
    /// Directory for client-local state (the persisted credential)
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(api_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api_url.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Resolve from `TD_API_URL` and `TD_DATA_DIR`, with development
    /// defaults
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("TD_API_URL").unwrap_or_else(|_| "http://localhost:8081".to_string());
        let data_dir = std::env::var("TD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".td-data"));
        Self { api_url, data_dir }
    }

    /// Wire up the sync stack: one shared session context injected into
    /// the HTTP backend, the session manager, and the reconciler.
    pub fn connect(&self) -> (SessionManager, Reconciler) {
        let session = Session::new();
        let backend = Arc::new(HttpBackend::new(self.api_url.clone(), session.clone()));
        let manager = SessionManager::new(
            session.clone(),
            backend.clone(),
            CredentialStore::new(self.data_dir.clone()),
        );
        let reconciler = Reconciler::new(backend, session);
        (manager, reconciler)
    }
}
