//! Backend synchronization for the Taskdeck client
//!
//! This crate owns everything that talks to the task backend: the REST
//! client with its error taxonomy, the session/credential lifecycle, and
//! the reconciler that keeps the in-memory task store consistent with
//! backend truth.

mod client;
mod config;
mod error;
mod reconciler;
mod session;

#[cfg(test)]
mod testutil;

pub use client::{HttpBackend, TaskBackend};
pub use config::Config;
pub use error::{ReconcileError, Result, SyncError};
pub use reconciler::{Outcome, Reconciler};
pub use session::{Credential, CredentialStore, Session, SessionManager, SessionProbe, User};
