//! Core library for Taskdeck
//!
//! This crate contains the client-side domain logic, including:
//! - The task model and the ordered in-memory store
//! - Completion filtering for rendering
//! - Drag-gesture translation into list moves
//!
//! Nothing in here touches the network; backend synchronization lives in
//! the `td-sync` crate.

pub mod error;
pub mod task;
pub mod view;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
