//! Discology — a self-hosted recommendation-driven music acquisition pipeline.
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod background_jobs;
pub mod clients;
pub mod config;
pub mod download;
pub mod error;
pub mod events;
pub mod jobs;
pub mod persistence;
pub mod queue;
pub mod sqlite_persistence;
pub mod wishlist;

pub use error::{AppError, AppResult};
pub use events::EventBus;
pub use persistence::Store;
