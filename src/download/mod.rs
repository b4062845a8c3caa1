//! The download engine: the state machine that turns an approved
//! WishlistItem into bytes on disk.

pub mod engine;
pub mod file_filter;
pub mod fsm;
pub mod path_resolution;
pub mod progress;
pub mod quality;
pub mod retry_policy;
pub mod scoring;
pub mod search_query;

pub use engine::{DownloadEngine, EngineConfig, SelectionMode};
