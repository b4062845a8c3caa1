//! The single embedded relational store.

pub mod models;
pub mod schema;
mod store;
mod write_token;

pub use models::*;
pub use store::Store;
