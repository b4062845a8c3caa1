pub mod versioned_schema;

pub use versioned_schema::*;
