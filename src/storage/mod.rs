//! Storage module.
//!
//! The database collaborator trait, its MySQL implementation, table
//! descriptors and SQL builders.

pub mod models;
pub mod mysql;
pub mod queries;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use models::*;
pub use mysql::MySqlStore;
pub use queries::*;
pub use store::Store;
