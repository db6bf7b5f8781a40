//! SQLite backend for the Xpecto profile, registration and catalog stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. That thread also serialises every
//! write, and the schema backs the one-active-registration rule with a
//! partial unique index.

mod catalog;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
