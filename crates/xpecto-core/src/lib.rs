//! Core types and trait definitions for the Xpecto registration service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// Native `async fn` / RPITIT in traits; futures are bounded `Send` explicitly.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod pricing;
pub mod registration;
pub mod store;
pub mod workflow;

pub use error::{Error, Result};
