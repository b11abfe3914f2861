//! # Siteline Shared Library
//!
//! Authentication core shared by the Siteline API server and client.
//!
//! ## Module Organization
//!
//! - `models`: user record, roles, and the sanitized user shape
//! - `auth`: password hashing, tokens, OAuth linking, the auth orchestrator and guards
//! - `store`: credential store trait with in-memory and PostgreSQL backends
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the Siteline shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
