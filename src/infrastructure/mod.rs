//! Infrastructure layer module
//!
//! Adapters binding the governance engine to the outside world:
//! - Append-only JSONL record store
//! - HTTP surface (axum)
//! - Configuration management (figment)
//!
//! Infrastructure implementations satisfy the port traits defined in the
//! domain layer.

pub mod config;
pub mod http;
pub mod store;
