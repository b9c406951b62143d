//! Domain layer for the loop governance engine.
//!
//! Core record types and the port contracts they depend on.

pub mod models;
pub mod ports;

pub use ports::GovernanceError;
