//! Loopgate - Loop Governance & Trust-Gated Execution Control
//!
//! Loopgate decides whether an agent's plan→act→reflect loop may execute,
//! must freeze pending re-reflection, or requires operator escalation. It
//! maintains trust scores per agent, demotes and restores agents around a
//! configurable trust threshold, selects among candidate plans with
//! weighted criteria, and keeps an append-only audit log of every
//! governance decision.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure governance models and ports
//! - **Application Layer** (`application`): The `LoopGovernor` facade
//! - **Service Layer** (`services`): Threshold registry, trust evaluator,
//!   demotion manager, freeze controller, plan selector, escalation handler
//! - **Infrastructure Layer** (`infrastructure`): JSONL record store,
//!   HTTP surface, configuration loading
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use loopgate::application::LoopGovernor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Build a governor over a record store and start evaluating loops
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::LoopGovernor;
pub use domain::models::{
    Config, CriteriaWeights, ExecutionStatus, FreezeEvent, GovernanceRecord, LoopState, LoopStatus,
    Plan, TrustEvent, TrustMetrics,
};
pub use domain::ports::{GovernanceError, InMemoryRecordStore, RecordQuery, RecordStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::store::JsonlRecordStore;
pub use services::{
    DemotionManager, EscalationHandler, FreezeController, PlanSelector, ThresholdRegistry,
    TrustEvaluator,
};
