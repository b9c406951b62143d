pub mod demotion_manager;
pub mod escalation;
pub mod freeze_controller;
pub mod plan_selector;
pub mod threshold_registry;
pub mod trust_evaluator;

pub use demotion_manager::{DemotionConfig, DemotionManager, RoleMap};
pub use escalation::EscalationHandler;
pub use freeze_controller::{FreezeController, FreezeControllerConfig};
pub use plan_selector::{PlanSelector, PlanSelectorConfig, SelectionOutcome};
pub use threshold_registry::ThresholdRegistry;
pub use trust_evaluator::{TrustEvaluator, TrustEvaluatorConfig};
