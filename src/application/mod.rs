pub mod loop_governor;

pub use loop_governor::LoopGovernor;
