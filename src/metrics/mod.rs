pub mod engine;

pub use engine::{calculate_cycle_metrics, calculate_horizon_metrics};
