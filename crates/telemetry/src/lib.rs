//! Request telemetry for Verdant.
//!
//! Records how long each pipeline stage took and keeps a rolling window
//! of execution outcomes per agent. The agent scorer reads success rates
//! back out of the registry.

pub mod engine;
pub mod model;

pub use engine::MetricsRegistry;
pub use model::{
    AgentMetrics, AgentMetricsView, ExecutionSample, MetricsSnapshot, NEUTRAL_SUCCESS_RATE,
    RequestTrace, Stage, StageRecord, StageStats,
};
