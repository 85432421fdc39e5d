//! Data model for pipeline stage timings and per-agent metrics.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Success rate reported for an agent with no recorded executions.
pub const NEUTRAL_SUCCESS_RATE: f64 = 0.5;

// ── Stage ─────────────────────────────────────────────────────────────────

/// A step of the request pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BuildContext,
    ClassifyIntent,
    SelectImages,
    SelectAgent,
    ExecuteAgent,
    /// Whole request, from entry to response.
    Total,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Self::BuildContext,
        Self::ClassifyIntent,
        Self::SelectImages,
        Self::SelectAgent,
        Self::ExecuteAgent,
        Self::Total,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuildContext => write!(f, "build_context"),
            Self::ClassifyIntent => write!(f, "classify_intent"),
            Self::SelectImages => write!(f, "select_images"),
            Self::SelectAgent => write!(f, "select_agent"),
            Self::ExecuteAgent => write!(f, "execute_agent"),
            Self::Total => write!(f, "total"),
        }
    }
}

/// One timed stage of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub duration_ms: u64,
    pub success: bool,
}

// ── RequestTrace ──────────────────────────────────────────────────────────

/// The stage records of a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTrace {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageRecord>,
    /// Agent that executed the request, if one was selected.
    pub agent_id: Option<String>,
    /// Error tag if the request failed.
    pub error_kind: Option<String>,
}

impl RequestTrace {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            stages: Vec::new(),
            agent_id: None,
            error_kind: None,
        }
    }

    pub fn record(&mut self, stage: Stage, duration_ms: u64, success: bool) {
        self.stages.push(StageRecord {
            stage,
            duration_ms,
            success,
        });
    }

    pub fn succeeded(&self) -> bool {
        self.error_kind.is_none()
    }

    /// Duration of a stage, if it ran.
    pub fn duration_of(&self, stage: Stage) -> Option<u64> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| r.duration_ms)
    }

    /// Stage durations as a JSON object keyed by stage name.
    pub fn timings_json(&self) -> serde_json::Value {
        self.stages
            .iter()
            .map(|r| (r.stage.to_string(), serde_json::json!(r.duration_ms)))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }
}

impl Default for RequestTrace {
    fn default() -> Self {
        Self::new()
    }
}

// ── StageStats ────────────────────────────────────────────────────────────

/// Aggregated latency and outcome counts for one stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StageStats {
    pub count: u64,
    pub failures: u64,
    pub total_ms: u64,
    pub max_ms: u64,
    pub last_ms: u64,
}

impl StageStats {
    pub fn add(&mut self, record: &StageRecord) {
        self.count += 1;
        if !record.success {
            self.failures += 1;
        }
        self.total_ms += record.duration_ms;
        self.max_ms = self.max_ms.max(record.duration_ms);
        self.last_ms = record.duration_ms;
    }

    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms as f64 / self.count as f64
        }
    }
}

// ── AgentMetrics ──────────────────────────────────────────────────────────

/// One completed execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSample {
    pub duration_ms: u64,
    pub success: bool,
    pub at: DateTime<Utc>,
}

/// Rolling metrics for one agent.
#[derive(Debug, Clone)]
pub struct AgentMetrics {
    pub success_count: u64,
    pub error_count: u64,
    samples: VecDeque<ExecutionSample>,
    cap: usize,
}

impl AgentMetrics {
    pub fn new(cap: usize) -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            samples: VecDeque::with_capacity(cap.min(128)),
            cap: cap.max(1),
        }
    }

    /// Record one execution, evicting the oldest sample past the cap.
    pub fn record(&mut self, duration_ms: u64, success: bool) {
        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }
        if self.samples.len() == self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back(ExecutionSample {
            duration_ms,
            success,
            at: Utc::now(),
        });
    }

    pub fn samples(&self) -> impl Iterator<Item = &ExecutionSample> {
        self.samples.iter()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Success rate over the retained window.
    pub fn success_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return NEUTRAL_SUCCESS_RATE;
        }
        let ok = self.samples.iter().filter(|s| s.success).count();
        ok as f64 / self.samples.len() as f64
    }

    pub fn average_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: u64 = self.samples.iter().map(|s| s.duration_ms).sum();
        total as f64 / self.samples.len() as f64
    }

    pub fn view(&self, agent_id: &str) -> AgentMetricsView {
        AgentMetricsView {
            agent_id: agent_id.to_string(),
            success_count: self.success_count,
            error_count: self.error_count,
            samples: self.samples.len(),
            success_rate: self.success_rate(),
            average_ms: self.average_ms(),
        }
    }
}

/// Serializable summary of an agent's metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMetricsView {
    pub agent_id: String,
    pub success_count: u64,
    pub error_count: u64,
    pub samples: usize,
    pub success_rate: f64,
    pub average_ms: f64,
}

// ── Snapshot ──────────────────────────────────────────────────────────────

/// Point-in-time view of everything the registry tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub failed_requests: u64,
    pub stages: Vec<(Stage, StageStats)>,
    pub agents: Vec<AgentMetricsView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_capped() {
        let mut metrics = AgentMetrics::new(3);
        for i in 0..5 {
            metrics.record(i, true);
        }
        assert_eq!(metrics.sample_count(), 3);
        assert_eq!(metrics.success_count, 5);
        let durations: Vec<u64> = metrics.samples().map(|s| s.duration_ms).collect();
        assert_eq!(durations, vec![2, 3, 4]);
    }

    #[test]
    fn success_rate_is_rolling() {
        let mut metrics = AgentMetrics::new(2);
        assert_eq!(metrics.success_rate(), NEUTRAL_SUCCESS_RATE);

        metrics.record(10, false);
        metrics.record(10, false);
        assert_eq!(metrics.success_rate(), 0.0);

        metrics.record(10, true);
        metrics.record(10, true);
        assert_eq!(metrics.success_rate(), 1.0);
        assert_eq!(metrics.error_count, 2);
    }

    #[test]
    fn stage_stats_accumulate() {
        let mut stats = StageStats::default();
        stats.add(&StageRecord {
            stage: Stage::ClassifyIntent,
            duration_ms: 100,
            success: true,
        });
        stats.add(&StageRecord {
            stage: Stage::ClassifyIntent,
            duration_ms: 300,
            success: false,
        });
        assert_eq!(stats.count, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.max_ms, 300);
        assert_eq!(stats.last_ms, 300);
        assert!((stats.average_ms() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn trace_timings_json() {
        let mut trace = RequestTrace::new();
        trace.record(Stage::BuildContext, 1, true);
        trace.record(Stage::ClassifyIntent, 250, true);
        let json = trace.timings_json();
        assert_eq!(json["build_context"], 1);
        assert_eq!(json["classify_intent"], 250);
        assert_eq!(trace.duration_of(Stage::SelectAgent), None);
        assert!(trace.succeeded());
    }
}
