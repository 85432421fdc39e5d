//! Thread-safe metrics registry: aggregates stage timings per request and
//! keeps rolling execution outcomes per agent.

use crate::model::*;
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Completed request traces kept for inspection.
const MAX_TRACES: usize = 1_000;

/// The metrics registry shared by the orchestrator and the agent scorer.
///
/// Thread-safe via `RwLock`. Each lock guards one independent table, so a
/// poisoned lock (a panic while holding it) never leaves a table half
/// updated; the data is recovered and used as-is.
pub struct MetricsRegistry {
    /// Maximum samples kept per agent.
    sample_cap: usize,
    stages: RwLock<HashMap<Stage, StageStats>>,
    agents: RwLock<HashMap<String, AgentMetrics>>,
    /// Recent request traces (most recent last).
    traces: RwLock<VecDeque<RequestTrace>>,
    totals: RwLock<RequestTotals>,
}

#[derive(Debug, Default)]
struct RequestTotals {
    requests: u64,
    failed: u64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MetricsRegistry {
    pub fn new(sample_cap: usize) -> Self {
        Self {
            sample_cap: sample_cap.max(1),
            stages: RwLock::new(HashMap::new()),
            agents: RwLock::new(HashMap::new()),
            traces: RwLock::new(VecDeque::new()),
            totals: RwLock::new(RequestTotals::default()),
        }
    }

    pub fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    // ── Recording ─────────────────────────────────────────────────────

    /// Fold a completed request into the stage aggregates.
    pub fn record_trace(&self, trace: RequestTrace) {
        {
            let mut stages = write(&self.stages);
            for record in &trace.stages {
                stages.entry(record.stage).or_default().add(record);
            }
        }
        {
            let mut totals = write(&self.totals);
            totals.requests += 1;
            if !trace.succeeded() {
                totals.failed += 1;
            }
        }

        debug!(
            request_id = %trace.id,
            agent = trace.agent_id.as_deref().unwrap_or("-"),
            stages = trace.stages.len(),
            "Recorded request trace"
        );

        let mut traces = write(&self.traces);
        if traces.len() >= MAX_TRACES {
            traces.pop_front();
        }
        traces.push_back(trace);
    }

    /// Record one agent execution outcome.
    pub fn record_agent_execution(&self, agent_id: &str, duration_ms: u64, success: bool) {
        let mut agents = write(&self.agents);
        agents
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentMetrics::new(self.sample_cap))
            .record(duration_ms, success);
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// Rolling success rate for an agent; neutral when it has no history.
    pub fn agent_success_rate(&self, agent_id: &str) -> f64 {
        read(&self.agents)
            .get(agent_id)
            .map(AgentMetrics::success_rate)
            .unwrap_or(NEUTRAL_SUCCESS_RATE)
    }

    pub fn agent_metrics(&self, agent_id: &str) -> Option<AgentMetricsView> {
        read(&self.agents).get(agent_id).map(|m| m.view(agent_id))
    }

    pub fn stage_stats(&self, stage: Stage) -> StageStats {
        read(&self.stages).get(&stage).cloned().unwrap_or_default()
    }

    /// List recent traces (most recent first).
    pub fn recent_traces(&self, limit: usize) -> Vec<RequestTrace> {
        read(&self.traces).iter().rev().take(limit).cloned().collect()
    }

    pub fn request_count(&self) -> u64 {
        read(&self.totals).requests
    }

    /// Everything tracked, in stage order and agent-id order.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let stages = {
            let stages = read(&self.stages);
            Stage::ALL
                .iter()
                .filter_map(|s| stages.get(s).map(|stats| (*s, stats.clone())))
                .collect()
        };
        let agents = {
            let agents = read(&self.agents);
            let mut views: Vec<_> = agents.iter().map(|(id, m)| m.view(id)).collect();
            views.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
            views
        };
        let totals = read(&self.totals);

        MetricsSnapshot {
            requests: totals.requests,
            failed_requests: totals.failed,
            stages,
            agents,
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new(100)
    }
}
