//! Agent registry and selection.
//!
//! Agents are kept in registration order. Selection asks every agent
//! whether it can handle the request, scores the survivors and picks the
//! highest total; equal totals go to the earlier registration.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};
use verdant_config::ScoringConfig;
use verdant_core::agent::{Agent, AgentRequest};
use verdant_core::error::Error;
use verdant_telemetry::MetricsRegistry;

use crate::scoring::{AgentScorer, ScoreBreakdown};

/// The winner of one selection round.
pub struct AgentSelection {
    pub agent: Arc<dyn Agent>,
    pub score: ScoreBreakdown,
    /// How many agents passed the capability check.
    pub candidates: usize,
}

impl std::fmt::Debug for AgentSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSelection")
            .field("agent", &self.agent.id())
            .field("score", &self.score)
            .field("candidates", &self.candidates)
            .finish()
    }
}

pub struct AgentRegistry {
    agents: RwLock<Vec<Arc<dyn Agent>>>,
    scorer: AgentScorer,
    metrics: Arc<MetricsRegistry>,
}

impl AgentRegistry {
    pub fn new(scoring: ScoringConfig, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            agents: RwLock::new(Vec::new()),
            scorer: AgentScorer::new(scoring),
            metrics,
        }
    }

    /// Register an agent. An agent with the same id is replaced in place.
    pub fn register(&self, agent: Arc<dyn Agent>) {
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        match agents.iter().position(|a| a.id() == agent.id()) {
            Some(slot) => {
                debug!(agent_id = agent.id(), "Replacing registered agent");
                agents[slot] = agent;
            }
            None => agents.push(agent),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.list().into_iter().find(|a| a.id() == id)
    }

    /// All agents in registration order.
    pub fn list(&self) -> Vec<Arc<dyn Agent>> {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Pick the best agent for `request`.
    ///
    /// An agent whose capability check errors is skipped. Fails with
    /// [`Error::NoCapableAgent`] when no agent accepts the request.
    pub fn select_agent(&self, request: &AgentRequest) -> Result<AgentSelection, Error> {
        let agents = self.list();
        let mut best: Option<(Arc<dyn Agent>, ScoreBreakdown)> = None;
        let mut candidates = 0;

        for agent in agents {
            match agent.can_handle(&request.intent, &request.context) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(agent_id = agent.id(), error = %e, "Capability check failed, skipping agent");
                    continue;
                }
            }
            candidates += 1;

            let score = self.scorer.score(
                agent.profile(),
                request,
                self.metrics.agent_success_rate(agent.id()),
            );
            debug!(agent_id = agent.id(), total = score.total(), "Scored agent");

            // Strictly greater: earlier registrations win ties.
            if best
                .as_ref()
                .is_none_or(|(_, top)| score.total() > top.total())
            {
                best = Some((agent, score));
            }
        }

        let (agent, score) = best.ok_or_else(|| Error::NoCapableAgent {
            intent: request.intent.intent_type.to_string(),
        })?;
        Ok(AgentSelection {
            agent,
            score,
            candidates,
        })
    }
}
