use crate::domains::grid::types::{AgentId, GoalLabel};
use serde::{Deserialize, Serialize};

/// A two-entry goal assignment covering both parties of a dispute. The
/// two goals must differ; validation happens when the proposal is
/// submitted to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub entries: [(AgentId, GoalLabel); 2],
}

impl Proposal {
    pub fn new(first: (AgentId, GoalLabel), second: (AgentId, GoalLabel)) -> Self {
        Self {
            entries: [first, second],
        }
    }

    pub fn goal_for(&self, agent: AgentId) -> Option<GoalLabel> {
        self.entries
            .iter()
            .find(|(id, _)| *id == agent)
            .map(|(_, goal)| *goal)
    }

    pub fn goals_differ(&self) -> bool {
        self.entries[0].1 != self.entries[1].1
    }
}

/// What the party to move does with its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationAction {
    /// Take the standing proposal as the agreement.
    Accept,
    /// Walk away; the dispute falls back to the greedy outcome.
    Reject,
    /// Put a new proposal on the table.
    Counter(Proposal),
}

/// Everything a negotiator is allowed to see: both parties' distances to
/// the allowed goals and their (top-2) preference lists. Mirrors the
/// reduced tables the step loop hands to each side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationContext {
    pub distances: std::collections::BTreeMap<AgentId, Vec<(GoalLabel, u32)>>,
    pub rankings: std::collections::BTreeMap<AgentId, Vec<GoalLabel>>,
}

impl NegotiationContext {
    pub fn distance(&self, agent: AgentId, goal: GoalLabel) -> Option<u32> {
        self.distances
            .get(&agent)?
            .iter()
            .find(|(g, _)| *g == goal)
            .map(|(_, d)| *d)
    }
}
