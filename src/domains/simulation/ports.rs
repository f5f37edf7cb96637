use crate::common::DomainResult;
use crate::domains::assignment::resolver::Ranking;
use crate::domains::grid::types::{AgentId, Cell, Direction, GoalLabel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One remembered move of an agent's own recent history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub from: Cell,
    pub direction: Direction,
    pub to: Cell,
}

/// Read-only view handed to a policy each consultation: the agent's own
/// state, the board, and what everyone else is up to. Assembled fresh
/// from the step snapshot; policies never touch the world directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub agent_id: AgentId,
    pub position: Cell,
    pub grid_size: usize,
    pub obstacles: BTreeSet<Cell>,
    pub other_agents: Vec<(AgentId, Cell)>,
    pub goals: Vec<(GoalLabel, Cell)>,
    /// The agent's own most recent moves, newest last, at most five.
    pub recent_moves: Vec<MoveRecord>,
    pub visit_counts: BTreeMap<Cell, u32>,
    /// Goals other agents declared on the previous step.
    pub declared_targets: BTreeMap<AgentId, GoalLabel>,
}

impl Observation {
    /// Directions that are in bounds, obstacle-free and not stepping onto
    /// another agent, judged purely from this observation.
    pub fn legal_directions(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|d| {
                d.step_from(self.position, self.grid_size)
                    .map(|target| {
                        !self.obstacles.contains(&target)
                            && !self.other_agents.iter().any(|(_, p)| *p == target)
                    })
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// The external decision maker: language model, heuristic or human. A
/// black box to the engine. Both calls are awaited behind a timeout by
/// the simulator; an error or a timeout degrades to "no preference this
/// round" and never aborts the run.
#[async_trait]
pub trait AgentPolicy: Send + Sync {
    /// Rank the live goals, most preferred first. An empty ranking is a
    /// valid answer.
    async fn select_target(&self, observation: &Observation) -> DomainResult<Ranking>;

    /// Choose a single step toward the declared goal, or None to stay
    /// put.
    async fn select_direction(
        &self,
        observation: &Observation,
        declared_goal: Option<GoalLabel>,
    ) -> DomainResult<Option<Direction>>;
}
