use crate::domains::grid::types::{AgentId, Cell, Direction, GoalLabel};
use serde::{Deserialize, Serialize};

/// One agent's slice of one committed timestep, for external reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u32,
    pub agent_id: AgentId,
    pub position_before: Cell,
    pub position_after: Cell,
    pub chosen_direction: Option<Direction>,
    pub declared_goal: Option<GoalLabel>,
}

/// End-of-run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Timesteps actually executed.
    pub steps: u32,
    /// Theoretical optimum: the minimax assignment cost when agent and
    /// goal counts match, otherwise the summed nearest-goal distances.
    pub optimal: u32,
    /// True when the run hit `max_steps` with agents still on the board.
    pub failed: bool,
    pub collisions: u32,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub metrics: RunMetrics,
    pub log: Vec<StepRecord>,
}
