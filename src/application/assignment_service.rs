// Assignment service - exact-optimum baselines for a laid-out board
use crate::common::DomainResult;
use crate::domains::assignment::solver::solve_minimax;
use crate::domains::grid::distance::DistanceOracle;
use crate::domains::grid::types::{AgentId, GoalLabel};
use crate::domains::grid::world::GridWorld;
use std::collections::BTreeMap;

pub struct AssignmentService;

impl AssignmentService {
    /// Exact minimax assignment for the world's current active agents
    /// and unclaimed goals. Counts must match; this is the ground-truth
    /// makespan baseline for small boards.
    pub fn optimal_assignment(
        world: &GridWorld,
    ) -> DomainResult<(BTreeMap<AgentId, GoalLabel>, u32)> {
        let oracle = DistanceOracle::for_world(world);
        let matrix = oracle.distance_matrix(world);
        let solution = solve_minimax(&matrix)?;
        let assignment = matrix
            .agents
            .iter()
            .enumerate()
            .map(|(row, id)| (*id, matrix.goals[solution.assignment[row]]))
            .collect();
        Ok((assignment, solution.cost))
    }

    /// Summed nearest-goal distances, the per-agent lower bound used
    /// when the goal pool size differs from the agent count.
    pub fn nearest_goal_total(world: &GridWorld) -> u32 {
        let oracle = DistanceOracle::for_world(world);
        let matrix = oracle.distance_matrix(world);
        matrix
            .entries
            .iter()
            .map(|row| row.iter().copied().min().unwrap_or(0))
            .fold(0u32, |acc, d| acc.saturating_add(d))
    }
}
