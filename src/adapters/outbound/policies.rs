use crate::common::DomainResult;
use crate::domains::assignment::resolver::Ranking;
use crate::domains::grid::distance::{DistanceOracle, UNREACHABLE};
use crate::domains::grid::types::{Cell, Direction, GoalLabel};
use crate::domains::simulation::ports::{AgentPolicy, Observation};
use async_trait::async_trait;
use std::collections::BTreeSet;

fn goal_cell(observation: &Observation, goal: GoalLabel) -> Option<Cell> {
    observation
        .goals
        .iter()
        .find(|(label, _)| *label == goal)
        .map(|(_, cell)| *cell)
}

/// Straight-line heuristic: rank goals by Manhattan distance, step in
/// the first legal direction that strictly shrinks it. Blind to
/// obstacles beyond the next cell, so it can stall against walls; that
/// is the point of keeping it as the naive baseline.
pub struct ManhattanPolicy;

#[async_trait]
impl AgentPolicy for ManhattanPolicy {
    async fn select_target(&self, observation: &Observation) -> DomainResult<Ranking> {
        let mut goals: Vec<(usize, GoalLabel)> = observation
            .goals
            .iter()
            .map(|(label, cell)| (observation.position.manhattan_distance(cell), *label))
            .collect();
        goals.sort();
        Ok(goals.into_iter().map(|(_, label)| label).collect())
    }

    async fn select_direction(
        &self,
        observation: &Observation,
        declared_goal: Option<GoalLabel>,
    ) -> DomainResult<Option<Direction>> {
        let Some(goal) = declared_goal.and_then(|g| goal_cell(observation, g)) else {
            return Ok(None);
        };
        let current = observation.position.manhattan_distance(&goal);
        let step = observation
            .legal_directions()
            .into_iter()
            .find(|d| {
                d.step_from(observation.position, observation.grid_size)
                    .map(|target| target.manhattan_distance(&goal) < current)
                    .unwrap_or(false)
            });
        Ok(step)
    }
}

/// Shortest-path heuristic: goals ranked by true BFS distance over the
/// static obstacles, moves chosen by descending the distance field. The
/// oracle is built once from the board layout and never sees other
/// agents.
pub struct BfsGreedyPolicy {
    oracle: DistanceOracle,
}

impl BfsGreedyPolicy {
    pub fn new(size: usize, obstacles: &BTreeSet<Cell>) -> Self {
        Self {
            oracle: DistanceOracle::new(size, obstacles),
        }
    }
}

#[async_trait]
impl AgentPolicy for BfsGreedyPolicy {
    async fn select_target(&self, observation: &Observation) -> DomainResult<Ranking> {
        let mut goals: Vec<(u32, GoalLabel)> = observation
            .goals
            .iter()
            .map(|(label, cell)| {
                (
                    self.oracle.shortest_path_length(observation.position, *cell),
                    *label,
                )
            })
            .filter(|(distance, _)| *distance != UNREACHABLE)
            .collect();
        goals.sort();
        Ok(goals.into_iter().map(|(_, label)| label).collect())
    }

    async fn select_direction(
        &self,
        observation: &Observation,
        declared_goal: Option<GoalLabel>,
    ) -> DomainResult<Option<Direction>> {
        let Some(goal) = declared_goal.and_then(|g| goal_cell(observation, g)) else {
            return Ok(None);
        };
        let current = self
            .oracle
            .shortest_path_length(observation.position, goal);
        if current == UNREACHABLE {
            return Ok(None);
        }

        let mut best: Option<(u32, Direction)> = None;
        for direction in observation.legal_directions() {
            let Some(target) = direction.step_from(observation.position, observation.grid_size)
            else {
                continue;
            };
            let distance = self.oracle.shortest_path_length(target, goal);
            if distance < current && best.map(|(d, _)| distance < d).unwrap_or(true) {
                best = Some((distance, direction));
            }
        }
        Ok(best.map(|(_, direction)| direction))
    }
}
