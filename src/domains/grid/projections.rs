// Grid projections - simplified implementation
use serde::{Deserialize, Serialize};

use crate::domains::grid::world::GridWorld;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridProjection {
    pub world_id: String,
    pub active_agent_count: usize,
    pub remaining_goal_count: usize,
    pub obstacle_count: usize,
}

impl GridProjection {
    pub fn from_world(world: &GridWorld) -> Self {
        Self {
            world_id: world.id.clone(),
            active_agent_count: world.active_agents().len(),
            remaining_goal_count: world.live_goals().len(),
            obstacle_count: world.obstacles.len(),
        }
    }
}
