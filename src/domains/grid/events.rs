use crate::common::DomainEvent;
use crate::domains::grid::types::{AgentId, Cell, GoalLabel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMove {
    pub agent_id: AgentId,
    pub from: Cell,
    pub to: Cell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GridEvent {
    WorldInitialized {
        world_id: String,
        size: usize,
        obstacles: BTreeSet<Cell>,
        agents: Vec<(AgentId, Cell)>,
        goals: Vec<(GoalLabel, Cell)>,
        timestamp: DateTime<Utc>,
    },
    PositionsCommitted {
        world_id: String,
        step: u32,
        moves: Vec<AgentMove>,
        timestamp: DateTime<Utc>,
    },
    GoalClaimed {
        world_id: String,
        step: u32,
        agent_id: AgentId,
        goal: GoalLabel,
        cell: Cell,
        timestamp: DateTime<Utc>,
    },
    AgentRetired {
        world_id: String,
        step: u32,
        agent_id: AgentId,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for GridEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GridEvent::WorldInitialized { .. } => "WorldInitialized",
            GridEvent::PositionsCommitted { .. } => "PositionsCommitted",
            GridEvent::GoalClaimed { .. } => "GoalClaimed",
            GridEvent::AgentRetired { .. } => "AgentRetired",
        }
    }

    fn aggregate_id(&self) -> &str {
        match self {
            GridEvent::WorldInitialized { world_id, .. } => world_id,
            GridEvent::PositionsCommitted { world_id, .. } => world_id,
            GridEvent::GoalClaimed { world_id, .. } => world_id,
            GridEvent::AgentRetired { world_id, .. } => world_id,
        }
    }

    fn event_version(&self) -> u64 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            GridEvent::WorldInitialized { timestamp, .. } => *timestamp,
            GridEvent::PositionsCommitted { timestamp, .. } => *timestamp,
            GridEvent::GoalClaimed { timestamp, .. } => *timestamp,
            GridEvent::AgentRetired { timestamp, .. } => *timestamp,
        }
    }
}
