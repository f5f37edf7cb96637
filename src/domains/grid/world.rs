use crate::common::aggregate::AggregateRoot;
use crate::common::{DomainError, DomainResult};
use crate::domains::grid::events::{AgentMove, GridEvent};
use crate::domains::grid::types::{AgentId, Cell, Direction, GoalLabel, MAX_GOALS};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Logical scenario descriptor: everything needed to lay out a board.
/// File syntax lives in the inbound scenario adapter, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub size: usize,
    pub obstacles: Vec<Cell>,
    pub agents: Vec<Cell>,
    pub goals: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSlot {
    pub id: AgentId,
    /// None once the agent has been retired. Retired agents never reappear.
    pub position: Option<Cell>,
}

impl AgentSlot {
    pub fn is_active(&self) -> bool {
        self.position.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSlot {
    pub label: GoalLabel,
    /// None once an agent has claimed the goal.
    pub position: Option<Cell>,
}

/// The grid world aggregate: board geometry plus the only mutable shared
/// state in the system (agent and goal positions). All mutation flows
/// through the commit-phase commands below, which emit domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridWorld {
    pub id: String,
    pub size: usize,
    pub obstacles: BTreeSet<Cell>,
    pub agents: Vec<AgentSlot>,
    pub goals: Vec<GoalSlot>,
    pub version: u64,
    #[serde(skip)]
    uncommitted_events: Vec<GridEvent>,
}

impl GridWorld {
    /// Empty shell used as the seed for event replay.
    pub fn empty(id: String) -> Self {
        Self {
            id,
            size: 0,
            obstacles: BTreeSet::new(),
            agents: Vec::new(),
            goals: Vec::new(),
            version: 0,
            uncommitted_events: Vec::new(),
        }
    }

    /// Build a world from an explicit scenario. Fails fast on any
    /// malformed layout; never silently coerces.
    pub fn from_scenario(id: String, scenario: &Scenario) -> DomainResult<Self> {
        if scenario.size == 0 {
            return Err(DomainError::InvalidScenario {
                reason: "Grid size must be at least 1".to_string(),
            });
        }
        if scenario.goals.len() > MAX_GOALS {
            return Err(DomainError::InvalidScenario {
                reason: format!(
                    "At most {} goals are supported, got {}",
                    MAX_GOALS,
                    scenario.goals.len()
                ),
            });
        }

        let obstacles: BTreeSet<Cell> = scenario.obstacles.iter().copied().collect();
        for cell in &obstacles {
            if cell.row >= scenario.size || cell.col >= scenario.size {
                return Err(DomainError::InvalidScenario {
                    reason: format!("Obstacle {} is outside the {}x{} grid", cell, scenario.size, scenario.size),
                });
            }
        }

        let mut used: BTreeSet<Cell> = obstacles.clone();
        for (kind, cells) in [("Agent start", &scenario.agents), ("Goal", &scenario.goals)] {
            for cell in cells.iter() {
                if cell.row >= scenario.size || cell.col >= scenario.size {
                    return Err(DomainError::InvalidScenario {
                        reason: format!("{} {} is outside the {}x{} grid", kind, cell, scenario.size, scenario.size),
                    });
                }
                if !used.insert(*cell) {
                    return Err(DomainError::InvalidScenario {
                        reason: format!("{} {} overlaps an obstacle or another placed cell", kind, cell),
                    });
                }
            }
        }

        let agents: Vec<AgentSlot> = scenario
            .agents
            .iter()
            .enumerate()
            .map(|(i, cell)| AgentSlot {
                id: (i + 1) as AgentId,
                position: Some(*cell),
            })
            .collect();
        let goals: Vec<GoalSlot> = scenario
            .goals
            .iter()
            .enumerate()
            .map(|(i, cell)| GoalSlot {
                label: GoalLabel::from_index(i),
                position: Some(*cell),
            })
            .collect();

        let mut world = Self {
            id,
            size: scenario.size,
            obstacles,
            agents,
            goals,
            version: 0,
            uncommitted_events: Vec::new(),
        };

        let event = GridEvent::WorldInitialized {
            world_id: world.id.clone(),
            size: world.size,
            obstacles: world.obstacles.clone(),
            agents: world.active_agents(),
            goals: world.live_goals(),
            timestamp: Utc::now(),
        };
        world.add_event(event);
        Ok(world)
    }

    /// Sample a random layout: agents then goals drawn without replacement
    /// from the free cells. The obstacle set is an explicit input, never a
    /// shared default.
    pub fn with_random_layout<R: Rng + ?Sized>(
        id: String,
        size: usize,
        obstacles: BTreeSet<Cell>,
        num_agents: usize,
        num_goals: usize,
        rng: &mut R,
    ) -> DomainResult<Self> {
        let mut free: Vec<Cell> = (0..size)
            .flat_map(|row| (0..size).map(move |col| Cell::new(row, col)))
            .filter(|c| !obstacles.contains(c))
            .collect();
        if free.len() < num_agents + num_goals {
            return Err(DomainError::InvalidScenario {
                reason: format!(
                    "Not enough free cells for {} agents and {} goals",
                    num_agents, num_goals
                ),
            });
        }
        free.shuffle(rng);

        let agents: Vec<Cell> = free[..num_agents].to_vec();
        let goals: Vec<Cell> = free[num_agents..num_agents + num_goals].to_vec();
        let scenario = Scenario {
            size,
            obstacles: obstacles.into_iter().collect(),
            agents,
            goals,
        };
        Self::from_scenario(id, &scenario)
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row < self.size && cell.col < self.size
    }

    /// Static validity test: out-of-bounds or a fixed obstacle. Never
    /// consults agent positions.
    pub fn is_obstacle(&self, cell: Cell) -> bool {
        !self.in_bounds(cell) || self.obstacles.contains(&cell)
    }

    /// Dynamic occupancy test against current agent positions, excluding
    /// the querying agent. Only used for move legality, never for
    /// distance planning.
    pub fn is_occupied(&self, cell: Cell, excluding: Option<AgentId>) -> bool {
        self.agents
            .iter()
            .filter(|a| Some(a.id) != excluding)
            .any(|a| a.position == Some(cell))
    }

    /// Directions whose target cell is in bounds, obstacle-free and not
    /// occupied by another active agent.
    pub fn valid_moves(&self, pos: Cell, mover: Option<AgentId>) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|d| {
                d.step_from(pos, self.size)
                    .map(|target| !self.is_obstacle(target) && !self.is_occupied(target, mover))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Resolve a move request to its target cell. Illegal requests (off
    /// grid, into an obstacle, onto an occupied cell) are a silent no-op
    /// that returns `pos` unchanged — never an error.
    pub fn apply_move(&self, pos: Cell, direction: Direction, mover: Option<AgentId>) -> Cell {
        match direction.step_from(pos, self.size) {
            Some(target) if !self.is_obstacle(target) && !self.is_occupied(target, mover) => target,
            _ => pos,
        }
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentSlot> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Active agents with their positions, in ascending id order.
    pub fn active_agents(&self) -> Vec<(AgentId, Cell)> {
        self.agents
            .iter()
            .filter_map(|a| a.position.map(|p| (a.id, p)))
            .collect()
    }

    /// Unclaimed goals with their positions, in label order.
    pub fn live_goals(&self) -> Vec<(GoalLabel, Cell)> {
        self.goals
            .iter()
            .filter_map(|g| g.position.map(|p| (g.label, p)))
            .collect()
    }

    pub fn has_active_agents(&self) -> bool {
        self.agents.iter().any(|a| a.is_active())
    }

    /// Commit the resolved positions for one timestep. The resolved set
    /// must already be collision-free; a duplicate target or an obstacle
    /// target is a broken invariant, not a recoverable situation.
    pub fn commit_positions(&mut self, step: u32, resolved: &[(AgentId, Cell)]) -> DomainResult<()> {
        let mut seen: BTreeSet<Cell> = BTreeSet::new();
        let mut moves = Vec::with_capacity(resolved.len());
        for (agent_id, target) in resolved {
            let slot = self.agent(*agent_id).ok_or_else(|| DomainError::InvalidCommand {
                reason: format!("Unknown agent {}", agent_id),
            })?;
            let from = slot.position.ok_or_else(|| DomainError::InvalidCommand {
                reason: format!("Agent {} is retired and cannot move", agent_id),
            })?;
            if self.is_obstacle(*target) {
                return Err(DomainError::InvalidCommand {
                    reason: format!("Agent {} committed onto obstacle {}", agent_id, target),
                });
            }
            if !seen.insert(*target) {
                return Err(DomainError::InvalidCommand {
                    reason: format!("Two agents committed onto cell {}", target),
                });
            }
            moves.push(AgentMove {
                agent_id: *agent_id,
                from,
                to: *target,
            });
        }

        let event = GridEvent::PositionsCommitted {
            world_id: self.id.clone(),
            step,
            moves,
            timestamp: Utc::now(),
        };
        self.add_event(event.clone());
        self.apply(&event)?;
        Ok(())
    }

    /// Claim phase: every active agent standing on an unclaimed goal cell
    /// is retired and the goal removed, in ascending agent order. Returns
    /// the claims made this step.
    pub fn claim_goals(&mut self, step: u32) -> DomainResult<Vec<(AgentId, GoalLabel)>> {
        let mut claims = Vec::new();
        for (agent_id, pos) in self.active_agents() {
            let claimed = self
                .goals
                .iter()
                .find(|g| g.position == Some(pos))
                .map(|g| g.label);
            if let Some(label) = claimed {
                let claim_event = GridEvent::GoalClaimed {
                    world_id: self.id.clone(),
                    step,
                    agent_id,
                    goal: label,
                    cell: pos,
                    timestamp: Utc::now(),
                };
                self.add_event(claim_event.clone());
                self.apply(&claim_event)?;

                let retire_event = GridEvent::AgentRetired {
                    world_id: self.id.clone(),
                    step,
                    agent_id,
                    timestamp: Utc::now(),
                };
                self.add_event(retire_event.clone());
                self.apply(&retire_event)?;

                claims.push((agent_id, label));
            }
        }
        Ok(claims)
    }
}

impl AggregateRoot for GridWorld {
    type Event = GridEvent;

    fn aggregate_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &GridEvent) -> DomainResult<()> {
        match event {
            GridEvent::WorldInitialized {
                size,
                obstacles,
                agents,
                goals,
                ..
            } => {
                self.size = *size;
                self.obstacles = obstacles.clone();
                self.agents = agents
                    .iter()
                    .map(|(id, cell)| AgentSlot {
                        id: *id,
                        position: Some(*cell),
                    })
                    .collect();
                self.goals = goals
                    .iter()
                    .map(|(label, cell)| GoalSlot {
                        label: *label,
                        position: Some(*cell),
                    })
                    .collect();
            }
            GridEvent::PositionsCommitted { moves, .. } => {
                for mv in moves {
                    if let Some(slot) = self.agents.iter_mut().find(|a| a.id == mv.agent_id) {
                        slot.position = Some(mv.to);
                    }
                }
            }
            GridEvent::GoalClaimed { goal, .. } => {
                if let Some(slot) = self.goals.iter_mut().find(|g| g.label == *goal) {
                    slot.position = None;
                }
            }
            GridEvent::AgentRetired { agent_id, .. } => {
                if let Some(slot) = self.agents.iter_mut().find(|a| a.id == *agent_id) {
                    slot.position = None;
                }
            }
        }
        self.version += 1;
        Ok(())
    }

    fn uncommitted_events(&self) -> &[GridEvent] {
        &self.uncommitted_events
    }

    fn mark_events_as_committed(&mut self) {
        self.uncommitted_events.clear();
    }

    fn add_event(&mut self, event: GridEvent) {
        self.uncommitted_events.push(event);
    }
}
