use crate::domains::grid::types::{AgentId, Cell, GoalLabel};
use crate::domains::grid::world::GridWorld;
use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// Sentinel distance for disconnected cell pairs. Maximal, so an
/// unreachable goal is never preferred over any reachable one.
pub const UNREACHABLE: u32 = u32::MAX;

/// Static-obstacle distance oracle.
///
/// Built once per board from the fixed obstacle set; other agents'
/// positions are deliberately invisible here. Treating a transient
/// occupant as an obstacle would route agents around cells that will be
/// free next step, which is exactly the conflation `GridWorld` keeps out
/// of its planning queries.
#[derive(Debug, Clone)]
pub struct DistanceOracle {
    graph: UnGraph<Cell, ()>,
    nodes: HashMap<Cell, NodeIndex>,
}

impl DistanceOracle {
    /// 4-connected free-cell graph over a `size`-by-`size` board.
    pub fn new(size: usize, obstacles: &std::collections::BTreeSet<Cell>) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut nodes = HashMap::new();

        for row in 0..size {
            for col in 0..size {
                let cell = Cell::new(row, col);
                if !obstacles.contains(&cell) {
                    nodes.insert(cell, graph.add_node(cell));
                }
            }
        }
        for (&cell, &idx) in &nodes {
            // Right and up neighbors only; the graph is undirected.
            let right = Cell::new(cell.row, cell.col + 1);
            let up = Cell::new(cell.row + 1, cell.col);
            for neighbor in [right, up] {
                if let Some(&other) = nodes.get(&neighbor) {
                    graph.add_edge(idx, other, ());
                }
            }
        }

        Self { graph, nodes }
    }

    pub fn for_world(world: &GridWorld) -> Self {
        Self::new(world.size, &world.obstacles)
    }

    /// Unit-cost shortest path length between two cells: 0 when equal,
    /// `UNREACHABLE` when disconnected or when either endpoint is an
    /// obstacle. Symmetric by construction.
    pub fn shortest_path_length(&self, from: Cell, to: Cell) -> u32 {
        if from == to {
            return 0;
        }
        let (Some(&start), Some(&target)) = (self.nodes.get(&from), self.nodes.get(&to)) else {
            return UNREACHABLE;
        };
        let costs = dijkstra(&self.graph, start, Some(target), |_| 1u32);
        costs.get(&target).copied().unwrap_or(UNREACHABLE)
    }

    /// Distances from one cell to every reachable cell, in one sweep.
    pub fn distances_from(&self, from: Cell) -> HashMap<Cell, u32> {
        let Some(&start) = self.nodes.get(&from) else {
            return HashMap::new();
        };
        dijkstra(&self.graph, start, None, |_| 1u32)
            .into_iter()
            .map(|(idx, dist)| (self.graph[idx], dist))
            .collect()
    }

    /// Agent-by-goal distance matrix over the world's active agents and
    /// unclaimed goals.
    pub fn distance_matrix(&self, world: &GridWorld) -> DistanceMatrix {
        let agents = world.active_agents();
        let goals = world.live_goals();
        let entries = agents
            .iter()
            .map(|(_, pos)| {
                let from_here = self.distances_from(*pos);
                goals
                    .iter()
                    .map(|(_, goal)| from_here.get(goal).copied().unwrap_or(UNREACHABLE))
                    .collect()
            })
            .collect();

        DistanceMatrix {
            agents: agents.into_iter().map(|(id, _)| id).collect(),
            goals: goals.into_iter().map(|(label, _)| label).collect(),
            entries,
        }
    }
}

/// Row-per-agent, column-per-goal distance table.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    pub agents: Vec<AgentId>,
    pub goals: Vec<GoalLabel>,
    pub entries: Vec<Vec<u32>>,
}

impl DistanceMatrix {
    pub fn is_square(&self) -> bool {
        self.agents.len() == self.goals.len()
    }

    pub fn get(&self, agent: AgentId, goal: GoalLabel) -> Option<u32> {
        let row = self.agents.iter().position(|a| *a == agent)?;
        let col = self.goals.iter().position(|g| *g == goal)?;
        Some(self.entries[row][col])
    }
}
