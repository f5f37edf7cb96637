use crate::common::DomainResult;
use crate::domains::assignment::resolver::{resolve_conflicts, sanitize_ranking, Ranking};
use crate::domains::assignment::solver::solve_minimax;
use crate::domains::assignment::strategy::ConflictStrategy;
use crate::domains::grid::distance::{DistanceOracle, UNREACHABLE};
use crate::domains::grid::types::{AgentId, Cell, Direction, GoalLabel};
use crate::domains::grid::world::GridWorld;
use crate::domains::negotiation::ports::{drive_session, Negotiator};
use crate::domains::negotiation::session::{NegotiationSession, NegotiationState};
use crate::domains::negotiation::types::NegotiationContext;
use crate::domains::simulation::ports::{AgentPolicy, MoveRecord, Observation};
use crate::domains::simulation::projections::{RunMetrics, RunOutcome, StepRecord};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How many of an agent's own moves are kept in its observation window.
const RECENT_MOVES: usize = 5;

#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    pub max_steps: u32,
    pub policy_timeout: Duration,
    pub max_negotiation_rounds: u32,
    pub strategy: ConflictStrategy,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            max_steps: 30,
            policy_timeout: Duration::from_secs(5),
            max_negotiation_rounds: 4,
            strategy: ConflictStrategy::default(),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct AgentMemory {
    recent_moves: VecDeque<MoveRecord>,
    visits: BTreeMap<Cell, u32>,
}

/// One agent's tentative move for the step being resolved.
#[derive(Debug, Clone, Copy)]
pub struct MoveProposal {
    pub agent_id: AgentId,
    pub before: Cell,
    pub tentative: Cell,
    pub direction: Option<Direction>,
}

/// Collision resolution over one step's tentative moves, in fixed
/// ascending index order. Same-cell conflicts first: the lower-indexed
/// agent keeps its move, the other reverts to its pre-step cell. Then
/// head-on swaps: two agents trading cells would pass through each
/// other, so both stay put. Returns the number of collisions resolved.
pub fn resolve_collisions(proposals: &mut [MoveProposal]) -> u32 {
    let mut collisions = 0;

    for i in 0..proposals.len() {
        for j in (i + 1)..proposals.len() {
            if proposals[i].tentative == proposals[j].tentative {
                proposals[j].tentative = proposals[j].before;
                collisions += 1;
            }
        }
    }

    for i in 0..proposals.len() {
        for j in (i + 1)..proposals.len() {
            let head_on = proposals[i].tentative == proposals[j].before
                && proposals[j].tentative == proposals[i].before
                && proposals[i].before != proposals[j].before;
            if head_on {
                proposals[i].tentative = proposals[i].before;
                proposals[j].tentative = proposals[j].before;
                collisions += 1;
            }
        }
    }

    collisions
}

/// Drives the per-timestep propose/resolve/commit cycle.
///
/// Policy consultation (phase 2) is the only externally-latent call and
/// is read-only with respect to shared state; collision resolution and
/// the commit run in fixed ascending agent order so runs replay
/// identically. Nothing here mutates the world except through the
/// aggregate's commit and claim commands.
pub struct StepSimulator {
    policy: Arc<dyn AgentPolicy>,
    negotiator: Arc<dyn Negotiator>,
    oracle: DistanceOracle,
    settings: SimulatorSettings,
    memories: BTreeMap<AgentId, AgentMemory>,
    declared: BTreeMap<AgentId, GoalLabel>,
    completed_sessions: Vec<NegotiationSession>,
    collisions: u32,
    steps_taken: u32,
}

impl StepSimulator {
    pub fn new(
        world: &GridWorld,
        policy: Arc<dyn AgentPolicy>,
        negotiator: Arc<dyn Negotiator>,
        settings: SimulatorSettings,
    ) -> Self {
        Self {
            policy,
            negotiator,
            oracle: DistanceOracle::for_world(world),
            settings,
            memories: BTreeMap::new(),
            declared: BTreeMap::new(),
            completed_sessions: Vec::new(),
            collisions: 0,
            steps_taken: 0,
        }
    }

    pub fn steps_taken(&self) -> u32 {
        self.steps_taken
    }

    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    /// Concluded negotiation sessions, for event publication.
    pub fn take_completed_sessions(&mut self) -> Vec<NegotiationSession> {
        std::mem::take(&mut self.completed_sessions)
    }

    /// Run until every agent is retired or `max_steps` is exhausted.
    pub async fn run(&mut self, world: &mut GridWorld) -> DomainResult<RunOutcome> {
        let optimal = self.optimal_baseline(world)?;
        let mut log = Vec::new();

        while world.has_active_agents() && self.steps_taken < self.settings.max_steps {
            let records = self.step(world).await?;
            log.extend(records);
        }

        let failed = world.has_active_agents();
        let metrics = RunMetrics {
            steps: self.steps_taken,
            optimal,
            failed,
            collisions: self.collisions,
        };
        info!(
            steps = metrics.steps,
            optimal = metrics.optimal,
            failed = metrics.failed,
            collisions = metrics.collisions,
            "run finished"
        );
        Ok(RunOutcome { metrics, log })
    }

    /// Execute one discrete timestep: snapshot, consult, resolve goals,
    /// propose moves, resolve collisions, commit, claim.
    pub async fn step(&mut self, world: &mut GridWorld) -> DomainResult<Vec<StepRecord>> {
        let step = self.steps_taken;
        let snapshot = world.active_agents();
        debug!(step, agents = snapshot.len(), "step started");

        // Phase 1: target rankings.
        let rankings = self.consult_rankings(world, &snapshot).await;

        // Phase 2: conflict-free goal decisions per the active strategy.
        let finals = self.decide_goals(world, step, &rankings).await?;

        // Phase 3: direction proposals and tentative targets.
        let mut proposals: Vec<MoveProposal> = Vec::new();
        for (agent_id, pos) in &snapshot {
            let declared = finals.get(agent_id).copied().flatten();
            let observation = self.observation(world, *agent_id, *pos);
            let direction = self.consult_direction(*agent_id, &observation, declared).await;
            let tentative = match direction {
                Some(d) => world.apply_move(*pos, d, Some(*agent_id)),
                None => *pos,
            };
            proposals.push(MoveProposal {
                agent_id: *agent_id,
                before: *pos,
                tentative,
                direction,
            });
        }

        // Phases 4 and 5: same-cell then swap collisions.
        self.collisions += resolve_collisions(&mut proposals);

        // Phase 6: commit.
        let resolved: Vec<(AgentId, Cell)> = proposals
            .iter()
            .map(|p| (p.agent_id, p.tentative))
            .collect();
        world.commit_positions(step, &resolved)?;

        let mut records = Vec::with_capacity(proposals.len());
        for proposal in &proposals {
            if let Some(direction) = proposal.direction {
                let memory = self.memories.entry(proposal.agent_id).or_default();
                memory.recent_moves.push_back(MoveRecord {
                    from: proposal.before,
                    direction,
                    to: proposal.tentative,
                });
                while memory.recent_moves.len() > RECENT_MOVES {
                    memory.recent_moves.pop_front();
                }
            }
            records.push(StepRecord {
                step,
                agent_id: proposal.agent_id,
                position_before: proposal.before,
                position_after: proposal.tentative,
                chosen_direction: proposal.direction,
                declared_goal: finals.get(&proposal.agent_id).copied().flatten(),
            });
        }

        // Remember this step's declared targets for the next observation.
        self.declared = finals
            .iter()
            .filter_map(|(id, goal)| goal.map(|g| (*id, g)))
            .collect();

        // Phase 7: claims retire agents and remove goals atomically.
        for (agent_id, goal) in world.claim_goals(step)? {
            info!(step, agent_id, %goal, "agent reached its goal and retired");
            self.declared.remove(&agent_id);
        }

        self.steps_taken += 1;
        Ok(records)
    }

    async fn consult_rankings(
        &mut self,
        world: &GridWorld,
        snapshot: &[(AgentId, Cell)],
    ) -> BTreeMap<AgentId, Ranking> {
        let live: BTreeSet<GoalLabel> = world.live_goals().into_iter().map(|(g, _)| g).collect();
        let mut rankings = BTreeMap::new();
        for (agent_id, pos) in snapshot {
            let memory = self.memories.entry(*agent_id).or_default();
            *memory.visits.entry(*pos).or_insert(0) += 1;

            let observation = self.observation(world, *agent_id, *pos);
            let ranking = match tokio::time::timeout(
                self.settings.policy_timeout,
                self.policy.select_target(&observation),
            )
            .await
            {
                Ok(Ok(raw)) => sanitize_ranking(&raw, &live),
                Ok(Err(e)) => {
                    warn!(agent_id, error = %e, "target selection failed; no preference this round");
                    Vec::new()
                }
                Err(_) => {
                    warn!(agent_id, "target selection timed out; no preference this round");
                    Vec::new()
                }
            };
            rankings.insert(*agent_id, ranking);
        }
        rankings
    }

    async fn consult_direction(
        &self,
        agent_id: AgentId,
        observation: &Observation,
        declared: Option<GoalLabel>,
    ) -> Option<Direction> {
        match tokio::time::timeout(
            self.settings.policy_timeout,
            self.policy.select_direction(observation, declared),
        )
        .await
        {
            Ok(Ok(direction)) => direction,
            Ok(Err(e)) => {
                warn!(agent_id, error = %e, "direction selection failed; staying put");
                None
            }
            Err(_) => {
                warn!(agent_id, "direction selection timed out; staying put");
                None
            }
        }
    }

    async fn decide_goals(
        &mut self,
        world: &GridWorld,
        step: u32,
        rankings: &BTreeMap<AgentId, Ranking>,
    ) -> DomainResult<BTreeMap<AgentId, Option<GoalLabel>>> {
        match self.settings.strategy {
            ConflictStrategy::GreedyByIdentity => Ok(resolve_conflicts(rankings)),
            ConflictStrategy::Negotiated => self.decide_negotiated(world, step, rankings).await,
            ConflictStrategy::ExactMinimax => {
                let matrix = self.oracle.distance_matrix(world);
                let solution = solve_minimax(&matrix)?;
                Ok(matrix
                    .agents
                    .iter()
                    .enumerate()
                    .map(|(row, id)| (*id, Some(matrix.goals[solution.assignment[row]])))
                    .collect())
            }
        }
    }

    /// Negotiated resolution: the greedy outcome is computed first as the
    /// fallback baseline, then every goal contested by EXACTLY two
    /// top-rank claimants gets a bilateral session. Wider conflicts skip
    /// negotiation by design. Agreements pin both parties to their agreed
    /// goals; a final greedy pass over the adjusted rankings keeps the
    /// whole assignment injective.
    async fn decide_negotiated(
        &mut self,
        world: &GridWorld,
        step: u32,
        rankings: &BTreeMap<AgentId, Ranking>,
    ) -> DomainResult<BTreeMap<AgentId, Option<GoalLabel>>> {
        let baseline = resolve_conflicts(rankings);

        let mut top_claimants: BTreeMap<GoalLabel, Vec<AgentId>> = BTreeMap::new();
        for (agent_id, ranking) in rankings {
            if let Some(top) = ranking.first() {
                top_claimants.entry(*top).or_default().push(*agent_id);
            }
        }

        let mut pinned: BTreeMap<AgentId, Option<GoalLabel>> = BTreeMap::new();
        for (goal, claimants) in top_claimants {
            if claimants.len() != 2 {
                continue;
            }
            let (first, second) = (claimants[0], claimants[1]);
            let session_id = format!("{}-step{}-goal{}", world.id, step, goal);
            let mut session = NegotiationSession::open(
                session_id,
                first,
                second,
                goal,
                &rankings[&first],
                &rankings[&second],
                self.settings.max_negotiation_rounds,
            )?;
            let context = self.negotiation_context(world, &session, rankings);

            match drive_session(&mut session, &context, self.negotiator.as_ref()).await? {
                NegotiationState::Accepted(proposal) => {
                    debug!(%goal, first, second, "negotiation settled the dispute");
                    pinned.insert(first, proposal.goal_for(first));
                    pinned.insert(second, proposal.goal_for(second));
                }
                NegotiationState::NoAgreement => {
                    debug!(%goal, first, second, "no agreement; reverting to greedy outcome");
                    pinned.insert(first, baseline.get(&first).copied().flatten());
                    pinned.insert(second, baseline.get(&second).copied().flatten());
                }
                NegotiationState::Proposing(_) => unreachable!("driven session is terminal"),
            }
            self.completed_sessions.push(session);
        }

        if pinned.is_empty() {
            return Ok(baseline);
        }

        let pinned_goals: BTreeSet<GoalLabel> =
            pinned.values().filter_map(|g| *g).collect();
        let effective: BTreeMap<AgentId, Ranking> = rankings
            .iter()
            .map(|(agent_id, ranking)| {
                let ranking = match pinned.get(agent_id) {
                    Some(goal) => goal.iter().copied().collect(),
                    None => ranking
                        .iter()
                        .filter(|g| !pinned_goals.contains(g))
                        .copied()
                        .collect(),
                };
                (*agent_id, ranking)
            })
            .collect();
        Ok(resolve_conflicts(&effective))
    }

    fn negotiation_context(
        &self,
        world: &GridWorld,
        session: &NegotiationSession,
        rankings: &BTreeMap<AgentId, Ranking>,
    ) -> NegotiationContext {
        let mut distances = BTreeMap::new();
        let mut reduced_rankings = BTreeMap::new();
        for agent_id in [session.initiator, session.responder] {
            let pos = world.agent(agent_id).and_then(|a| a.position);
            let table: Vec<(GoalLabel, u32)> = session
                .allowed_goals
                .iter()
                .map(|goal| {
                    let cell = world
                        .live_goals()
                        .into_iter()
                        .find(|(g, _)| g == goal)
                        .map(|(_, c)| c);
                    let distance = match (pos, cell) {
                        (Some(from), Some(to)) => self.oracle.shortest_path_length(from, to),
                        _ => UNREACHABLE,
                    };
                    (*goal, distance)
                })
                .collect();
            distances.insert(agent_id, table);
            reduced_rankings.insert(
                agent_id,
                rankings
                    .get(&agent_id)
                    .map(|r| r.iter().take(2).copied().collect())
                    .unwrap_or_default(),
            );
        }
        NegotiationContext {
            distances,
            rankings: reduced_rankings,
        }
    }

    fn observation(&self, world: &GridWorld, agent_id: AgentId, position: Cell) -> Observation {
        let memory = self.memories.get(&agent_id);
        Observation {
            agent_id,
            position,
            grid_size: world.size,
            obstacles: world.obstacles.clone(),
            other_agents: world
                .active_agents()
                .into_iter()
                .filter(|(id, _)| *id != agent_id)
                .collect(),
            goals: world.live_goals(),
            recent_moves: memory
                .map(|m| m.recent_moves.iter().copied().collect())
                .unwrap_or_default(),
            visit_counts: memory.map(|m| m.visits.clone()).unwrap_or_default(),
            declared_targets: self.declared.clone(),
        }
    }

    /// Best achievable makespan proxy, computed against the starting
    /// layout: the exact minimax cost when the matrix is square, the
    /// summed nearest-goal distances when the pools are uneven.
    fn optimal_baseline(&self, world: &GridWorld) -> DomainResult<u32> {
        let matrix = self.oracle.distance_matrix(world);
        if matrix.agents.is_empty() {
            return Ok(0);
        }
        if matrix.is_square() {
            Ok(solve_minimax(&matrix)?.cost)
        } else {
            Ok(matrix
                .entries
                .iter()
                .map(|row| row.iter().copied().min().unwrap_or(0))
                .fold(0u32, |acc, d| acc.saturating_add(d)))
        }
    }
}
