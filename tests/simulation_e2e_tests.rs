use async_trait::async_trait;
use kestrel_app::adapters::inbound::event_store::InMemoryEventStore;
use kestrel_app::adapters::outbound::loggers::init_noop_logger;
use kestrel_app::adapters::outbound::negotiators::DistanceMinimaxNegotiator;
use kestrel_app::adapters::outbound::policies::{BfsGreedyPolicy, ManhattanPolicy};
use kestrel_app::application::{AssignmentService, SimulationService};
use kestrel_app::common::{DomainResult, EventStore};
use kestrel_app::domains::assignment::{ConflictStrategy, Ranking};
use kestrel_app::domains::grid::*;
use kestrel_app::domains::negotiation::NegotiationState;
use kestrel_app::domains::simulation::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn settings(strategy: ConflictStrategy, max_steps: u32) -> SimulatorSettings {
    SimulatorSettings {
        max_steps,
        policy_timeout: Duration::from_secs(1),
        max_negotiation_rounds: 4,
        strategy,
    }
}

fn simulator(
    world: &GridWorld,
    policy: Arc<dyn AgentPolicy>,
    strategy: ConflictStrategy,
    max_steps: u32,
) -> StepSimulator {
    StepSimulator::new(
        world,
        policy,
        Arc::new(DistanceMinimaxNegotiator),
        settings(strategy, max_steps),
    )
}

/// Always moves as scripted, never ranks anything.
struct ScriptedPolicy {
    moves: BTreeMap<AgentId, Direction>,
}

#[async_trait]
impl AgentPolicy for ScriptedPolicy {
    async fn select_target(&self, _observation: &Observation) -> DomainResult<Ranking> {
        Ok(Vec::new())
    }

    async fn select_direction(
        &self,
        observation: &Observation,
        _declared_goal: Option<GoalLabel>,
    ) -> DomainResult<Option<Direction>> {
        Ok(self.moves.get(&observation.agent_id).copied())
    }
}

/// Answers too late for any sane timeout.
struct StalledPolicy;

#[async_trait]
impl AgentPolicy for StalledPolicy {
    async fn select_target(&self, _observation: &Observation) -> DomainResult<Ranking> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Vec::new())
    }

    async fn select_direction(
        &self,
        _observation: &Observation,
        _declared_goal: Option<GoalLabel>,
    ) -> DomainResult<Option<Direction>> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Some(Direction::Up))
    }
}

#[tokio::test]
async fn test_single_agent_finishes_the_reference_board_in_ten_steps() {
    let scenario = Scenario {
        size: 6,
        obstacles: vec![Cell::new(2, 2), Cell::new(3, 3), Cell::new(1, 4)],
        agents: vec![Cell::new(0, 0)],
        goals: vec![Cell::new(5, 5)],
    };
    let mut world = GridWorld::from_scenario("run-manhattan".to_string(), &scenario).unwrap();
    let mut sim = simulator(
        &world,
        Arc::new(ManhattanPolicy),
        ConflictStrategy::GreedyByIdentity,
        30,
    );

    let outcome = sim.run(&mut world).await.unwrap();

    assert_eq!(outcome.metrics.steps, 10);
    assert!(!outcome.metrics.failed);
    assert_eq!(outcome.metrics.collisions, 0);
    assert_eq!(outcome.metrics.optimal, 10);
    assert!(!world.has_active_agents());
    assert!(world.live_goals().is_empty());

    // The step log covers the full walk
    assert_eq!(outcome.log.len(), 10);
    assert_eq!(outcome.log[0].position_before, Cell::new(0, 0));
    assert_eq!(outcome.log[9].position_after, Cell::new(5, 5));
    assert!(outcome
        .log
        .iter()
        .all(|r| r.declared_goal == Some(GoalLabel('A'))));
}

#[tokio::test]
async fn test_leftover_agent_without_a_goal_fails_at_max_steps() {
    // One goal, two agents: the loser's ranking is exhausted and it
    // never moves again.
    let scenario = Scenario {
        size: 4,
        obstacles: vec![],
        agents: vec![Cell::new(0, 0), Cell::new(0, 3)],
        goals: vec![Cell::new(3, 1)],
    };
    let obstacles = scenario.obstacles.iter().copied().collect();
    let mut world = GridWorld::from_scenario("run-leftover".to_string(), &scenario).unwrap();
    let mut sim = simulator(
        &world,
        Arc::new(BfsGreedyPolicy::new(4, &obstacles)),
        ConflictStrategy::GreedyByIdentity,
        10,
    );

    let outcome = sim.run(&mut world).await.unwrap();

    assert!(outcome.metrics.failed);
    assert_eq!(outcome.metrics.steps, 10);
    assert_eq!(world.agent(1).unwrap().position, None);
    assert_eq!(world.agent(2).unwrap().position, Some(Cell::new(0, 3)));
    assert!(world.live_goals().is_empty());
}

#[tokio::test]
async fn test_committed_steps_never_share_cells_or_sit_on_obstacles() {
    let scenario = Scenario {
        size: 5,
        obstacles: vec![Cell::new(2, 2), Cell::new(1, 3)],
        agents: vec![Cell::new(0, 0), Cell::new(0, 4), Cell::new(4, 0)],
        goals: vec![Cell::new(4, 4), Cell::new(2, 0), Cell::new(0, 2)],
    };
    let obstacles: std::collections::BTreeSet<Cell> =
        scenario.obstacles.iter().copied().collect();
    let mut world = GridWorld::from_scenario("run-invariants".to_string(), &scenario).unwrap();
    let mut sim = simulator(
        &world,
        Arc::new(BfsGreedyPolicy::new(5, &obstacles)),
        ConflictStrategy::GreedyByIdentity,
        20,
    );

    let mut guard = 0;
    while world.has_active_agents() && guard < 20 {
        sim.step(&mut world).await.unwrap();
        let positions: Vec<Cell> = world.active_agents().iter().map(|(_, p)| *p).collect();
        for (i, a) in positions.iter().enumerate() {
            assert!(!world.obstacles.contains(a), "agent parked on an obstacle");
            for b in positions.iter().skip(i + 1) {
                assert_ne!(a, b, "two agents share a cell");
            }
        }
        guard += 1;
    }
    assert!(!world.has_active_agents(), "run should finish on this board");
}

#[tokio::test]
async fn test_same_cell_conflict_reverts_the_higher_index_agent() {
    let scenario = Scenario {
        size: 3,
        obstacles: vec![],
        agents: vec![Cell::new(0, 0), Cell::new(0, 2)],
        goals: vec![Cell::new(2, 0), Cell::new(2, 2)],
    };
    let mut world = GridWorld::from_scenario("run-collision".to_string(), &scenario).unwrap();
    let policy = ScriptedPolicy {
        moves: [(1, Direction::Right), (2, Direction::Left)]
            .into_iter()
            .collect(),
    };
    let mut sim = simulator(
        &world,
        Arc::new(policy),
        ConflictStrategy::GreedyByIdentity,
        5,
    );

    sim.step(&mut world).await.unwrap();

    assert_eq!(world.agent(1).unwrap().position, Some(Cell::new(0, 1)));
    assert_eq!(world.agent(2).unwrap().position, Some(Cell::new(0, 2)));
    assert_eq!(sim.collisions(), 1);
}

#[test]
fn test_head_on_swaps_revert_both_agents() {
    let mut proposals = vec![
        MoveProposal {
            agent_id: 1,
            before: Cell::new(1, 0),
            tentative: Cell::new(1, 1),
            direction: Some(Direction::Right),
        },
        MoveProposal {
            agent_id: 2,
            before: Cell::new(1, 1),
            tentative: Cell::new(1, 0),
            direction: Some(Direction::Left),
        },
    ];

    let collisions = resolve_collisions(&mut proposals);

    assert_eq!(collisions, 1);
    assert_eq!(proposals[0].tentative, Cell::new(1, 0));
    assert_eq!(proposals[1].tentative, Cell::new(1, 1));
}

#[tokio::test]
async fn test_stalled_policy_degrades_to_staying_put() {
    let scenario = Scenario {
        size: 4,
        obstacles: vec![],
        agents: vec![Cell::new(1, 1)],
        goals: vec![Cell::new(3, 3)],
    };
    let mut world = GridWorld::from_scenario("run-stalled".to_string(), &scenario).unwrap();
    let mut sim = StepSimulator::new(
        &world,
        Arc::new(StalledPolicy),
        Arc::new(DistanceMinimaxNegotiator),
        SimulatorSettings {
            max_steps: 2,
            policy_timeout: Duration::from_millis(20),
            max_negotiation_rounds: 4,
            strategy: ConflictStrategy::GreedyByIdentity,
        },
    );

    let outcome = sim.run(&mut world).await.unwrap();

    assert!(outcome.metrics.failed);
    assert_eq!(world.agent(1).unwrap().position, Some(Cell::new(1, 1)));
    assert!(outcome.log.iter().all(|r| r.chosen_direction.is_none()));
}

#[tokio::test]
async fn test_negotiation_beats_identity_priority_on_a_contested_goal() {
    let scenario = Scenario {
        size: 5,
        obstacles: vec![],
        agents: vec![Cell::new(0, 0), Cell::new(0, 1)],
        goals: vec![Cell::new(0, 3), Cell::new(4, 0)],
    };
    let obstacles = scenario.obstacles.iter().copied().collect();

    let mut negotiated_world =
        GridWorld::from_scenario("run-negotiated".to_string(), &scenario).unwrap();
    let mut negotiated_sim = simulator(
        &negotiated_world,
        Arc::new(BfsGreedyPolicy::new(5, &obstacles)),
        ConflictStrategy::Negotiated,
        20,
    );
    let negotiated = negotiated_sim.run(&mut negotiated_world).await.unwrap();

    let mut greedy_world = GridWorld::from_scenario("run-greedy".to_string(), &scenario).unwrap();
    let mut greedy_sim = simulator(
        &greedy_world,
        Arc::new(BfsGreedyPolicy::new(5, &obstacles)),
        ConflictStrategy::GreedyByIdentity,
        20,
    );
    let greedy = greedy_sim.run(&mut greedy_world).await.unwrap();

    assert!(!negotiated.metrics.failed);
    assert!(!greedy.metrics.failed);
    assert!(negotiated.metrics.steps <= greedy.metrics.steps);

    // Both agents ranked goal A first; the session must have concluded
    // with an agreement that splits the pair.
    let sessions = negotiated_sim.take_completed_sessions();
    assert_eq!(sessions.len(), 1);
    match sessions[0].outcome() {
        NegotiationState::Accepted(agreement) => {
            assert!(agreement.goals_differ());
        }
        other => panic!("Expected an agreement, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exact_minimax_strategy_walks_the_optimal_assignment() {
    let scenario = Scenario {
        size: 5,
        obstacles: vec![],
        agents: vec![Cell::new(0, 0), Cell::new(4, 4)],
        goals: vec![Cell::new(0, 4), Cell::new(4, 0)],
    };
    let obstacles = scenario.obstacles.iter().copied().collect();
    let mut world = GridWorld::from_scenario("run-minimax".to_string(), &scenario).unwrap();
    let mut sim = simulator(
        &world,
        Arc::new(BfsGreedyPolicy::new(5, &obstacles)),
        ConflictStrategy::ExactMinimax,
        20,
    );

    let baseline = GridWorld::from_scenario("baseline".to_string(), &scenario).unwrap();
    let (_, cost) = AssignmentService::optimal_assignment(&baseline).unwrap();
    assert_eq!(cost, 4);

    let outcome = sim.run(&mut world).await.unwrap();

    assert!(!outcome.metrics.failed);
    assert_eq!(outcome.metrics.optimal, cost);
    assert_eq!(outcome.metrics.steps, 4);
    assert_eq!(outcome.metrics.collisions, 0);
}

#[tokio::test]
async fn test_exact_minimax_requires_matching_counts() {
    let scenario = Scenario {
        size: 4,
        obstacles: vec![],
        agents: vec![Cell::new(0, 0), Cell::new(3, 3)],
        goals: vec![Cell::new(0, 3)],
    };
    let obstacles = scenario.obstacles.iter().copied().collect();
    let mut world = GridWorld::from_scenario("run-mismatch".to_string(), &scenario).unwrap();
    let mut sim = simulator(
        &world,
        Arc::new(BfsGreedyPolicy::new(4, &obstacles)),
        ConflictStrategy::ExactMinimax,
        5,
    );

    assert!(sim.run(&mut world).await.is_err());
}

#[tokio::test]
async fn test_service_persists_the_run_event_stream() {
    let scenario = Scenario {
        size: 6,
        obstacles: vec![Cell::new(2, 2), Cell::new(3, 3), Cell::new(1, 4)],
        agents: vec![Cell::new(0, 0)],
        goals: vec![Cell::new(5, 5)],
    };
    let event_store = Arc::new(InMemoryEventStore::new());
    let service = SimulationService::new(
        event_store.clone(),
        Arc::new(ManhattanPolicy),
        Arc::new(DistanceMinimaxNegotiator),
        init_noop_logger(),
    );

    let outcome = service
        .run_scenario(
            "run-service",
            &scenario,
            settings(ConflictStrategy::GreedyByIdentity, 30),
        )
        .await
        .unwrap();
    assert!(!outcome.metrics.failed);

    let events = event_store.load_events("run-service", 0).await.unwrap();
    assert!(!events.is_empty());
    assert_eq!(events[0].event_type, "WorldInitialized");
    assert!(events.iter().any(|e| e.event_type == "GoalClaimed"));
    assert!(events.iter().any(|e| e.event_type == "AgentRetired"));
}
