use kestrel_app::common::{AggregateRoot, AggregateStore, DomainError};
use kestrel_app::domains::grid::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

fn demo_scenario() -> Scenario {
    Scenario {
        size: 6,
        obstacles: vec![Cell::new(2, 2), Cell::new(3, 3), Cell::new(1, 4)],
        agents: vec![Cell::new(0, 0), Cell::new(5, 0)],
        goals: vec![Cell::new(5, 5), Cell::new(0, 5)],
    }
}

#[cfg(test)]
mod construction_tests {
    use super::*;

    #[test]
    fn test_world_creation_from_scenario() {
        let world = GridWorld::from_scenario("world-1".to_string(), &demo_scenario()).unwrap();

        assert_eq!(world.id, "world-1");
        assert_eq!(world.size, 6);
        assert_eq!(world.version, 0);
        assert_eq!(world.agents.len(), 2);
        assert_eq!(world.goals.len(), 2);
        assert_eq!(world.agents[0].id, 1);
        assert_eq!(world.agents[1].id, 2);
        assert_eq!(world.goals[0].label, GoalLabel('A'));
        assert_eq!(world.goals[1].label, GoalLabel('B'));

        // Should have one uncommitted event (WorldInitialized)
        assert_eq!(world.uncommitted_events().len(), 1);
        match &world.uncommitted_events()[0] {
            GridEvent::WorldInitialized { world_id, size, .. } => {
                assert_eq!(world_id, "world-1");
                assert_eq!(*size, 6);
            }
            _ => panic!("Expected WorldInitialized event"),
        }
    }

    #[test]
    fn test_out_of_bounds_agent_is_rejected() {
        let mut scenario = demo_scenario();
        scenario.agents[0] = Cell::new(6, 0);

        let result = GridWorld::from_scenario("world-1".to_string(), &scenario);
        assert!(result.is_err());
        match result.unwrap_err() {
            DomainError::InvalidScenario { reason } => {
                assert!(reason.contains("outside the 6x6 grid"));
            }
            _ => panic!("Expected InvalidScenario error"),
        }
    }

    #[test]
    fn test_agent_on_obstacle_is_rejected() {
        let mut scenario = demo_scenario();
        scenario.agents[0] = Cell::new(2, 2);

        let result = GridWorld::from_scenario("world-1".to_string(), &scenario);
        assert!(matches!(
            result.unwrap_err(),
            DomainError::InvalidScenario { .. }
        ));
    }

    #[test]
    fn test_overlapping_start_cells_are_rejected() {
        let mut scenario = demo_scenario();
        scenario.goals[0] = scenario.agents[1];

        let result = GridWorld::from_scenario("world-1".to_string(), &scenario);
        assert!(matches!(
            result.unwrap_err(),
            DomainError::InvalidScenario { .. }
        ));
    }

    #[test]
    fn test_goal_pool_may_differ_from_agent_count() {
        let mut scenario = demo_scenario();
        scenario.goals.push(Cell::new(3, 5));

        let world = GridWorld::from_scenario("world-1".to_string(), &scenario).unwrap();
        assert_eq!(world.agents.len(), 2);
        assert_eq!(world.goals.len(), 3);
        assert_eq!(world.goals[2].label, GoalLabel('C'));
    }

    #[test]
    fn test_random_layout_places_distinct_free_cells() {
        let mut rng = StdRng::seed_from_u64(7);
        let obstacles: BTreeSet<Cell> = [Cell::new(1, 1), Cell::new(2, 2)].into_iter().collect();
        let world = GridWorld::with_random_layout(
            "world-rng".to_string(),
            5,
            obstacles.clone(),
            3,
            3,
            &mut rng,
        )
        .unwrap();

        let mut placed = BTreeSet::new();
        for slot in &world.agents {
            let cell = slot.position.unwrap();
            assert!(cell.row < 5 && cell.col < 5);
            assert!(!obstacles.contains(&cell));
            assert!(placed.insert(cell));
        }
        for slot in &world.goals {
            let cell = slot.position.unwrap();
            assert!(!obstacles.contains(&cell));
            assert!(placed.insert(cell));
        }
    }
}

#[cfg(test)]
mod validity_tests {
    use super::*;

    #[test]
    fn test_static_and_dynamic_validity_are_separate() {
        let world = GridWorld::from_scenario("world-1".to_string(), &demo_scenario()).unwrap();

        // A fixed obstacle is static, not an occupancy matter
        assert!(world.is_obstacle(Cell::new(2, 2)));
        assert!(!world.is_occupied(Cell::new(2, 2), None));

        // An agent's cell is occupied but never an obstacle
        assert!(!world.is_obstacle(Cell::new(0, 0)));
        assert!(world.is_occupied(Cell::new(0, 0), None));
        assert!(!world.is_occupied(Cell::new(0, 0), Some(1)));

        // Out of bounds counts as statically blocked
        assert!(world.is_obstacle(Cell::new(6, 0)));
    }

    #[test]
    fn test_valid_moves_exclude_blocked_targets() {
        // Agent 1 sits at (0, 0): down and left leave the board
        let world = GridWorld::from_scenario("world-1".to_string(), &demo_scenario()).unwrap();
        let moves = world.valid_moves(Cell::new(0, 0), Some(1));
        assert!(moves.contains(&Direction::Up));
        assert!(moves.contains(&Direction::Right));
        assert!(!moves.contains(&Direction::Down));
        assert!(!moves.contains(&Direction::Left));
    }

    #[test]
    fn test_valid_moves_exclude_occupied_cells() {
        let scenario = Scenario {
            size: 4,
            obstacles: vec![],
            agents: vec![Cell::new(1, 1), Cell::new(1, 2)],
            goals: vec![Cell::new(3, 3), Cell::new(3, 0)],
        };
        let world = GridWorld::from_scenario("world-1".to_string(), &scenario).unwrap();

        let moves = world.valid_moves(Cell::new(1, 1), Some(1));
        assert!(!moves.contains(&Direction::Right));
        assert!(moves.contains(&Direction::Up));
    }

    #[test]
    fn test_apply_move_is_a_silent_noop_when_illegal() {
        let world = GridWorld::from_scenario("world-1".to_string(), &demo_scenario()).unwrap();

        // Off the board
        assert_eq!(
            world.apply_move(Cell::new(0, 0), Direction::Down, Some(1)),
            Cell::new(0, 0)
        );
        // Into an obstacle
        assert_eq!(
            world.apply_move(Cell::new(2, 1), Direction::Right, Some(1)),
            Cell::new(2, 1)
        );
        // Onto another agent (agent 2 sits at (5, 0))
        assert_eq!(
            world.apply_move(Cell::new(4, 0), Direction::Up, Some(1)),
            Cell::new(4, 0)
        );
        // A legal move goes through
        assert_eq!(
            world.apply_move(Cell::new(0, 0), Direction::Up, Some(1)),
            Cell::new(1, 0)
        );
    }
}

#[cfg(test)]
mod commit_and_claim_tests {
    use super::*;

    #[test]
    fn test_commit_updates_positions_and_emits_event() {
        let mut world = GridWorld::from_scenario("world-1".to_string(), &demo_scenario()).unwrap();

        world
            .commit_positions(0, &[(1, Cell::new(1, 0)), (2, Cell::new(4, 0))])
            .unwrap();

        assert_eq!(world.agent(1).unwrap().position, Some(Cell::new(1, 0)));
        assert_eq!(world.agent(2).unwrap().position, Some(Cell::new(4, 0)));
        assert_eq!(world.version, 1);

        assert_eq!(world.uncommitted_events().len(), 2);
        match &world.uncommitted_events()[1] {
            GridEvent::PositionsCommitted { step, moves, .. } => {
                assert_eq!(*step, 0);
                assert_eq!(moves.len(), 2);
            }
            _ => panic!("Expected PositionsCommitted event"),
        }
    }

    #[test]
    fn test_commit_rejects_shared_target_cell() {
        let mut world = GridWorld::from_scenario("world-1".to_string(), &demo_scenario()).unwrap();

        let result = world.commit_positions(0, &[(1, Cell::new(1, 0)), (2, Cell::new(1, 0))]);
        assert!(matches!(
            result.unwrap_err(),
            DomainError::InvalidCommand { .. }
        ));
    }

    #[test]
    fn test_claim_retires_agent_and_removes_goal_exactly_once() {
        let scenario = Scenario {
            size: 4,
            obstacles: vec![],
            agents: vec![Cell::new(0, 0)],
            goals: vec![Cell::new(0, 1)],
        };
        let mut world = GridWorld::from_scenario("world-1".to_string(), &scenario).unwrap();

        world.commit_positions(0, &[(1, Cell::new(0, 1))]).unwrap();
        let claims = world.claim_goals(0).unwrap();

        assert_eq!(claims, vec![(1, GoalLabel('A'))]);
        assert_eq!(world.agent(1).unwrap().position, None);
        assert!(world.live_goals().is_empty());
        assert!(!world.has_active_agents());

        // The goal never reappears and the retired agent never claims again
        let again = world.claim_goals(1).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_event_replay_reconstructs_the_world() {
        let scenario = Scenario {
            size: 4,
            obstacles: vec![Cell::new(2, 1)],
            agents: vec![Cell::new(0, 0)],
            goals: vec![Cell::new(0, 2)],
        };
        let mut world = GridWorld::from_scenario("world-replay".to_string(), &scenario).unwrap();
        world.commit_positions(0, &[(1, Cell::new(0, 1))]).unwrap();
        world.commit_positions(1, &[(1, Cell::new(0, 2))]).unwrap();
        world.claim_goals(1).unwrap();

        let history = world.uncommitted_events().to_vec();
        let replayed = AggregateStore::load_from_history(
            GridWorld::empty("world-replay".to_string()),
            history,
        )
        .unwrap();

        assert_eq!(replayed.aggregate.size, world.size);
        assert_eq!(replayed.aggregate.obstacles, world.obstacles);
        assert_eq!(replayed.aggregate.agent(1).unwrap().position, None);
        assert!(replayed.aggregate.live_goals().is_empty());
    }
}
