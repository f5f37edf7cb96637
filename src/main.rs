use kestrel_app::Config;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info};

use kestrel_app::adapters::inbound::file_event_store::FileEventStore;
use kestrel_app::adapters::inbound::scenario::ScenarioLoader;
use kestrel_app::adapters::outbound::loggers::init_combined_logger;
use kestrel_app::adapters::outbound::negotiators::DistanceMinimaxNegotiator;
use kestrel_app::adapters::outbound::policies::BfsGreedyPolicy;
use kestrel_app::application::{AssignmentService, SimulationService};
use kestrel_app::domains::grid::{Cell, GridProjection, GridWorld, Scenario};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Kestrel App");

    // Load configuration; a missing file falls back to defaults
    let config = match Config::from_file("config.toml").await {
        Ok(config) => config,
        Err(e) => {
            info!("No config.toml ({}); using defaults", e);
            Config::default()
        }
    };

    info!("Strategy: {:?}", config.simulation.strategy);
    info!("Event store directory: {}", config.event_store.directory);

    // Try a scenario from disk, falling back to the built-in demo board
    let loader = ScenarioLoader::new(None);
    let scenario = match loader.load("demo.toml").await {
        Ok(scenario) => scenario,
        Err(e) => {
            info!("No demo scenario on disk ({}); using built-in board", e);
            Scenario {
                size: 6,
                obstacles: vec![Cell::new(2, 2), Cell::new(3, 3), Cell::new(1, 4)],
                agents: vec![Cell::new(0, 0), Cell::new(5, 0)],
                goals: vec![Cell::new(5, 5), Cell::new(0, 5)],
            }
        }
    };

    let event_store = Arc::new(FileEventStore::new(config.event_store.directory.clone()));
    let policy = Arc::new(BfsGreedyPolicy::new(
        scenario.size,
        &scenario.obstacles.iter().copied().collect(),
    ));
    let negotiator = Arc::new(DistanceMinimaxNegotiator);
    let logger = match &config.logging.file {
        Some(path) => init_combined_logger(path),
        None => kestrel_app::adapters::outbound::loggers::init_console_logger(),
    };

    let service = SimulationService::new(event_store, policy, negotiator, logger);

    // Report the exact-optimum baseline when the board admits one
    if scenario.agents.len() == scenario.goals.len() {
        let world = GridWorld::from_scenario("baseline".to_string(), &scenario)?;
        let (assignment, cost) = AssignmentService::optimal_assignment(&world)?;
        info!("Optimal assignment (cost {}): {:?}", cost, assignment);
        info!("Board: {:?}", GridProjection::from_world(&world));
    }

    match service
        .run_scenario("demo-run", &scenario, config.simulator_settings())
        .await
    {
        Ok(outcome) => {
            info!(
                "Run complete: steps={} optimal={} collisions={} failed={}",
                outcome.metrics.steps,
                outcome.metrics.optimal,
                outcome.metrics.collisions,
                outcome.metrics.failed
            );
        }
        Err(e) => error!("Run failed: {}", e),
    }

    info!("Shutting down Kestrel App");
    Ok(())
}
