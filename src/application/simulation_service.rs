// Simulation service - wires the step loop to its collaborators
use crate::common::aggregate::AggregateRoot;
use crate::common::{ApplicationError, ApplicationResult, EventEnvelope, EventMetadata, EventStore};
use crate::domains::grid::world::{GridWorld, Scenario};
use crate::domains::logger::DynLogger;
use crate::domains::negotiation::ports::Negotiator;
use crate::domains::simulation::ports::AgentPolicy;
use crate::domains::simulation::projections::RunOutcome;
use crate::domains::simulation::simulator::{SimulatorSettings, StepSimulator};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub struct SimulationService {
    event_store: Arc<dyn EventStore>,
    policy: Arc<dyn AgentPolicy>,
    negotiator: Arc<dyn Negotiator>,
    logger: DynLogger,
}

impl SimulationService {
    pub fn new(
        event_store: Arc<dyn EventStore>,
        policy: Arc<dyn AgentPolicy>,
        negotiator: Arc<dyn Negotiator>,
        logger: DynLogger,
    ) -> Self {
        Self {
            event_store,
            policy,
            negotiator,
            logger,
        }
    }

    /// Run one full episode over the given scenario, persisting all
    /// emitted domain events under the run id.
    pub async fn run_scenario(
        &self,
        run_id: &str,
        scenario: &Scenario,
        settings: SimulatorSettings,
    ) -> ApplicationResult<RunOutcome> {
        let mut world = GridWorld::from_scenario(run_id.to_string(), scenario)?;
        let appended = self.publish(&mut world, "GridWorld", 0).await?;

        info!(run_id, agents = world.agents.len(), goals = world.goals.len(), "starting run");

        let mut simulator = StepSimulator::new(
            &world,
            self.policy.clone(),
            self.negotiator.clone(),
            settings,
        );
        let outcome = simulator.run(&mut world).await?;

        self.publish(&mut world, "GridWorld", appended).await?;
        for mut session in simulator.take_completed_sessions() {
            self.publish(&mut session, "NegotiationSession", 0).await?;
        }

        self.logger.info(&format!(
            "run {} finished: steps={} optimal={} collisions={} failed={}",
            run_id,
            outcome.metrics.steps,
            outcome.metrics.optimal,
            outcome.metrics.collisions,
            outcome.metrics.failed
        ));
        Ok(outcome)
    }

    /// Drain an aggregate's uncommitted events into the store. Returns
    /// the aggregate's new persisted event count for version tracking.
    async fn publish<T>(
        &self,
        aggregate: &mut T,
        aggregate_type: &str,
        already_appended: u64,
    ) -> ApplicationResult<u64>
    where
        T: AggregateRoot,
        T::Event: Serialize,
    {
        let events = aggregate.uncommitted_events();
        if events.is_empty() {
            return Ok(already_appended);
        }

        let metadata = EventMetadata {
            correlation_id: None,
            causation_id: None,
            source: "simulation-service".to_string(),
        };
        let mut envelopes = Vec::with_capacity(events.len());
        for event in events {
            let envelope = EventEnvelope::new(event, aggregate_type, metadata.clone())
                .map_err(|e| ApplicationError::EventStore(e.to_string()))?;
            envelopes.push(envelope);
        }

        let count = envelopes.len() as u64;
        self.event_store
            .append_events(aggregate.aggregate_id(), already_appended, envelopes)
            .await
            .map_err(ApplicationError::EventStore)?;
        aggregate.mark_events_as_committed();
        Ok(already_appended + count)
    }
}
