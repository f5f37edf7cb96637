use crate::domains::assignment::strategy::ConflictStrategy;
use crate::domains::simulation::simulator::SimulatorSettings;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub negotiation: NegotiationConfig,
    pub logging: LoggingConfig,
    pub event_store: EventStoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub max_steps: u32,
    pub policy_timeout_ms: u64,
    pub strategy: ConflictStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationConfig {
    pub max_rounds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStoreConfig {
    pub directory: String,
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            max_steps: self.simulation.max_steps,
            policy_timeout: Duration::from_millis(self.simulation.policy_timeout_ms),
            max_negotiation_rounds: self.negotiation.max_rounds,
            strategy: self.simulation.strategy,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig {
                max_steps: 30,
                policy_timeout_ms: 5000,
                strategy: ConflictStrategy::GreedyByIdentity,
            },
            negotiation: NegotiationConfig { max_rounds: 4 },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
            },
            event_store: EventStoreConfig {
                directory: "data/events".to_string(),
            },
        }
    }
}
