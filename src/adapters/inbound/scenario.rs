use crate::common::{DomainError, DomainResult};
use crate::domains::grid::types::Cell;
use crate::domains::grid::world::Scenario;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// On-disk scenario syntax: cells written as two-element arrays.
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    size: usize,
    #[serde(default)]
    obstacles: Vec<[usize; 2]>,
    agents: Vec<[usize; 2]>,
    goals: Vec<[usize; 2]>,
}

fn cells(raw: &[[usize; 2]]) -> Vec<Cell> {
    raw.iter().map(|[row, col]| Cell::new(*row, *col)).collect()
}

/// Loads TOML scenario descriptors from a data directory.
/// Precedence: KESTREL_SCENARIO_DIR env var -> ./resources/scenarios.
/// Layout validation stays with `GridWorld::from_scenario`; this adapter
/// only handles file syntax.
pub struct ScenarioLoader {
    base: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base: Option<PathBuf>) -> Self {
        let base = base.unwrap_or_else(|| {
            if let Ok(v) = env::var("KESTREL_SCENARIO_DIR") {
                PathBuf::from(v)
            } else {
                Path::new("resources/scenarios").to_path_buf()
            }
        });
        Self { base }
    }

    pub async fn load(&self, name: &str) -> DomainResult<Scenario> {
        let path = self.base.join(name);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            DomainError::InfrastructureError(format!(
                "Failed to read scenario {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: ScenarioFile = toml::from_str(&content).map_err(|e| {
            DomainError::InvalidScenario {
                reason: format!("Failed to parse scenario {}: {}", path.display(), e),
            }
        })?;

        Ok(Scenario {
            size: file.size,
            obstacles: cells(&file.obstacles),
            agents: cells(&file.agents),
            goals: cells(&file.goals),
        })
    }
}
