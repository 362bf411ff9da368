use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use cep_core::StageOrder;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub version: Option<u32>,
    #[serde(default)]
    pub defaults: ScenarioDefaults,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefaults {
    /// Stage names in solve order; drives final-commitment comparisons
    #[serde(default)]
    pub stages: Vec<String>,
    #[serde(default = "default_solver")]
    pub solver: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_solver() -> String {
    "cbc".to_string()
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            solver: default_solver(),
            tags: Vec::new(),
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub scenario_id: String,
    pub description: Option<String>,
    /// Directory of boundary tables for this scenario
    pub inputs_dir: Option<String>,
    #[serde(default)]
    pub stages: Option<Vec<String>>,
    pub solver: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub scenario_id: String,
    pub description: Option<String>,
    pub inputs_dir: String,
    pub stages: Vec<String>,
    pub solver: String,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl ResolvedScenario {
    /// The stage total order for commitment pass-through.
    pub fn stage_order(&self) -> Result<StageOrder> {
        StageOrder::from_names(self.stages.clone())
            .map_err(|e| anyhow!("scenario '{}': {}", self.scenario_id, e))
    }
}

pub fn load_spec_from_path(path: &Path) -> Result<ScenarioSet> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario spec"),
    }
}

pub fn resolve_scenarios(set: &ScenarioSet) -> Result<Vec<ResolvedScenario>> {
    if set.scenarios.is_empty() {
        return Err(anyhow!("scenario set contains no scenarios"));
    }
    let defaults = set.defaults.clone();
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(set.scenarios.len());
    for scenario in &set.scenarios {
        if scenario.scenario_id.trim().is_empty() {
            return Err(anyhow!("scenario_id cannot be empty"));
        }
        if !seen.insert(scenario.scenario_id.clone()) {
            return Err(anyhow!(
                "duplicate scenario_id '{}' in spec",
                scenario.scenario_id
            ));
        }
        let stages = scenario
            .stages
            .as_ref()
            .cloned()
            .unwrap_or_else(|| defaults.stages.clone());
        if stages.is_empty() {
            return Err(anyhow!(
                "scenario '{}' must declare at least one stage",
                scenario.scenario_id
            ));
        }
        let inputs_dir = scenario
            .inputs_dir
            .clone()
            .ok_or_else(|| anyhow!("scenario '{}' must declare inputs_dir", scenario.scenario_id))?;
        let tags = scenario
            .tags
            .as_ref()
            .cloned()
            .unwrap_or_else(|| defaults.tags.clone());
        let metadata = scenario
            .metadata
            .as_ref()
            .cloned()
            .unwrap_or_else(|| defaults.metadata.clone());
        resolved.push(ResolvedScenario {
            scenario_id: scenario.scenario_id.clone(),
            description: scenario.description.clone(),
            inputs_dir,
            stages,
            solver: scenario.solver.clone().unwrap_or(defaults.solver.clone()),
            tags,
            metadata,
        });
    }
    Ok(resolved)
}

pub fn validate(set: &ScenarioSet) -> Result<()> {
    let resolved = resolve_scenarios(set)?;
    for scenario in &resolved {
        scenario.stage_order()?;
    }
    Ok(())
}
