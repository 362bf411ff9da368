//! # cep-scenarios: Scenario Specifications
//!
//! Declarative per-scenario configuration: which inputs directory to read,
//! the persisted stage-name ordering that drives commitment pass-through,
//! and solver selection. Specs are YAML or JSON.

pub mod spec;

pub use spec::{
    load_spec_from_path, resolve_scenarios, validate, ResolvedScenario, ScenarioDefaults,
    ScenarioSet, ScenarioSpec,
};
