//! # cep-io: Scenario Input Readers
//!
//! Constructs the core data model from the boundary tables the ETL layer
//! delivers per scenario: the temporal hierarchy, entity tables with their
//! type-tag assignments, and shared parameter/demand tables.
//!
//! Plugin-specific tables (generation profiles, availability derates) are
//! deliberately NOT read here - each plugin's own data-loading hook owns
//! them (see `cep_model::plugin::ComponentType::load_data`).

pub mod error;
pub mod tables;
pub mod temporal;

pub use error::{ImportError, ImportResult};
pub use tables::{
    load_data_store, load_projects, load_reserve_areas, load_transmission_lines, load_zones,
};
pub use temporal::load_temporal_model;
