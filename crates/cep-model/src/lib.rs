//! # cep-model: Model Composition Engine
//!
//! Assembles a capacity-expansion and dispatch optimization problem from
//! independently pluggable component-type modules.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  STAGE MODEL BUILD (strictly ordered, single-threaded)               │
//! │  ──────────────────────────────────────────────────────              │
//! │                                                                      │
//! │  1. Load registries   tag → Box<dyn …Type> per capability family     │
//! │  2. Register phase    every entity's build-components hook runs;     │
//! │                       plugins add variables/constraints and register │
//! │                       their collections with the accumulator         │
//! │  3. Finalize          accumulator unions/sums collections into       │
//! │                       model-wide aggregates (order-independent)      │
//! │  4. System assembly   load balance, reserves, reserve margin,        │
//! │                       objective - all from finalized aggregates      │
//! │  5. Hand off          ModelProblem → external Solver (opaque call)   │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Capability contracts
//!
//! Each plugin family is a trait ([`plugin::CapacityType`],
//! [`plugin::OperationalType`], …). Required rules are verified against
//! [`plugin::ComponentType::provided_rules`] when the registry loads;
//! optional lifecycle hooks default to no-ops. Dispatch through a
//! [`registry::Registry`] is pure resolution - invoking a hook through it
//! is identical to calling the implementation directly.
//!
//! ## Two-phase accumulator
//!
//! [`components::RegisteringComponents`] can only be converted once into
//! [`components::FinalizedComponents`]; the dynamic access path
//! ([`context::BuildCtx::aggregates`]) returns a `PrematureFinalization`
//! error while registration is still open.

pub mod build;
pub mod components;
pub mod context;
pub mod data;
pub mod dispatch;
pub mod plugin;
pub mod plugins;
pub mod problem;
pub mod registry;
pub mod solution;

pub use build::{build_stage_model, load_registries, StageInputs, StageModel, StageRegistries};
pub use components::{
    ComponentKey, ComponentKind, ComponentStore, ExprIndex, FinalizedComponents,
    RegisteringComponents, SetMember,
};
pub use context::BuildCtx;
pub use data::{DataStore, ProjectParams};
pub use dispatch::{dispatch, Tagged};
pub use plugin::{
    contract, AvailabilityType, CapacityType, ComponentType, EntityRef, ExportView,
    OperationalType, ReliabilityType, ReserveType, ResultRow, TxOperationalType,
};
pub use problem::{
    ConstraintDef, ConstraintSense, LinearExpr, ModelBuilder, ModelProblem, VarDomain, VarId,
    VariableDef,
};
pub use registry::Registry;
pub use solution::{Solution, SolutionStatus, Solver};
