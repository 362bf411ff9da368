//! The build context threaded through plugin hooks.
//!
//! One `BuildCtx` exists per stage-model build. It owns the mutable model
//! under construction and the dynamic-component accumulator, and exposes
//! read-only scenario state (temporal model, input data, commitment
//! pass-through). The accumulator's two phases are enforced here: plugins
//! can register collections only while the context is in the register
//! phase, and can read aggregates only after the orchestrator has called
//! [`BuildCtx::finalize_components`]. Reading early is a
//! `PrematureFinalization` error - a build-ordering bug, not a recoverable
//! condition.

use std::collections::HashMap;

use cep_core::{
    CepError, CepResult, CommitmentLedger, CommitmentState, StageId, TemporalModel, TimepointId,
};

use crate::components::{
    ComponentKey, ComponentStore, ExprIndex, FinalizedComponents, RegisteringComponents, SetMember,
};
use crate::data::DataStore;
use crate::problem::{LinearExpr, ModelBuilder};

enum ComponentsPhase {
    Registering(RegisteringComponents),
    Finalized(FinalizedComponents),
}

/// Per-build mutable state handed to plugin hooks.
pub struct BuildCtx<'a> {
    pub temporal: &'a TemporalModel,
    pub stage: StageId,
    pub stage_name: String,
    pub data: &'a DataStore,
    /// The optimization model under construction
    pub model: ModelBuilder,
    store: ComponentStore,
    phase: ComponentsPhase,
    /// Commitment state per project for this stage
    commitment_states: HashMap<String, CommitmentState>,
    ledger: Option<&'a CommitmentLedger>,
    /// Effective availability derates, computed by dispatching the
    /// availability-type rules before the build pass
    derates: HashMap<(String, TimepointId), f64>,
}

impl<'a> BuildCtx<'a> {
    pub fn new(
        temporal: &'a TemporalModel,
        stage: StageId,
        stage_name: impl Into<String>,
        data: &'a DataStore,
    ) -> Self {
        Self {
            temporal,
            stage,
            stage_name: stage_name.into(),
            data,
            model: ModelBuilder::new(),
            store: ComponentStore::new(),
            phase: ComponentsPhase::Registering(RegisteringComponents::new()),
            commitment_states: HashMap::new(),
            ledger: None,
            derates: HashMap::new(),
        }
    }

    pub fn with_commitment_states(
        mut self,
        states: HashMap<String, CommitmentState>,
        ledger: Option<&'a CommitmentLedger>,
    ) -> Self {
        self.commitment_states = states;
        self.ledger = ledger;
        self
    }

    pub fn with_availability_derates(
        mut self,
        derates: HashMap<(String, TimepointId), f64>,
    ) -> Self {
        self.derates = derates;
        self
    }

    /// Effective availability derate for a project at a timepoint.
    ///
    /// Defaults to fully available when no availability type contributed.
    pub fn availability_derate(&self, project: &str, tmp: TimepointId) -> f64 {
        self.derates
            .get(&(project.to_string(), tmp))
            .copied()
            .unwrap_or(1.0)
    }

    // =========================================================================
    // Register phase
    // =========================================================================

    /// Register a plugin-owned collection name under an accumulator key.
    pub fn register_component(&mut self, key: ComponentKey, name: impl Into<String>) -> CepResult<()> {
        match &mut self.phase {
            ComponentsPhase::Registering(registering) => {
                registering.register(key, name);
                Ok(())
            }
            ComponentsPhase::Finalized(_) => Err(CepError::Config(
                "component registration is closed after finalization".into(),
            )),
        }
    }

    /// Define a plugin-owned named set, possibly left empty.
    pub fn define_set(&mut self, name: &str) {
        self.store.define_set(name);
    }

    /// Define a plugin-owned named expression collection, possibly empty.
    pub fn define_expressions(&mut self, name: &str) {
        self.store.define_expressions(name);
    }

    /// Insert a member into a plugin-owned named set.
    pub fn set_insert(&mut self, name: &str, member: SetMember) {
        self.store.set_insert(name, member);
    }

    /// Accumulate an expression into a plugin-owned named collection.
    pub fn expr_add(&mut self, name: &str, index: ExprIndex, expr: LinearExpr) {
        self.store.expr_add(name, index, expr);
    }

    // =========================================================================
    // Phase transition and finalize phase
    // =========================================================================

    /// Close the register phase and compute the model-wide aggregates.
    ///
    /// Called by the orchestrator exactly once, after every plugin's
    /// build-components hook has run.
    pub fn finalize_components(&mut self) -> CepResult<()> {
        let phase = std::mem::replace(
            &mut self.phase,
            ComponentsPhase::Finalized(FinalizedComponents::default()),
        );
        match phase {
            ComponentsPhase::Registering(registering) => {
                let finalized = registering.finalize(&self.store)?;
                self.phase = ComponentsPhase::Finalized(finalized);
                Ok(())
            }
            ComponentsPhase::Finalized(finalized) => {
                // Restore state before reporting; the build is already broken
                self.phase = ComponentsPhase::Finalized(finalized);
                Err(CepError::Config(
                    "dynamic components were already finalized".into(),
                ))
            }
        }
    }

    /// The finalized model-wide aggregates.
    ///
    /// Fails with `PrematureFinalization` while plugins are still
    /// registering - reading a partially populated aggregate would
    /// silently drop contributions.
    pub fn aggregates(&self) -> CepResult<&FinalizedComponents> {
        match &self.phase {
            ComponentsPhase::Finalized(finalized) => Ok(finalized),
            ComponentsPhase::Registering(_) => Err(CepError::PrematureFinalization {
                context: format!("stage '{}' build", self.stage_name),
            }),
        }
    }

    // =========================================================================
    // Commitment pass-through
    // =========================================================================

    /// Consume the context, releasing the model builder for sealing.
    pub fn into_model(self) -> ModelBuilder {
        self.model
    }

    /// Commitment state of a project in this stage (Free if undeclared).
    pub fn commitment_state(&self, project: &str) -> CommitmentState {
        self.commitment_states
            .get(project)
            .copied()
            .unwrap_or(CommitmentState::Free)
    }

    /// The fixed commitment value for a project at a timepoint.
    ///
    /// Looks up the prior-stage record through the timepoint's
    /// previous-stage mapping when one exists. Missing data is fatal at
    /// model-load time.
    pub fn fixed_commitment(&self, project: &str, tmp: TimepointId) -> CepResult<f64> {
        let lookup_tmp = self
            .temporal
            .timepoint(tmp)
            .and_then(|t| t.previous_stage_timepoint)
            .unwrap_or(tmp);
        match self.ledger {
            Some(ledger) => ledger.fixed_value(project, lookup_tmp, &self.stage_name),
            None => Err(CepError::MissingPassThroughData {
                project: project.to_string(),
                timepoint: lookup_tmp.value(),
                stage: self.stage_name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_core::{CommitmentRecord, Period, PeriodId, Stage, Subproblem, SubproblemId, Timepoint};

    fn minimal_temporal() -> TemporalModel {
        let mut temporal = TemporalModel::new();
        temporal.add_period(Period::new(PeriodId::new(2030), 1.0, 1.0));
        temporal.add_subproblem(Subproblem::new(SubproblemId::new(1)));
        temporal.add_stage(Stage::new(StageId::new(1), "s1", SubproblemId::new(1)));
        temporal.add_stage(Stage::new(StageId::new(2), "s2", SubproblemId::new(1)));
        temporal.add_timepoint(Timepoint::new(
            TimepointId::new(1),
            PeriodId::new(2030),
            StageId::new(1),
        ));
        temporal.add_timepoint(
            Timepoint::new(TimepointId::new(101), PeriodId::new(2030), StageId::new(2))
                .with_previous_stage_timepoint(TimepointId::new(1)),
        );
        temporal
    }

    #[test]
    fn test_premature_read_is_error() {
        let temporal = minimal_temporal();
        let data = DataStore::new();
        let ctx = BuildCtx::new(&temporal, StageId::new(1), "s1", &data);

        let err = ctx.aggregates().unwrap_err();
        assert!(matches!(err, CepError::PrematureFinalization { .. }));
        assert!(err.to_string().contains("s1"));
    }

    #[test]
    fn test_register_then_finalize_then_read() {
        let temporal = minimal_temporal();
        let data = DataStore::new();
        let mut ctx = BuildCtx::new(&temporal, StageId::new(1), "s1", &data);

        ctx.set_insert(
            "my_pairs",
            SetMember::ProjectTimepoint("coal_1".into(), TimepointId::new(1)),
        );
        ctx.register_component(ComponentKey::OperationalTimepointSets, "my_pairs")
            .unwrap();

        ctx.finalize_components().unwrap();
        let aggregates = ctx.aggregates().unwrap();
        assert_eq!(aggregates.set(ComponentKey::OperationalTimepointSets).len(), 1);
    }

    #[test]
    fn test_registration_closed_after_finalize() {
        let temporal = minimal_temporal();
        let data = DataStore::new();
        let mut ctx = BuildCtx::new(&temporal, StageId::new(1), "s1", &data);

        ctx.finalize_components().unwrap();
        assert!(ctx
            .register_component(ComponentKey::OperatingCostComponents, "late")
            .is_err());
        // A second finalize is a build-ordering bug too
        assert!(ctx.finalize_components().is_err());
    }

    #[test]
    fn test_fixed_commitment_uses_previous_stage_mapping() {
        let temporal = minimal_temporal();
        let data = DataStore::new();
        let mut ledger = CommitmentLedger::new();
        ledger.insert(CommitmentRecord {
            project: "coal_1".into(),
            timepoint: TimepointId::new(1),
            stage: "s1".into(),
            committed: 1.0,
        });

        let states = HashMap::from([("coal_1".to_string(), CommitmentState::Fixed)]);
        let ctx = BuildCtx::new(&temporal, StageId::new(2), "s2", &data)
            .with_commitment_states(states, Some(&ledger));

        // Stage-2 timepoint 101 maps back to stage-1 timepoint 1
        assert_eq!(
            ctx.fixed_commitment("coal_1", TimepointId::new(101)).unwrap(),
            1.0
        );

        // No record for an unmapped pair
        let err = ctx
            .fixed_commitment("wind_1", TimepointId::new(101))
            .unwrap_err();
        assert!(matches!(err, CepError::MissingPassThroughData { .. }));
    }

    #[test]
    fn test_missing_ledger_is_missing_pass_through_data() {
        let temporal = minimal_temporal();
        let data = DataStore::new();
        let ctx = BuildCtx::new(&temporal, StageId::new(2), "s2", &data);

        let err = ctx
            .fixed_commitment("coal_1", TimepointId::new(101))
            .unwrap_err();
        assert!(matches!(err, CepError::MissingPassThroughData { .. }));
    }
}
