//! Reserve types: provision toward a balancing area's requirement.
//!
//! `spinning` contributes a violation (shortfall) variable per timepoint so
//! the requirement constraint is always feasible at a penalty; project
//! headroom contributions join the same aggregate when their operational
//! types register them.

use cep_core::{CepError, CepResult, Diagnostics, ReserveArea, TimepointId};

use crate::components::{ComponentKey, ExprIndex};
use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::plugin::{contract, ComponentType, EntityRef, ReserveType};
use crate::plugins::var_names;
use crate::problem::LinearExpr;

/// Resolve a reserve type tag to its implementation.
pub fn resolve(tag: &str) -> Option<Box<dyn ReserveType>> {
    match tag {
        "spinning" => Some(Box::new(Spinning)),
        _ => None,
    }
}

/// Spinning reserve with a penalized shortfall.
pub struct Spinning;

const SPINNING_PROVISION: &str = "spinning_reserve_provision";
const SPINNING_PENALTY: &str = "spinning_reserve_violation_penalty";

impl ComponentType for Spinning {
    fn name(&self) -> &'static str {
        "spinning"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::RESERVE_REQUIRED_RULES
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let area = entity.reserve_area()?;
        let temporal = ctx.temporal;

        ctx.register_component(ComponentKey::ReserveProvisionComponents, SPINNING_PROVISION)?;
        ctx.register_component(ComponentKey::PenaltyCostComponents, SPINNING_PENALTY)?;
        ctx.define_expressions(SPINNING_PROVISION);
        ctx.define_expressions(SPINNING_PENALTY);

        for tmp in temporal.timepoints_in_stage(ctx.stage) {
            let timepoint = temporal
                .timepoint(tmp)
                .ok_or_else(|| CepError::Config(format!("unknown timepoint {}", tmp.value())))?;
            let shortfall = ctx.model.add_continuous(
                var_names::reserve_shortfall(&area.name, tmp),
                0.0,
                f64::INFINITY,
            )?;

            ctx.expr_add(
                SPINNING_PROVISION,
                ExprIndex::AreaTimepoint(area.name.clone(), tmp),
                LinearExpr::term(shortfall, 1.0),
            );

            if !timepoint.spinup_or_lookahead {
                let period = temporal.period(timepoint.period).ok_or_else(|| {
                    CepError::Config(format!("unknown period {}", timepoint.period.value()))
                })?;
                let cost_weight = period.objective_weight() * timepoint.weight;
                ctx.expr_add(
                    SPINNING_PENALTY,
                    ExprIndex::Total,
                    LinearExpr::term(shortfall, area.violation_penalty_per_mw * cost_weight),
                );
            }
        }
        Ok(())
    }

    fn validate(
        &self,
        entity: &EntityRef,
        _data: &DataStore,
        diag: &mut Diagnostics,
    ) -> CepResult<()> {
        let area = entity.reserve_area()?;
        if area.requirement_mw < 0.0 {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "reserve requirement cannot be negative",
                )
                .with_entity(&area.name)
                .with_source_module(self.name()),
            );
        }
        Ok(())
    }
}

impl ReserveType for Spinning {
    fn reserve_provision(
        &self,
        area: &ReserveArea,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let shortfall = ctx
            .model
            .require_variable(&var_names::reserve_shortfall(&area.name, tmp))?;
        Ok(LinearExpr::term(shortfall, 1.0))
    }
}
