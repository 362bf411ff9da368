//! Reliability types: contributions toward the planning reserve margin.

use cep_core::{CepError, CepResult, Diagnostics, PeriodId, Project};

use crate::components::{ComponentKey, ExprIndex};
use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::plugin::{contract, ComponentType, EntityRef, ReliabilityType};
use crate::problem::LinearExpr;

/// Resolve a reliability type tag to its implementation.
pub fn resolve(tag: &str) -> Option<Box<dyn ReliabilityType>> {
    match tag {
        "simple_capacity" => Some(Box::new(SimpleCapacity)),
        _ => None,
    }
}

/// A fixed fraction of installed capacity counts toward the margin.
pub struct SimpleCapacity;

const SIMPLE_CAPACITY_PRM: &str = "simple_capacity_prm_contribution";

impl ComponentType for SimpleCapacity {
    fn name(&self) -> &'static str {
        "simple_capacity"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::RELIABILITY_REQUIRED_RULES
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let project = entity.project()?;
        let temporal = ctx.temporal;
        let params = ctx.data.project_params(&project.name)?.clone();

        ctx.register_component(ComponentKey::PrmContributionComponents, SIMPLE_CAPACITY_PRM)?;
        ctx.define_expressions(SIMPLE_CAPACITY_PRM);

        for period in temporal.periods() {
            ctx.expr_add(
                SIMPLE_CAPACITY_PRM,
                ExprIndex::Period(period.id),
                LinearExpr::constant(params.elcc_fraction * params.capacity_mw),
            );
        }
        Ok(())
    }

    fn validate(
        &self,
        entity: &EntityRef,
        data: &DataStore,
        diag: &mut Diagnostics,
    ) -> CepResult<()> {
        let project = entity.project()?;
        if let Some(params) = data.try_project_params(&project.name) {
            if !(0.0..=1.0).contains(&params.elcc_fraction) {
                diag.add(
                    cep_core::DiagnosticIssue::new(
                        cep_core::Severity::Error,
                        "inputs",
                        "capacity-credit fraction must be in [0, 1]",
                    )
                    .with_entity(&project.name)
                    .with_source_module(self.name()),
                );
            }
        }
        Ok(())
    }
}

impl ReliabilityType for SimpleCapacity {
    fn prm_contribution(
        &self,
        project: &Project,
        period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let params = ctx.data.project_params(&project.name)?;
        ctx.temporal
            .period(period)
            .ok_or_else(|| CepError::Config(format!("unknown period {}", period.value())))?;
        Ok(LinearExpr::constant(
            params.elcc_fraction * params.capacity_mw,
        ))
    }
}
