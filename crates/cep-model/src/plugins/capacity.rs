//! Capacity types: how much of a project exists in each period.
//!
//! - `existing_gen` - fixed installed capacity with fixed O&M.
//! - `new_build_gen` - per-period build decisions with annualized capital
//!   cost; capacity is cumulative over vintages.
//! - `new_build_storage` - same build formulation; the energy dimension
//!   comes from the project's storage duration at the operational level.

use cep_core::{CepError, CepResult, Diagnostics, PeriodId, Project};

use crate::components::{ComponentKey, ExprIndex, SetMember};
use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::plugin::{contract, CapacityType, ComponentType, EntityRef};
use crate::plugins::var_names;
use crate::problem::{ConstraintSense, LinearExpr};

/// Resolve a capacity type tag to its implementation.
pub fn resolve(tag: &str) -> Option<Box<dyn CapacityType>> {
    match tag {
        "existing_gen" => Some(Box::new(ExistingGen)),
        "new_build_gen" => Some(Box::new(NewBuild::gen())),
        "new_build_storage" => Some(Box::new(NewBuild::storage())),
        _ => None,
    }
}

/// Capacity that exists in every period at a fixed size.
pub struct ExistingGen;

const EXISTING_GEN_PERIODS: &str = "existing_gen_operational_periods";
const EXISTING_GEN_COST: &str = "existing_gen_capacity_cost";

impl ComponentType for ExistingGen {
    fn name(&self) -> &'static str {
        "existing_gen"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::CAPACITY_REQUIRED_RULES
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let project = entity.project()?;
        let temporal = ctx.temporal;
        let params = ctx.data.project_params(&project.name)?.clone();

        ctx.register_component(
            ComponentKey::CapacityOperationalPeriodSets,
            EXISTING_GEN_PERIODS,
        )?;
        ctx.register_component(ComponentKey::CapitalCostComponents, EXISTING_GEN_COST)?;
        ctx.define_set(EXISTING_GEN_PERIODS);
        ctx.define_expressions(EXISTING_GEN_COST);

        for period in temporal.periods() {
            ctx.set_insert(
                EXISTING_GEN_PERIODS,
                SetMember::ProjectPeriod(project.name.clone(), period.id),
            );
            if params.fixed_cost_per_mw_yr != 0.0 {
                ctx.expr_add(
                    EXISTING_GEN_COST,
                    ExprIndex::Total,
                    LinearExpr::constant(
                        params.fixed_cost_per_mw_yr
                            * params.capacity_mw
                            * period.objective_weight(),
                    ),
                );
            }
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
        match data.try_project_params(&project.name) {
            None => diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "no parameters loaded",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            ),
            Some(params) if params.capacity_mw < 0.0 => diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "existing capacity cannot be negative",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            ),
            Some(_) => {}
        }
        Ok(())
    }
}

impl CapacityType for ExistingGen {
    fn capacity(
        &self,
        project: &Project,
        _period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let params = ctx.data.project_params(&project.name)?;
        Ok(LinearExpr::constant(params.capacity_mw))
    }

    fn capacity_cost(
        &self,
        project: &Project,
        period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let params = ctx.data.project_params(&project.name)?;
        let weight = ctx
            .temporal
            .period(period)
            .map(|p| p.objective_weight())
            .ok_or_else(|| CepError::Config(format!("unknown period {}", period.value())))?;
        Ok(LinearExpr::constant(
            params.fixed_cost_per_mw_yr * params.capacity_mw * weight,
        ))
    }
}

/// Candidate capacity built by the optimization, cumulative over vintages.
pub struct NewBuild {
    tag: &'static str,
    periods_collection: &'static str,
    cost_collection: &'static str,
}

impl NewBuild {
    pub fn gen() -> Self {
        Self {
            tag: "new_build_gen",
            periods_collection: "new_build_gen_operational_periods",
            cost_collection: "new_build_gen_capital_cost",
        }
    }

    pub fn storage() -> Self {
        Self {
            tag: "new_build_storage",
            periods_collection: "new_build_storage_operational_periods",
            cost_collection: "new_build_storage_capital_cost",
        }
    }

    /// Cumulative capacity expression: all vintages built up to `period`.
    fn cumulative_capacity(
        &self,
        project: &Project,
        period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let mut cumulative = LinearExpr::new();
        for vintage in ctx.temporal.periods() {
            if vintage.id <= period {
                let build = ctx
                    .model
                    .require_variable(&var_names::build(&project.name, vintage.id))?;
                cumulative.add_term(build, 1.0);
            }
        }
        Ok(cumulative)
    }
}

impl ComponentType for NewBuild {
    fn name(&self) -> &'static str {
        self.tag
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::CAPACITY_REQUIRED_RULES
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let project = entity.project()?;
        let temporal = ctx.temporal;
        let params = ctx.data.project_params(&project.name)?.clone();

        ctx.register_component(
            ComponentKey::CapacityOperationalPeriodSets,
            self.periods_collection,
        )?;
        ctx.register_component(ComponentKey::CapitalCostComponents, self.cost_collection)?;
        ctx.define_set(self.periods_collection);
        ctx.define_expressions(self.cost_collection);

        let periods: Vec<_> = temporal.periods().cloned().collect();
        for period in &periods {
            ctx.model.add_continuous(
                var_names::build(&project.name, period.id),
                0.0,
                params.max_new_build_mw,
            )?;
            ctx.set_insert(
                self.periods_collection,
                SetMember::ProjectPeriod(project.name.clone(), period.id),
            );
        }

        for period in &periods {
            let cumulative = self.cumulative_capacity(project, period.id, ctx)?;

            if params.max_new_build_mw.is_finite() {
                ctx.model.add_constraint(
                    format!("{}__build_limit__{}", project.name, period.id.value()),
                    cumulative.clone(),
                    ConstraintSense::LessEqual,
                    params.max_new_build_mw,
                );
            }

            // Each vintage pays its annualized capital cost in every period
            // from its build year on
            ctx.expr_add(
                self.cost_collection,
                ExprIndex::Total,
                cumulative.scaled(params.capital_cost_per_mw_yr * period.objective_weight()),
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
        match data.try_project_params(&project.name) {
            None => diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "no parameters loaded",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            ),
            Some(params) if params.capital_cost_per_mw_yr < 0.0 => diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "capital cost cannot be negative",
                )
                .with_entity(&project.name)
                .with_source_module(self.name()),
            ),
            Some(_) => {}
        }
        Ok(())
    }
}

impl CapacityType for NewBuild {
    fn capacity(
        &self,
        project: &Project,
        period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        self.cumulative_capacity(project, period, ctx)
    }

    fn capacity_cost(
        &self,
        project: &Project,
        period: PeriodId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let params = ctx.data.project_params(&project.name)?;
        let weight = ctx
            .temporal
            .period(period)
            .map(|p| p.objective_weight())
            .ok_or_else(|| CepError::Config(format!("unknown period {}", period.value())))?;
        Ok(self
            .cumulative_capacity(project, period, ctx)?
            .scaled(params.capital_cost_per_mw_yr * weight))
    }
}
