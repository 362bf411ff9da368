//! Transmission operational types: power transfer between zones.

use cep_core::{CepError, CepResult, Diagnostics, TimepointId, TransmissionLine};

use crate::components::{ComponentKey, ExprIndex};
use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::plugin::{contract, ComponentType, EntityRef, TxOperationalType};
use crate::plugins::var_names;
use crate::problem::LinearExpr;

/// Resolve a transmission operational type tag to its implementation.
pub fn resolve(tag: &str) -> Option<Box<dyn TxOperationalType>> {
    match tag {
        "tx_simple" => Some(Box::new(TxSimple)),
        _ => None,
    }
}

/// Lossless transport-model flow with fixed limits.
pub struct TxSimple;

const TX_SIMPLE_RECEIVED: &str = "tx_simple_power_received";
const TX_SIMPLE_SENT: &str = "tx_simple_power_sent";

impl ComponentType for TxSimple {
    fn name(&self) -> &'static str {
        "tx_simple"
    }

    fn provided_rules(&self) -> &'static [&'static str] {
        contract::TX_OPERATIONAL_REQUIRED_RULES
    }

    fn build_components(&self, entity: &EntityRef, ctx: &mut BuildCtx) -> CepResult<()> {
        let line = entity.transmission_line()?;
        let temporal = ctx.temporal;

        ctx.register_component(
            ComponentKey::LoadBalanceProductionComponents,
            TX_SIMPLE_RECEIVED,
        )?;
        ctx.register_component(ComponentKey::LoadBalanceConsumptionComponents, TX_SIMPLE_SENT)?;
        ctx.define_expressions(TX_SIMPLE_RECEIVED);
        ctx.define_expressions(TX_SIMPLE_SENT);

        for tmp in temporal.timepoints_in_stage(ctx.stage) {
            let flow = ctx.model.add_continuous(
                var_names::flow(&line.name, tmp),
                line.min_flow_mw,
                line.max_flow_mw,
            )?;

            // Positive flow leaves the from-zone and arrives at the to-zone;
            // a negative value reverses both roles.
            ctx.expr_add(
                TX_SIMPLE_RECEIVED,
                ExprIndex::ZoneTimepoint(line.to_zone.clone(), tmp),
                LinearExpr::term(flow, 1.0),
            );
            ctx.expr_add(
                TX_SIMPLE_SENT,
                ExprIndex::ZoneTimepoint(line.from_zone.clone(), tmp),
                LinearExpr::term(flow, 1.0),
            );
        }
        Ok(())
    }

    fn validate(
        &self,
        entity: &EntityRef,
        _data: &DataStore,
        diag: &mut Diagnostics,
    ) -> CepResult<()> {
        let line = entity.transmission_line()?;
        if line.max_flow_mw < line.min_flow_mw {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "max flow is below min flow",
                )
                .with_entity(&line.name)
                .with_source_module(self.name()),
            );
        }
        if line.from_zone == line.to_zone {
            diag.add(
                cep_core::DiagnosticIssue::new(
                    cep_core::Severity::Error,
                    "inputs",
                    "line connects a zone to itself",
                )
                .with_entity(&line.name)
                .with_source_module(self.name()),
            );
        }
        Ok(())
    }
}

impl TxOperationalType for TxSimple {
    fn transmit_power(
        &self,
        line: &TransmissionLine,
        tmp: TimepointId,
        ctx: &BuildCtx,
    ) -> CepResult<LinearExpr> {
        let flow = ctx
            .model
            .variable(&var_names::flow(&line.name, tmp))
            .ok_or_else(|| {
                CepError::Config(format!(
                    "flow variable for line '{}' at timepoint {} is not defined",
                    line.name,
                    tmp.value()
                ))
            })?;
        Ok(LinearExpr::term(flow, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_core::{
        Period, PeriodId, Stage, StageId, Subproblem, SubproblemId, TemporalModel, Timepoint,
    };
    use crate::data::DataStore;

    fn temporal_with_tmps(n: u64) -> TemporalModel {
        let mut temporal = TemporalModel::new();
        temporal.add_period(Period::new(PeriodId::new(2030), 1.0, 1.0));
        temporal.add_subproblem(Subproblem::new(SubproblemId::new(1)));
        temporal.add_stage(Stage::new(StageId::new(1), "s1", SubproblemId::new(1)));
        for i in 1..=n {
            temporal.add_timepoint(Timepoint::new(
                TimepointId::new(i),
                PeriodId::new(2030),
                StageId::new(1),
            ));
        }
        temporal
    }

    #[test]
    fn test_tx_simple_builds_flow_vars_and_contributions() {
        let temporal = temporal_with_tmps(4);
        let data = DataStore::new();
        let mut ctx = BuildCtx::new(&temporal, StageId::new(1), "s1", &data);
        let line = cep_core::TransmissionLine::new("north_south", "north", "south", "tx_simple")
            .with_flow_limits(-400.0, 400.0);

        TxSimple
            .build_components(&EntityRef::TransmissionLine(&line), &mut ctx)
            .unwrap();

        assert_eq!(ctx.model.num_variables(), 4);

        ctx.finalize_components().unwrap();
        let aggregates = ctx.aggregates().unwrap();
        let received = aggregates.expression_at(
            ComponentKey::LoadBalanceProductionComponents,
            &ExprIndex::ZoneTimepoint("south".into(), TimepointId::new(1)),
        );
        assert_eq!(received.num_terms(), 1);
        let sent = aggregates.expression_at(
            ComponentKey::LoadBalanceConsumptionComponents,
            &ExprIndex::ZoneTimepoint("north".into(), TimepointId::new(1)),
        );
        assert_eq!(sent.num_terms(), 1);
    }

    #[test]
    fn test_tx_simple_validate_flags_self_loop() {
        let data = DataStore::new();
        let line = cep_core::TransmissionLine::new("loop", "north", "north", "tx_simple");
        let mut diag = Diagnostics::new();
        TxSimple
            .validate(&EntityRef::TransmissionLine(&line), &data, &mut diag)
            .unwrap();
        assert!(diag.has_errors());
    }
}
