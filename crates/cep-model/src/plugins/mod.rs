//! Built-in plugin namespaces.
//!
//! One module per capability family, each exposing a `resolve` function
//! mapping a type tag to a boxed implementation. The registry loader is
//! the only caller of `resolve`; everything else goes through a loaded
//! registry.
//!
//! The implementations here are deliberately compact formulations. They
//! carry the framework end-to-end - dispatch, accumulator registration,
//! horizon-boundary handling, and commitment pass-through - without
//! reproducing any production plugin's full constraint math.

pub mod availability;
pub mod capacity;
pub mod operational;
pub mod reliability;
pub mod reserve;
pub mod transmission;

use cep_core::{PeriodId, TimepointId};

/// Variable naming conventions shared between plugins and the stage
/// runner (which reads commitment variables back out of solutions).
pub mod var_names {
    use super::*;

    pub fn power(project: &str, tmp: TimepointId) -> String {
        format!("{}__power__{}", project, tmp.value())
    }

    pub fn commit(project: &str, tmp: TimepointId) -> String {
        format!("{}__commit__{}", project, tmp.value())
    }

    pub fn startup(project: &str, tmp: TimepointId) -> String {
        format!("{}__startup__{}", project, tmp.value())
    }

    pub fn shutdown(project: &str, tmp: TimepointId) -> String {
        format!("{}__shutdown__{}", project, tmp.value())
    }

    pub fn charge(project: &str, tmp: TimepointId) -> String {
        format!("{}__charge__{}", project, tmp.value())
    }

    pub fn soc(project: &str, tmp: TimepointId) -> String {
        format!("{}__soc__{}", project, tmp.value())
    }

    pub fn build(project: &str, period: PeriodId) -> String {
        format!("{}__build__{}", project, period.value())
    }

    pub fn flow(line: &str, tmp: TimepointId) -> String {
        format!("{}__flow__{}", line, tmp.value())
    }

    pub fn reserve_shortfall(area: &str, tmp: TimepointId) -> String {
        format!("{}__reserve_shortfall__{}", area, tmp.value())
    }

    pub fn unserved_energy(zone: &str, tmp: TimepointId) -> String {
        format!("{}__unserved_energy__{}", zone, tmp.value())
    }
}
