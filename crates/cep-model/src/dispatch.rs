//! Rule dispatch passes.
//!
//! Model construction touches every entity five times - component
//! construction, data loading, results export, results import, and
//! validation - each a separate pass over the full entity set, all sharing
//! the registry loaded for the relevant type-tag family. Dispatch itself
//! is pure resolution: invoking a hook through [`dispatch`] is identical
//! to calling the resolved implementation directly.
//!
//! All passes except validation fail fast on contract errors. The
//! validation pass is batch: a plugin's failure becomes a diagnostic and
//! the remaining entities still validate.

use std::path::Path;

use cep_core::{CepResult, DiagnosticIssue, Diagnostics, Severity};
use tracing::debug;

use crate::context::BuildCtx;
use crate::data::DataStore;
use crate::plugin::{ComponentType, EntityRef, ExportView, ResultRow};
use crate::registry::Registry;

/// An entity paired with its type tag for one capability family.
#[derive(Debug, Clone, Copy)]
pub struct Tagged<'a> {
    pub tag: &'a str,
    pub entity: EntityRef<'a>,
}

impl<'a> Tagged<'a> {
    pub fn new(tag: &'a str, entity: EntityRef<'a>) -> Self {
        Self { tag, entity }
    }
}

/// Resolve an entity's implementation in a registry.
///
/// Guarantee: for a given (registry, tag, hook, args), invoking the hook on
/// the returned reference is indistinguishable from calling the
/// implementation directly - dispatch adds no side effects of its own.
pub fn dispatch<'r, T: ComponentType + ?Sized>(
    registry: &'r Registry<T>,
    tag: &str,
) -> CepResult<&'r T> {
    registry.get(tag)
}

/// Component-construction pass: run every entity's build-components hook.
pub fn build_pass<T: ComponentType + ?Sized>(
    registry: &Registry<T>,
    entities: &[Tagged],
    ctx: &mut BuildCtx,
) -> CepResult<()> {
    for tagged in entities {
        debug!(
            family = registry.family(),
            tag = tagged.tag,
            entity = tagged.entity.name(),
            "build components"
        );
        dispatch(registry, tagged.tag)?.build_components(&tagged.entity, ctx)?;
    }
    Ok(())
}

/// Data-loading pass: each plugin reads its own parameter tables.
pub fn load_data_pass<T: ComponentType + ?Sized>(
    registry: &Registry<T>,
    entities: &[Tagged],
    inputs_dir: &Path,
    data: &mut DataStore,
) -> CepResult<()> {
    for tagged in entities {
        dispatch(registry, tagged.tag)?.load_data(&tagged.entity, inputs_dir, data)?;
    }
    Ok(())
}

/// Results-export pass: collect result rows from a solved stage model.
pub fn export_results_pass<T: ComponentType + ?Sized>(
    registry: &Registry<T>,
    entities: &[Tagged],
    view: &ExportView,
) -> CepResult<Vec<ResultRow>> {
    let mut rows = Vec::new();
    for tagged in entities {
        rows.extend(dispatch(registry, tagged.tag)?.export_results(&tagged.entity, view)?);
    }
    Ok(rows)
}

/// Results-import pass: feed exported rows back to the owning plugins.
pub fn import_results_pass<T: ComponentType + ?Sized>(
    registry: &Registry<T>,
    entities: &[Tagged],
    rows: &[ResultRow],
    data: &mut DataStore,
) -> CepResult<()> {
    for tagged in entities {
        dispatch(registry, tagged.tag)?.import_results(&tagged.entity, rows, data)?;
    }
    Ok(())
}

/// Validation pass: batch, never short-circuited.
///
/// Every entity is visited. An unknown tag or a hook `Err` is recorded as
/// a diagnostic error attributed to the entity and the pass continues.
/// Returns the number of entities visited.
pub fn validate_pass<T: ComponentType + ?Sized>(
    registry: &Registry<T>,
    entities: &[Tagged],
    data: &DataStore,
    diag: &mut Diagnostics,
) -> usize {
    let mut visited = 0;
    for tagged in entities {
        visited += 1;
        let implementation = match dispatch(registry, tagged.tag) {
            Ok(implementation) => implementation,
            Err(err) => {
                diag.add(
                    DiagnosticIssue::new(Severity::Error, "dispatch", err.to_string())
                        .with_entity(tagged.entity.name()),
                );
                continue;
            }
        };
        if let Err(err) = implementation.validate(&tagged.entity, data, diag) {
            diag.add(
                DiagnosticIssue::new(Severity::Error, "validation", err.to_string())
                    .with_entity(tagged.entity.name())
                    .with_source_module(implementation.name()),
            );
        }
    }
    visited
}
