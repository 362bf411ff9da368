//! Dynamic component accumulator.
//!
//! During the build-components pass, each loaded plugin registers the names
//! of the collections it owns (sets of operational pairs, cost expressions,
//! load-balance contributions) under shared accumulator keys. After every
//! plugin has contributed, the framework finalizes the accumulator: each
//! key's registered collections are unioned (sets) or summed (expressions)
//! into a single model-wide aggregate.
//!
//! The two phases are separated with a typestate split:
//! [`RegisteringComponents`] offers only registration and is consumed -
//! exactly once - by [`RegisteringComponents::finalize`], which produces
//! the read-only [`FinalizedComponents`]. The dynamic access path that
//! plugins see (`BuildCtx::aggregates`) enforces the same boundary at
//! runtime with a `PrematureFinalization` error.
//!
//! Although the registration bookkeeping is an ordered list, the finalized
//! aggregates are canonical (`BTreeSet` unions, [`LinearExpr`] sums keyed
//! by variable id) and therefore independent of registration order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cep_core::{CepError, CepResult, PeriodId, TimepointId};

use crate::problem::LinearExpr;

/// Accumulator keys: the closed set of model-wide aggregates plugins can
/// contribute to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKey {
    /// Union of (project, timepoint) operational pairs
    OperationalTimepointSets,
    /// Union of (project, period) pairs in which capacity can exist
    CapacityOperationalPeriodSets,
    /// Sum of investment cost expressions (objective)
    CapitalCostComponents,
    /// Sum of operating cost expressions (objective)
    OperatingCostComponents,
    /// Sum of penalty cost expressions (objective)
    PenaltyCostComponents,
    /// Per-(zone, timepoint) production contributions to load balance
    LoadBalanceProductionComponents,
    /// Per-(zone, timepoint) consumption contributions to load balance
    LoadBalanceConsumptionComponents,
    /// Per-(area, timepoint) reserve provision contributions
    ReserveProvisionComponents,
    /// Per-period contributions toward the planning reserve margin
    PrmContributionComponents,
}

impl ComponentKey {
    /// Whether this key aggregates by set union or expression sum.
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentKey::OperationalTimepointSets
            | ComponentKey::CapacityOperationalPeriodSets => ComponentKind::Set,
            _ => ComponentKind::Expression,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKey::OperationalTimepointSets => "operational_timepoint_sets",
            ComponentKey::CapacityOperationalPeriodSets => "capacity_operational_period_sets",
            ComponentKey::CapitalCostComponents => "capital_cost_components",
            ComponentKey::OperatingCostComponents => "operating_cost_components",
            ComponentKey::PenaltyCostComponents => "penalty_cost_components",
            ComponentKey::LoadBalanceProductionComponents => "load_balance_production_components",
            ComponentKey::LoadBalanceConsumptionComponents => "load_balance_consumption_components",
            ComponentKey::ReserveProvisionComponents => "reserve_provision_components",
            ComponentKey::PrmContributionComponents => "prm_contribution_components",
        }
    }
}

impl std::fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a key's registered collections are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Finalized by set union
    Set,
    /// Finalized by expression sum
    Expression,
}

/// An element of a set-valued collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetMember {
    ProjectTimepoint(String, TimepointId),
    ProjectPeriod(String, PeriodId),
}

/// Index of an expression-valued collection entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExprIndex {
    /// A single model-wide expression (cost components)
    Total,
    ZoneTimepoint(String, TimepointId),
    AreaTimepoint(String, TimepointId),
    Period(PeriodId),
}

/// Plugin-owned named collections, written during the build pass.
///
/// A plugin defines collections under names it owns and inserts members /
/// adds expression terms as it builds its components. Registration under
/// an accumulator key (see [`RegisteringComponents`]) is what makes a
/// collection visible to finalization.
#[derive(Debug, Default)]
pub struct ComponentStore {
    sets: HashMap<String, BTreeSet<SetMember>>,
    expressions: HashMap<String, BTreeMap<ExprIndex, LinearExpr>>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a named set, possibly left empty.
    pub fn define_set(&mut self, name: &str) {
        self.sets.entry(name.to_string()).or_default();
    }

    /// Define a named expression collection, possibly left empty.
    pub fn define_expressions(&mut self, name: &str) {
        self.expressions.entry(name.to_string()).or_default();
    }

    /// Insert a member into a named set, creating the set on first use.
    pub fn set_insert(&mut self, name: &str, member: SetMember) {
        self.sets.entry(name.to_string()).or_default().insert(member);
    }

    /// Accumulate an expression into a named collection at the given index.
    pub fn expr_add(&mut self, name: &str, index: ExprIndex, expr: LinearExpr) {
        let entry = self
            .expressions
            .entry(name.to_string())
            .or_default()
            .entry(index)
            .or_default();
        *entry += expr;
    }

    pub fn set(&self, name: &str) -> Option<&BTreeSet<SetMember>> {
        self.sets.get(name)
    }

    pub fn expressions(&self, name: &str) -> Option<&BTreeMap<ExprIndex, LinearExpr>> {
        self.expressions.get(name)
    }
}

/// Register-phase accumulator: key → registration-ordered collection names.
///
/// Consumed exactly once by [`Self::finalize`]; afterwards no further
/// registration is possible by construction.
#[derive(Debug, Default)]
pub struct RegisteringComponents {
    registered: BTreeMap<ComponentKey, Vec<String>>,
}

impl RegisteringComponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a collection name under an accumulator key.
    ///
    /// A collection is registered at most once per key: plugins register
    /// from per-entity hooks, and the same plugin-owned collection must
    /// not be double-counted at finalization. Registration order is
    /// preserved for reproducible logs, but it does not affect the
    /// finalized aggregates.
    pub fn register(&mut self, key: ComponentKey, name: impl Into<String>) {
        let name = name.into();
        let names = self.registered.entry(key).or_default();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    /// Collection names registered under a key, in registration order.
    pub fn registered(&self, key: ComponentKey) -> &[String] {
        self.registered
            .get(&key)
            .map(|names| names.as_slice())
            .unwrap_or(&[])
    }

    /// Compute the model-wide aggregates from the plugin-owned collections.
    ///
    /// Every registered name must have been defined in `store`; a dangling
    /// registration means a plugin registered a collection it never built,
    /// which is a build-ordering bug.
    pub fn finalize(self, store: &ComponentStore) -> CepResult<FinalizedComponents> {
        let mut sets: BTreeMap<ComponentKey, BTreeSet<SetMember>> = BTreeMap::new();
        let mut expressions: BTreeMap<ComponentKey, BTreeMap<ExprIndex, LinearExpr>> =
            BTreeMap::new();

        for (key, names) in self.registered {
            match key.kind() {
                ComponentKind::Set => {
                    let aggregate = sets.entry(key).or_default();
                    for name in names {
                        let members = store.set(&name).ok_or_else(|| {
                            CepError::Config(format!(
                                "collection '{}' registered under {} was never defined",
                                name, key
                            ))
                        })?;
                        aggregate.extend(members.iter().cloned());
                    }
                }
                ComponentKind::Expression => {
                    let aggregate = expressions.entry(key).or_default();
                    for name in names {
                        let indexed = store.expressions(&name).ok_or_else(|| {
                            CepError::Config(format!(
                                "collection '{}' registered under {} was never defined",
                                name, key
                            ))
                        })?;
                        for (index, expr) in indexed {
                            let entry = aggregate.entry(index.clone()).or_default();
                            *entry += expr.clone();
                        }
                    }
                }
            }
        }

        Ok(FinalizedComponents { sets, expressions })
    }
}

/// Finalized, read-only model-wide aggregates.
#[derive(Debug, Default)]
pub struct FinalizedComponents {
    sets: BTreeMap<ComponentKey, BTreeSet<SetMember>>,
    expressions: BTreeMap<ComponentKey, BTreeMap<ExprIndex, LinearExpr>>,
}

impl FinalizedComponents {
    /// The unioned set aggregate under a key (empty if nothing registered).
    pub fn set(&self, key: ComponentKey) -> BTreeSet<SetMember> {
        self.sets.get(&key).cloned().unwrap_or_default()
    }

    /// The summed expression aggregate under a key, by index.
    pub fn expressions(&self, key: ComponentKey) -> BTreeMap<ExprIndex, LinearExpr> {
        self.expressions.get(&key).cloned().unwrap_or_default()
    }

    /// The expression aggregate at one index (zero if absent).
    pub fn expression_at(&self, key: ComponentKey, index: &ExprIndex) -> LinearExpr {
        self.expressions
            .get(&key)
            .and_then(|indexed| indexed.get(index))
            .cloned()
            .unwrap_or_default()
    }

    /// Sum of a key's expression aggregate across all indices.
    pub fn total_expression(&self, key: ComponentKey) -> LinearExpr {
        let mut total = LinearExpr::new();
        if let Some(indexed) = self.expressions.get(&key) {
            for expr in indexed.values() {
                total += expr.clone();
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::VarId;

    fn store_with_two_plugins() -> ComponentStore {
        let mut store = ComponentStore::new();
        // "Plugin A" owns these collections
        store.set_insert(
            "a_operational_timepoints",
            SetMember::ProjectTimepoint("coal_1".into(), TimepointId::new(1)),
        );
        store.set_insert(
            "a_operational_timepoints",
            SetMember::ProjectTimepoint("coal_1".into(), TimepointId::new(2)),
        );
        store.expr_add(
            "a_operating_cost",
            ExprIndex::Total,
            LinearExpr::term(VarId::new(0), 10.0),
        );
        // "Plugin B" owns these
        store.set_insert(
            "b_operational_timepoints",
            SetMember::ProjectTimepoint("wind_1".into(), TimepointId::new(1)),
        );
        store.expr_add(
            "b_operating_cost",
            ExprIndex::Total,
            LinearExpr::term(VarId::new(1), 5.0).with_term(VarId::new(0), 1.0),
        );
        store
    }

    fn finalize_in_order(store: &ComponentStore, order: [&str; 2]) -> FinalizedComponents {
        let mut registering = RegisteringComponents::new();
        for plugin in order {
            registering.register(
                ComponentKey::OperationalTimepointSets,
                format!("{}_operational_timepoints", plugin),
            );
            registering.register(
                ComponentKey::OperatingCostComponents,
                format!("{}_operating_cost", plugin),
            );
        }
        registering.finalize(store).unwrap()
    }

    #[test]
    fn test_finalization_is_order_independent() {
        let store = store_with_two_plugins();
        let ab = finalize_in_order(&store, ["a", "b"]);
        let ba = finalize_in_order(&store, ["b", "a"]);

        assert_eq!(
            ab.set(ComponentKey::OperationalTimepointSets),
            ba.set(ComponentKey::OperationalTimepointSets)
        );
        assert_eq!(
            ab.total_expression(ComponentKey::OperatingCostComponents),
            ba.total_expression(ComponentKey::OperatingCostComponents)
        );
    }

    #[test]
    fn test_union_and_sum_semantics() {
        let store = store_with_two_plugins();
        let finalized = finalize_in_order(&store, ["a", "b"]);

        let pairs = finalized.set(ComponentKey::OperationalTimepointSets);
        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&SetMember::ProjectTimepoint(
            "wind_1".into(),
            TimepointId::new(1)
        )));

        // 10*v0 + (5*v1 + 1*v0) = 11*v0 + 5*v1
        let cost = finalized.total_expression(ComponentKey::OperatingCostComponents);
        assert_eq!(cost.evaluate(&[1.0, 1.0]), 16.0);
        assert_eq!(cost.num_terms(), 2);
    }

    #[test]
    fn test_registration_order_is_preserved_and_deduplicated() {
        let mut registering = RegisteringComponents::new();
        registering.register(ComponentKey::CapitalCostComponents, "b_cost");
        registering.register(ComponentKey::CapitalCostComponents, "a_cost");
        registering.register(ComponentKey::CapitalCostComponents, "b_cost");
        assert_eq!(
            registering.registered(ComponentKey::CapitalCostComponents),
            &["b_cost".to_string(), "a_cost".to_string()]
        );
    }

    #[test]
    fn test_per_entity_registration_does_not_double_count() {
        let mut store = ComponentStore::new();
        store.expr_add(
            "shared_cost",
            ExprIndex::Total,
            LinearExpr::term(VarId::new(0), 7.0),
        );

        // The same plugin registers its collection once per entity it owns
        let mut registering = RegisteringComponents::new();
        registering.register(ComponentKey::OperatingCostComponents, "shared_cost");
        registering.register(ComponentKey::OperatingCostComponents, "shared_cost");

        let finalized = registering.finalize(&store).unwrap();
        let cost = finalized.total_expression(ComponentKey::OperatingCostComponents);
        assert_eq!(cost.evaluate(&[1.0]), 7.0);
    }

    #[test]
    fn test_dangling_registration_is_error() {
        let store = ComponentStore::new();
        let mut registering = RegisteringComponents::new();
        registering.register(ComponentKey::OperatingCostComponents, "ghost_cost");

        let err = registering.finalize(&store).unwrap_err();
        assert!(err.to_string().contains("ghost_cost"));
    }

    #[test]
    fn test_empty_aggregates_are_empty_not_missing() {
        let finalized = RegisteringComponents::new()
            .finalize(&ComponentStore::new())
            .unwrap();
        assert!(finalized.set(ComponentKey::OperationalTimepointSets).is_empty());
        assert!(finalized
            .total_expression(ComponentKey::OperatingCostComponents)
            .is_constant());
    }

    #[test]
    fn test_expression_indexing_by_zone() {
        let mut store = ComponentStore::new();
        store.expr_add(
            "gen_power",
            ExprIndex::ZoneTimepoint("north".into(), TimepointId::new(1)),
            LinearExpr::term(VarId::new(0), 1.0),
        );
        store.expr_add(
            "gen_power",
            ExprIndex::ZoneTimepoint("south".into(), TimepointId::new(1)),
            LinearExpr::term(VarId::new(1), 1.0),
        );

        let mut registering = RegisteringComponents::new();
        registering.register(ComponentKey::LoadBalanceProductionComponents, "gen_power");
        let finalized = registering.finalize(&store).unwrap();

        let north = finalized.expression_at(
            ComponentKey::LoadBalanceProductionComponents,
            &ExprIndex::ZoneTimepoint("north".into(), TimepointId::new(1)),
        );
        assert_eq!(north.num_terms(), 1);

        let absent = finalized.expression_at(
            ComponentKey::LoadBalanceProductionComponents,
            &ExprIndex::ZoneTimepoint("west".into(), TimepointId::new(1)),
        );
        assert!(absent.is_constant());
    }
}
