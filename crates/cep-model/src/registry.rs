//! Registry loading and tag resolution.
//!
//! A registry maps type tags to heap-allocated plugin implementations for
//! one capability family. It is built once per scenario build from the
//! tags the scenario's entities actually declare, and passed explicitly to
//! every dispatch site - implementations are never resolved by name at
//! call sites.
//!
//! Loading fails fast: a tag with no implementation is `UnknownTypeTag`, a
//! resolved implementation that does not provide one of the family's
//! required rules is `MissingCapability`. Both mean a formulation piece is
//! missing and the model cannot be meaningfully constructed.

use std::collections::HashMap;

use cep_core::{CepError, CepResult};

use crate::plugin::ComponentType;

/// A tag → implementation lookup table for one capability family.
pub struct Registry<T: ?Sized> {
    family: &'static str,
    implementations: HashMap<String, Box<T>>,
}

impl<T: ComponentType + ?Sized> Registry<T> {
    /// Load implementations for the requested tags.
    ///
    /// `resolve` is the family's namespace: it maps a tag to a boxed
    /// implementation, or `None` for an unknown tag. Duplicate requested
    /// tags are loaded once. Loading has no side effects and is
    /// repeatable.
    pub fn load<'a, I>(
        family: &'static str,
        tags: I,
        resolve: impl Fn(&str) -> Option<Box<T>>,
        required_rules: &'static [&'static str],
    ) -> CepResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut implementations: HashMap<String, Box<T>> = HashMap::new();
        for tag in tags {
            if implementations.contains_key(tag) {
                continue;
            }
            let implementation =
                resolve(tag).ok_or_else(|| CepError::UnknownTypeTag {
                    family,
                    tag: tag.to_string(),
                })?;
            let provided = implementation.provided_rules();
            for rule in required_rules {
                if !provided.contains(rule) {
                    return Err(CepError::MissingCapability {
                        family,
                        tag: tag.to_string(),
                        rule,
                    });
                }
            }
            implementations.insert(tag.to_string(), implementation);
        }
        Ok(Self {
            family,
            implementations,
        })
    }

    /// Resolve a tag to its loaded implementation.
    ///
    /// A tag that was not part of the load is `UnknownTypeTag` - distinct
    /// from an absent optional hook, which is a no-op.
    pub fn get(&self, tag: &str) -> CepResult<&T> {
        self.implementations
            .get(tag)
            .map(|boxed| boxed.as_ref())
            .ok_or_else(|| CepError::UnknownTypeTag {
                family: self.family,
                tag: tag.to_string(),
            })
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.implementations.contains_key(tag)
    }

    /// Loaded tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.implementations.keys().map(String::as_str)
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }
}

impl<T: ?Sized> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("family", &self.family)
            .field("tags", &self.implementations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{contract, OperationalType};

    struct Complete;

    impl ComponentType for Complete {
        fn name(&self) -> &'static str {
            "complete_type"
        }
        fn provided_rules(&self) -> &'static [&'static str] {
            contract::OPERATIONAL_REQUIRED_RULES
        }
    }

    impl OperationalType for Complete {}

    struct Partial;

    impl ComponentType for Partial {
        fn name(&self) -> &'static str {
            "partial_type"
        }
        fn provided_rules(&self) -> &'static [&'static str] {
            &["power_provision_rule", "startup_cost_rule"]
        }
    }

    impl OperationalType for Partial {}

    fn resolve(tag: &str) -> Option<Box<dyn OperationalType>> {
        match tag {
            "complete_type" => Some(Box::new(Complete)),
            "partial_type" => Some(Box::new(Partial)),
            _ => None,
        }
    }

    #[test]
    fn test_load_and_get() {
        let registry: Registry<dyn OperationalType> = Registry::load(
            contract::OPERATIONAL_FAMILY,
            ["complete_type", "complete_type"],
            resolve,
            contract::OPERATIONAL_REQUIRED_RULES,
        )
        .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("complete_type").unwrap().name(), "complete_type");
    }

    #[test]
    fn test_unknown_tag_names_offender() {
        let err = Registry::<dyn OperationalType>::load(
            contract::OPERATIONAL_FAMILY,
            ["unknown_type"],
            resolve,
            contract::OPERATIONAL_REQUIRED_RULES,
        )
        .unwrap_err();

        assert!(matches!(err, CepError::UnknownTypeTag { .. }));
        assert!(err.to_string().contains("unknown_type"));
    }

    #[test]
    fn test_missing_capability_names_tag_and_rule() {
        let err = Registry::<dyn OperationalType>::load(
            contract::OPERATIONAL_FAMILY,
            ["partial_type"],
            resolve,
            contract::OPERATIONAL_REQUIRED_RULES,
        )
        .unwrap_err();

        match &err {
            CepError::MissingCapability { tag, rule, .. } => {
                assert_eq!(tag, "partial_type");
                assert_eq!(*rule, "shutdown_cost_rule");
            }
            other => panic!("expected MissingCapability, got {:?}", other),
        }
    }

    #[test]
    fn test_get_unloaded_tag_is_unknown() {
        let registry: Registry<dyn OperationalType> = Registry::load(
            contract::OPERATIONAL_FAMILY,
            ["complete_type"],
            resolve,
            contract::OPERATIONAL_REQUIRED_RULES,
        )
        .unwrap();

        // partial_type exists in the namespace but was not requested
        let err = registry.get("partial_type").unwrap_err();
        assert!(matches!(err, CepError::UnknownTypeTag { .. }));
    }

    #[test]
    fn test_loading_is_idempotent() {
        for _ in 0..3 {
            let registry: Registry<dyn OperationalType> = Registry::load(
                contract::OPERATIONAL_FAMILY,
                ["complete_type"],
                resolve,
                contract::OPERATIONAL_REQUIRED_RULES,
            )
            .unwrap();
            assert_eq!(registry.len(), 1);
        }
    }
}
