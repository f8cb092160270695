use std::collections::{BTreeMap, HashSet};

use crate::{component::ComponentSpec, errors::DefinitionError};

/// Validated graph of all components
///
/// Immutable once built, shared between a loader and every graph derived from it
#[derive(Debug)]
pub(crate) struct DependencyGraph {
    map: BTreeMap<String, ComponentSpec>,
}
impl DependencyGraph {
    /// Builds and validates the graph
    ///
    /// Components are checked in name order, so the first error reported is always the same
    pub(crate) fn new(mut registrations: Vec<(String, ComponentSpec)>) -> Result<Self, DefinitionError> {
        // Stable sort - duplicates keep their registration order
        registrations.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut map = BTreeMap::new();
        for (name, spec) in registrations {
            if name.is_empty() {
                return Err(DefinitionError::EmptyName);
            }
            if map.contains_key(&name) {
                return Err(DefinitionError::Duplicate { component: name });
            }
            map.insert(name, spec);
        }

        let graph = Self { map };
        for (name, spec) in &graph.map {
            graph.check_shape(name, spec)?;
            graph.check_dependencies(name, spec)?;
        }
        graph.check_cycles()?;

        Ok(graph)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.map.get(name)
    }

    /// Component names in sorted order
    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    fn check_shape(&self, name: &str, spec: &ComponentSpec) -> Result<(), DefinitionError> {
        let mut seen = HashSet::new();
        for dependency in spec.dependencies() {
            if dependency.name.is_empty() {
                return Err(DefinitionError::InvalidShape {
                    component: name.to_string(),
                    message: "dependency record declares a field without a component name"
                        .to_string(),
                });
            }
            if !seen.insert(dependency.name.as_str()) {
                return Err(DefinitionError::InvalidShape {
                    component: name.to_string(),
                    message: format!(
                        "dependency record declares '{}' more than once",
                        dependency.name
                    ),
                });
            }
        }

        Ok(())
    }

    fn check_dependencies(&self, name: &str, spec: &ComponentSpec) -> Result<(), DefinitionError> {
        for dependency in spec.dependencies() {
            let Some(target) = self.map.get(&dependency.name) else {
                return Err(DefinitionError::UndefinedDependency {
                    component: name.to_string(),
                    dependency: dependency.name.clone(),
                });
            };

            if target.result() != Some(dependency.type_info) {
                return Err(DefinitionError::TypeMismatch {
                    component: name.to_string(),
                    dependency: dependency.name.clone(),
                    expected: dependency.type_info,
                    actual: target.result(),
                });
            }
        }

        Ok(())
    }

    /// Depth first search for cycles, reporting the first one found in name order
    fn check_cycles(&self) -> Result<(), DefinitionError> {
        // Components from which no cycle is reachable
        let mut checked = HashSet::new();
        for name in self.map.keys() {
            let mut dependency_chain = vec![name.as_str()];
            if let Some(cycle) = check_recurse(self, &mut checked, &mut dependency_chain) {
                return Err(DefinitionError::Cycle {
                    component: cycle[0].clone(),
                    cycle,
                });
            }
        }

        return Ok(());

        fn check_recurse<'a>(
            graph: &'a DependencyGraph,
            checked: &mut HashSet<&'a str>,
            dependency_chain: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            let current = *dependency_chain.last().expect("chain starts with a component");
            if checked.contains(current) {
                return None;
            }

            for dependency in graph.map[current].dependencies() {
                let dependency = dependency.name.as_str();

                // Circular Dependency Check
                if let Some(start) = dependency_chain.iter().position(|name| *name == dependency) {
                    let mut cycle: Vec<String> = dependency_chain[start..]
                        .iter()
                        .map(|name| name.to_string())
                        .collect();
                    cycle.push(dependency.to_string());
                    return Some(cycle);
                }

                dependency_chain.push(dependency);
                if let Some(cycle) = check_recurse(graph, checked, dependency_chain) {
                    return Some(cycle);
                }
                dependency_chain.pop();
            }

            checked.insert(current);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::TypeInfo;

    crate::dependencies! {
        struct NeedsA { a: Arc<i64> => "A" }
    }
    crate::dependencies! {
        struct NeedsB { b: Arc<i64> => "B" }
    }
    crate::dependencies! {
        struct NeedsC { c: Arc<i64> => "C" }
    }
    crate::dependencies! {
        struct NeedsBTwice {
            first: Arc<i64> => "B",
            second: Arc<i64> => "B",
        }
    }

    fn constant() -> ComponentSpec {
        ComponentSpec::new(|| async { 5_i64 })
    }

    fn needs<D: crate::Dependencies>() -> ComponentSpec {
        ComponentSpec::with_dependencies(|_: D| async { 5_i64 })
    }

    fn build(components: Vec<(&str, ComponentSpec)>) -> Result<DependencyGraph, DefinitionError> {
        DependencyGraph::new(
            components
                .into_iter()
                .map(|(name, spec)| (name.to_string(), spec))
                .collect(),
        )
    }

    fn cycle_of(error: DefinitionError) -> Vec<String> {
        match error {
            DefinitionError::Cycle { cycle, .. } => cycle,
            error => panic!("expected a cycle, got {error}"),
        }
    }

    #[test]
    fn accepts_acyclic_graph() {
        let graph = build(vec![
            ("A", needs::<NeedsB>()),
            ("B", needs::<NeedsC>()),
            ("C", constant()),
        ])
        .unwrap();
        assert_eq!(graph.names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn detects_self_dependency() {
        let error = build(vec![("A", needs::<NeedsA>())]).unwrap_err();
        assert_eq!(error.component(), "A");
        assert_eq!(cycle_of(error), vec!["A", "A"]);
    }

    #[test]
    fn detects_cycle_behind_a_dependency() {
        let error = build(vec![
            ("A", needs::<NeedsB>()),
            ("B", needs::<NeedsC>()),
            ("C", needs::<NeedsB>()),
        ])
        .unwrap_err();
        assert_eq!(error.component(), "B");
        assert_eq!(cycle_of(error), vec!["B", "C", "B"]);
    }

    #[test]
    fn detects_long_cycle() {
        let error = build(vec![
            ("C", needs::<NeedsA>()),
            ("B", needs::<NeedsC>()),
            ("A", needs::<NeedsB>()),
        ])
        .unwrap_err();
        assert_eq!(cycle_of(error), vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn rejects_undefined_dependency() {
        let error = build(vec![("A", needs::<NeedsB>())]).unwrap_err();
        assert_eq!(
            error,
            DefinitionError::UndefinedDependency {
                component: "A".to_string(),
                dependency: "B".to_string(),
            }
        );
        assert_eq!(error.to_string(), "'A' depends on undefined component 'B'");
    }

    #[test]
    fn rejects_type_mismatch() {
        let error = build(vec![
            ("A", needs::<NeedsB>()),
            ("B", ComponentSpec::new(|| async { 5_f64 })),
        ])
        .unwrap_err();
        assert_eq!(
            error,
            DefinitionError::TypeMismatch {
                component: "A".to_string(),
                dependency: "B".to_string(),
                expected: TypeInfo::of::<i64>(),
                actual: Some(TypeInfo::of::<f64>()),
            }
        );
        assert_eq!(
            error.to_string(),
            "'A' depends on component 'B' with type f64, but 'A' expects i64"
        );
    }

    #[test]
    fn components_without_result_match_nothing() {
        let error = build(vec![
            ("A", needs::<NeedsB>()),
            ("B", ComponentSpec::new(|| async {})),
        ])
        .unwrap_err();
        assert!(matches!(
            error,
            DefinitionError::TypeMismatch { actual: None, .. }
        ));
    }

    #[test]
    fn rejects_malformed_registrations() {
        let error = build(vec![("A", constant()), ("A", constant())]).unwrap_err();
        assert_eq!(error, DefinitionError::Duplicate { component: "A".to_string() });

        let error = build(vec![("", constant())]).unwrap_err();
        assert_eq!(error, DefinitionError::EmptyName);

        let error = build(vec![("A", needs::<NeedsBTwice>()), ("B", constant())]).unwrap_err();
        assert!(matches!(error, DefinitionError::InvalidShape { component, .. } if component == "A"));
    }

    #[test]
    fn reports_first_error_in_name_order() {
        // Both are broken, 'A' comes first regardless of registration order
        let error = build(vec![
            ("Z", needs::<NeedsC>()),
            ("A", needs::<NeedsC>()),
        ])
        .unwrap_err();
        assert_eq!(error.component(), "A");
    }
}
