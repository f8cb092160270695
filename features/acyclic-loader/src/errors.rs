use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, TypeInfo};

/// Errors in the definition of the components, found while building the graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A component was registered without a name
    #[error("expected every component to have a name, but found an empty one")]
    EmptyName,
    /// A name has been registered twice
    #[error("component '{component}' has been registered twice")]
    Duplicate { component: String },
    /// The constructor or its dependency record is malformed
    #[error("invalid definition of '{component}': {message}")]
    InvalidShape { component: String, message: String },
    #[error("'{component}' depends on undefined component '{dependency}'")]
    UndefinedDependency {
        component: String,
        dependency: String,
    },
    /// `actual` is `None` when the dependency has no result type
    #[error(
        "'{component}' depends on component '{dependency}' with type {}, but '{component}' expects {expected}",
        .actual.map_or("()", |actual| actual.type_name)
    )]
    TypeMismatch {
        component: String,
        dependency: String,
        expected: TypeInfo,
        actual: Option<TypeInfo>,
    },
    #[error("dependency cycle detected: '{}'", .cycle.join("' -> '"))]
    Cycle { component: String, cycle: Vec<String> },
}
impl DefinitionError {
    /// Name of the offending component
    pub fn component(&self) -> &str {
        match self {
            DefinitionError::EmptyName => "",
            DefinitionError::Duplicate { component }
            | DefinitionError::InvalidShape { component, .. }
            | DefinitionError::UndefinedDependency { component, .. }
            | DefinitionError::TypeMismatch { component, .. }
            | DefinitionError::Cycle { component, .. } => component,
        }
    }
}

/// Errors while loading a component
///
/// Results are cached, so every error must be cheap to clone
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("cannot load undefined component '{0}'")]
    UndefinedComponent(String),
    /// The constructor of the component itself failed
    #[error("component '{component}' failed to load: {error}")]
    ConstructorFailed {
        component: String,
        error: Arc<DynError>,
    },
    #[error(transparent)]
    Dependency(#[from] DependencyLoadError),
    /// The dependency record could not be bound from the loaded values
    #[error("could not bind dependencies of '{component}': {error}")]
    Bind {
        component: String,
        #[source]
        error: BindError,
    },
    #[error("component '{component}' has type '{actual_type}', but '{required_type}' was requested")]
    DowncastFailed {
        component: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
}
impl LoadError {
    /// Wraps the failure of `dependency` for the component `component`
    ///
    /// A failure that already is a [`DependencyLoadError`] gets extended instead of nested
    pub(crate) fn for_dependent(self, component: &str, dependency: &str) -> LoadError {
        match self {
            LoadError::Dependency(inner) => inner.extend(component).into(),
            error => DependencyLoadError {
                trace: vec![component.to_string(), dependency.to_string()],
                error: Arc::new(error),
            }
            .into(),
        }
    }
}

/// A dependency of a component failed to load
///
/// The trace runs from the requested component to the component that originally failed
#[derive(Error, Debug, Clone)]
#[error("failed to load dependency {}: {error}", .trace.join(" -> "))]
pub struct DependencyLoadError {
    trace: Vec<String>,
    error: Arc<LoadError>,
}
impl DependencyLoadError {
    fn extend(self, component: &str) -> Self {
        let mut trace = Vec::with_capacity(self.trace.len() + 1);
        trace.push(component.to_string());
        trace.extend(self.trace);

        Self {
            trace,
            error: self.error,
        }
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// The failure of the last component in the trace
    pub fn root_cause(&self) -> &LoadError {
        &self.error
    }
}

/// Errors when binding a dependency record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("dependency '{0}' was not resolved")]
    Missing(String),
    #[error("dependency '{dependency}' has type '{actual_type}', but '{required_type}' was required")]
    DowncastFailed {
        dependency: String,
        required_type: &'static str,
        actual_type: &'static str,
    },
}

/// Errors when deriving a graph with overwritten components
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverwriteError {
    #[error("cannot overwrite undefined component '{0}'")]
    UndefinedComponent(String),
    #[error("cannot overwrite '{component}' of type {expected} with a value of type {actual}")]
    TypeMismatch {
        component: String,
        expected: TypeInfo,
        actual: TypeInfo,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn failure(component: &str) -> LoadError {
        LoadError::ConstructorFailed {
            component: component.to_string(),
            error: Arc::new("boom".into()),
        }
    }

    #[test]
    fn dependency_traces_are_prepended_not_nested() {
        let error = failure("C")
            .for_dependent("B", "C")
            .for_dependent("A", "B");

        let error = match error {
            LoadError::Dependency(error) => error,
            other => panic!("expected a dependency error, got {other:?}"),
        };
        assert_eq!(error.trace(), ["A", "B", "C"]);
        assert!(matches!(
            error.root_cause(),
            LoadError::ConstructorFailed { component, .. } if component == "C"
        ));
        assert_eq!(
            error.to_string(),
            "failed to load dependency A -> B -> C: component 'C' failed to load: boom"
        );
    }

    #[test]
    fn cycle_message_lists_the_whole_loop() {
        let error = DefinitionError::Cycle {
            component: "B".to_string(),
            cycle: vec!["B".to_string(), "C".to_string(), "B".to_string()],
        };
        assert_eq!(error.to_string(), "dependency cycle detected: 'B' -> 'C' -> 'B'");
        assert_eq!(error.component(), "B");
    }
}
