use std::collections::HashMap;

use crate::types::{Injectable, Instance};

/// Values replacing components in a derived [`LoaderGraph`](crate::LoaderGraph)
///
/// Typically used in tests to inject mock objects, or at startup to inject configuration.
#[derive(Debug, Default, Clone)]
pub struct Overwrites {
    pub(crate) values: HashMap<String, Instance>,
}
impl Overwrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the component `name` with `value`
    pub fn set<T: Injectable>(self, name: impl Into<String>, value: T) -> Self {
        self.set_instance(name, Instance::new(value))
    }

    /// Overwrites the component `name` with an already type-erased value
    pub fn set_instance(mut self, name: impl Into<String>, instance: Instance) -> Self {
        self.values.insert(name.into(), instance);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }
}
