use std::{future::Future, sync::Arc};

use futures::future::BoxFuture;

use crate::{
    component::ComponentSpec,
    dependency_graph::DependencyGraph,
    errors::DefinitionError,
    loader::{LoaderGraph, Spawner},
    resolver::dependencies::Dependencies,
    types::{DynError, Injectable, Instance},
};

//////////////////////////////////////////////////////////////////////
///
/// Loading consists of two parts.
/// 1. The GraphBuilder where one registers a constructor for every component
/// 2. The LoaderGraph which loads components on demand
///
/// In between, build validates the registrations once and fails on any invalid definition.

/// Collects component registrations until the graph is built
pub struct GraphBuilder {
    /// Registered components, validated on build
    pub(crate) registrations: Vec<(String, ComponentSpec)>,
    spawner: Option<Spawner>,
}
impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            registrations: Vec::new(),
            spawner: None,
        }
    }
}
impl GraphBuilder {
    /// Registers an already described component
    pub fn add(mut self, name: impl Into<String>, spec: ComponentSpec) -> Self {
        self.registrations.push((name.into(), spec));
        self
    }

    /// Registers a component without dependencies
    pub fn provide<F, Fut, T>(self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Injectable,
    {
        self.add(name, ComponentSpec::new(constructor))
    }

    /// Registers a component without dependencies which may fail
    pub fn try_provide<F, Fut, T, E>(self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError> + 'static,
    {
        self.add(name, ComponentSpec::fallible(constructor))
    }

    /// Registers a component taking a dependency record
    pub fn provide_with<D, F, Fut, T>(self, name: impl Into<String>, constructor: F) -> Self
    where
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Injectable,
    {
        self.add(name, ComponentSpec::with_dependencies(constructor))
    }

    /// Registers a component taking a dependency record which may fail
    pub fn try_provide_with<D, F, Fut, T, E>(self, name: impl Into<String>, constructor: F) -> Self
    where
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError> + 'static,
    {
        self.add(name, ComponentSpec::fallible_with_dependencies(constructor))
    }

    /// Runs every component load as a task of its own
    ///
    /// Loads then keep going when their requester is dropped, and independent components are
    /// constructed in parallel on a multi-threaded executor.
    /// ```ignore
    /// GraphBuilder::new().spawner(|task| {
    ///     tokio::spawn(task);
    /// })
    /// ```
    pub fn spawner<S>(mut self, spawner: S) -> Self
    where
        S: Fn(BoxFuture<'static, ()>) + Send + Sync + 'static,
    {
        self.spawner = Some(Arc::new(spawner));
        self
    }

    /// Validates all registrations and creates a loader with an empty cache
    pub fn build(self) -> Result<LoaderGraph, DefinitionError> {
        tracing::debug!(
            "Building loader graph with {} components",
            self.registrations.len()
        );

        let graph = DependencyGraph::new(self.registrations)?;
        Ok(LoaderGraph::new(graph, self.spawner))
    }

    /// Like [`GraphBuilder::build`], for graphs whose definition is known to be valid
    ///
    /// # Panics
    /// If the definition of the components has an error
    pub fn must_build(self) -> LoaderGraph {
        match self.build() {
            Ok(loader) => loader,
            Err(error) => panic!("invalid component definitions: {error}"),
        }
    }

    /// Builds the graph and loads a single component, for programs needing just one value
    ///
    /// # Panics
    /// If the definition is invalid or the component failed to load
    pub async fn must_load(self, name: &str) -> Instance {
        self.must_build().must_load(name).await
    }
}
