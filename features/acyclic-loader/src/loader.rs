use std::{
    any::type_name,
    collections::HashMap,
    fmt::Debug,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use futures::{
    future::{self, BoxFuture, Either, Ready, Shared},
    FutureExt,
};

use crate::{
    component::ConstructError,
    dependency_graph::DependencyGraph,
    errors::{LoadError, OverwriteError},
    overwrites::Overwrites,
    resolver::dependencies::ResolvedDependencies,
    types::{DependencyInfo, Injectable, Instance, TypeInfo},
};

type LoadResult = Result<Instance, LoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;
type LoadFuture = Either<Ready<LoadResult>, SharedLoad>;

/// Runs a dispatched load as a task of its own, e.g. `|task| { tokio::spawn(task); }`
pub type Spawner = Arc<dyn Fn(BoxFuture<'static, ()>) + Send + Sync>;

/// Per component state of a loader
enum LoadState {
    /// Never requested
    Pending,
    /// Load dispatched - every waiter awaits the same shared future
    InFlight(SharedLoad),
    /// Terminal, never changes again
    Done(LoadResult),
}

/// Load progress of a single component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Loading,
    Loaded,
    Failed,
}

/// Loads components of a validated graph, with maximum concurrency
///
/// Every component is constructed at most once per `LoaderGraph`, successes and failures are
/// cached alike. Use [`Clone`] or [`LoaderGraph::with_overwrites`] to get a graph with a
/// separate cache.
///
/// Without a [`Spawner`] a load only makes progress while one of its requesters is polled.
/// A load whose requesters were all dropped stays in flight and resumes with the next request.
pub struct LoaderGraph(Arc<LoaderGraphInner>);
struct LoaderGraphInner {
    graph: Arc<DependencyGraph>,
    spawner: Option<Spawner>,
    states: Mutex<HashMap<String, LoadState>>,
}
impl LoaderGraphInner {
    // Critical sections never panic, so a poisoned lock still holds consistent state
    fn states(&self) -> MutexGuard<'_, HashMap<String, LoadState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for LoaderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("LoaderGraph");
        for name in self.0.graph.names() {
            let status = match self.status(name) {
                Some(LoadStatus::Pending) | None => "pending",
                Some(LoadStatus::Loading) => "loading",
                Some(LoadStatus::Loaded) => "loaded",
                Some(LoadStatus::Failed) => "failed",
            };
            map.field(name, &status);
        }
        map.finish()
    }
}

impl LoaderGraph {
    pub(crate) fn new(graph: DependencyGraph, spawner: Option<Spawner>) -> Self {
        let states = graph
            .names()
            .map(|name| (name.to_string(), LoadState::Pending))
            .collect();

        Self::from_parts(Arc::new(graph), spawner, states)
    }

    fn from_parts(
        graph: Arc<DependencyGraph>,
        spawner: Option<Spawner>,
        states: HashMap<String, LoadState>,
    ) -> Self {
        Self(Arc::new(LoaderGraphInner {
            graph,
            spawner,
            states: Mutex::new(states),
        }))
    }

    /// Loads a component and all of its dependencies
    ///
    /// The component is marked as loading right away, so no other request starts it a second
    /// time. The returned future keeps the loader alive until the load is done, it may outlive
    /// `self` or be dropped without affecting other waiters.
    pub fn load(&self, name: &str) -> impl Future<Output = LoadResult> + Send + 'static {
        let loader = self.0.clone();
        let load = dispatch(&self.0, name);
        async move {
            let _loader = loader;
            load.await
        }
    }

    /// Loads a component and downcasts it into its concrete type
    pub fn load_as<T: Injectable>(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Arc<T>, LoadError>> + Send + 'static {
        let component = name.to_string();
        self.load(name).map(move |result| {
            result?
                .downcast::<T>()
                .map_err(|actual_type| LoadError::DowncastFailed {
                    component,
                    required_type: type_name::<T>(),
                    actual_type,
                })
        })
    }

    /// Loads a component, for top level wiring where a failure can't be handled
    ///
    /// # Panics
    /// If the component or one of its dependencies failed to load
    pub async fn must_load(&self, name: &str) -> Instance {
        match self.load(name).await {
            Ok(instance) => instance,
            Err(error) => panic!("{error}"),
        }
    }

    /// Typed version of [`LoaderGraph::must_load`]
    ///
    /// # Panics
    /// If the component failed to load or has a different type
    pub async fn must_load_as<T: Injectable>(&self, name: &str) -> Arc<T> {
        match self.load_as::<T>(name).await {
            Ok(instance) => instance,
            Err(error) => panic!("{error}"),
        }
    }

    /// Returns a loader where the given components are replaced by fixed values
    ///
    /// Cached results are kept, unless they depend on an overwritten component.
    pub fn with_overwrites(&self, overwrites: Overwrites) -> Result<LoaderGraph, OverwriteError> {
        let graph = &self.0.graph;

        for (name, instance) in &overwrites.values {
            let Some(spec) = graph.get(name) else {
                return Err(OverwriteError::UndefinedComponent(name.clone()));
            };
            let expected = spec.result().unwrap_or_else(TypeInfo::of::<()>);
            if expected != instance.info {
                return Err(OverwriteError::TypeMismatch {
                    component: name.clone(),
                    expected,
                    actual: instance.info,
                });
            }
        }

        let mut purge = HashMap::new();
        let source = self.0.states();
        let states = graph
            .names()
            .map(|name| {
                let state = if let Some(instance) = overwrites.values.get(name) {
                    LoadState::Done(Ok(instance.clone()))
                } else if needs_purging(graph, &overwrites, &mut purge, name) {
                    LoadState::Pending
                } else {
                    copy_state(source.get(name))
                };
                (name.to_string(), state)
            })
            .collect();
        drop(source);

        tracing::debug!(
            "Derived loader graph with {} overwritten components",
            overwrites.len()
        );

        return Ok(Self::from_parts(graph.clone(), self.0.spawner.clone(), states));

        fn needs_purging<'a>(
            graph: &'a DependencyGraph,
            overwrites: &Overwrites,
            purge: &mut HashMap<&'a str, bool>,
            name: &'a str,
        ) -> bool {
            if let Some(known) = purge.get(name) {
                return *known;
            }

            let result = overwrites.contains(name)
                || graph.get(name).is_some_and(|spec| {
                    spec.dependencies()
                        .iter()
                        .any(|dependency| needs_purging(graph, overwrites, purge, &dependency.name))
                });

            purge.insert(name, result);
            result
        }
    }

    /// Load progress of the component, `None` if it is not defined
    pub fn status(&self, name: &str) -> Option<LoadStatus> {
        let states = self.0.states();
        let status = match states.get(name)? {
            LoadState::Pending => LoadStatus::Pending,
            LoadState::InFlight(_) => LoadStatus::Loading,
            LoadState::Done(Ok(_)) => LoadStatus::Loaded,
            LoadState::Done(Err(_)) => LoadStatus::Failed,
        };
        Some(status)
    }

    /// Names of all components in sorted order
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.0.graph.names()
    }

    /// Declared dependencies of a component, `None` if it is not defined
    pub fn dependencies_of(&self, name: &str) -> Option<&[DependencyInfo]> {
        self.0.graph.get(name).map(|spec| spec.dependencies())
    }
}

/// Copies the cache, components still loading in `self` start over in the copy
impl Clone for LoaderGraph {
    fn clone(&self) -> Self {
        let states = self
            .0
            .states()
            .iter()
            .map(|(name, state)| (name.clone(), copy_state(Some(state))))
            .collect();

        tracing::debug!("Cloned loader graph");
        Self::from_parts(self.0.graph.clone(), self.0.spawner.clone(), states)
    }
}

/// Only terminal states survive a copy, a copy never waits on another graph's loads
fn copy_state(state: Option<&LoadState>) -> LoadState {
    match state {
        Some(LoadState::Done(result)) => LoadState::Done(result.clone()),
        Some(LoadState::InFlight(_)) | Some(LoadState::Pending) | None => LoadState::Pending,
    }
}

/// Returns the cached result, joins an in flight load, or starts a new one
fn dispatch(inner: &Arc<LoaderGraphInner>, name: &str) -> LoadFuture {
    let mut states = inner.states();
    let Some(state) = states.get_mut(name) else {
        tracing::error!("Tried to load an undefined component: '{}'", name);
        return Either::Left(future::ready(Err(LoadError::UndefinedComponent(
            name.to_string(),
        ))));
    };

    let load = match state {
        LoadState::Done(result) => return Either::Left(future::ready(result.clone())),
        LoadState::InFlight(load) => return Either::Right(load.clone()),
        LoadState::Pending => {
            tracing::debug!("Dispatching load of '{}'", name);
            let load = load_component(Arc::downgrade(inner), name.to_string())
                .boxed()
                .shared();
            *state = LoadState::InFlight(load.clone());
            load
        }
    };
    drop(states);

    if let Some(spawner) = &inner.spawner {
        let loader = inner.clone();
        let task = load.clone();
        spawner(
            async move {
                let _loader = loader;
                let _ = task.await;
            }
            .boxed(),
        );
    }

    Either::Right(load)
}

/// The in flight state owns the load, so it only holds a weak reference to the loader.
/// Every poll goes through [`LoaderGraph::load`], a spawned task or a dependent's load,
/// all of which keep the loader alive.
fn upgrade(inner: &Weak<LoaderGraphInner>) -> Arc<LoaderGraphInner> {
    inner
        .upgrade()
        .expect("loads are only polled while their loader is alive")
}

/// Loads all dependencies concurrently, then runs the constructor and stores the result
async fn load_component(inner: Weak<LoaderGraphInner>, name: String) -> LoadResult {
    let loader = upgrade(&inner);
    let graph = loader.graph.clone();
    let Some(spec) = graph.get(&name) else {
        return Err(LoadError::UndefinedComponent(name));
    };

    // Fan out - every dependency not yet in flight starts loading now
    let waits: Vec<_> = spec
        .dependencies()
        .iter()
        .map(|dependency| dispatch(&loader, &dependency.name))
        .collect();
    drop(loader);

    let outcomes = future::join_all(waits).await;

    let result = match bind_dependencies(&inner, &name, spec.dependencies(), outcomes) {
        Err(error) => {
            tracing::debug!("Skipping constructor of '{}', a dependency failed", name);
            Err(error)
        }
        Ok(resolved) => match spec.construct(resolved).await {
            Ok(instance) => {
                tracing::debug!(
                    "Constructed instance of '{}' ({})",
                    name,
                    instance.info.type_name
                );
                Ok(instance)
            }
            Err(ConstructError::Failed(error)) => {
                tracing::warn!("Constructor of '{}' failed: {}", name, error);
                Err(LoadError::ConstructorFailed {
                    component: name.clone(),
                    error: Arc::new(error),
                })
            }
            Err(ConstructError::Bind(error)) => Err(LoadError::Bind {
                component: name.clone(),
                error,
            }),
        },
    };

    // Terminal write - the shared future wakes every waiter once this returns
    upgrade(&inner)
        .states()
        .insert(name, LoadState::Done(result.clone()));

    result
}

/// Collects the loaded dependency values, or the first failure in declaration order
fn bind_dependencies(
    inner: &Weak<LoaderGraphInner>,
    name: &str,
    dependencies: &[DependencyInfo],
    outcomes: Vec<LoadResult>,
) -> Result<ResolvedDependencies, LoadError> {
    let loader = upgrade(inner);
    let states = loader.states();

    let mut resolved = ResolvedDependencies::new();
    for (dependency, outcome) in dependencies.iter().zip(outcomes) {
        // The cell is authoritative - it holds exactly what the awaited load produced
        let result = match states.get(&dependency.name) {
            Some(LoadState::Done(result)) => result.clone(),
            _ => outcome,
        };

        match result {
            Ok(instance) => resolved.insert(dependency.name.clone(), instance),
            Err(error) => return Err(error.for_dependent(name, &dependency.name)),
        }
    }

    Ok(resolved)
}
