use std::{convert::Infallible, fmt::Debug, future::Future, sync::Arc};

use futures::{
    future::{self, BoxFuture},
    FutureExt,
};

use crate::{
    errors::BindError,
    resolver::dependencies::{Dependencies, ResolvedDependencies},
    types::{DependencyInfo, DynError, Injectable, Instance, TypeInfo},
};

/// Failure of a type-erased constructor call
pub(crate) enum ConstructError {
    Bind(BindError),
    Failed(DynError),
}

type DynConstructor = Arc<
    dyn Fn(ResolvedDependencies) -> BoxFuture<'static, Result<Instance, ConstructError>>
        + Send
        + Sync,
>;

/// A zero-argument constructor takes no dependency record
impl Dependencies for () {
    fn declare() -> Vec<DependencyInfo> {
        Vec::new()
    }

    fn bind(_: &mut ResolvedDependencies) -> Result<Self, BindError> {
        Ok(())
    }
}

/// Static description of one component
///
/// Holds the type-erased constructor together with everything the graph needs to know
/// about its shape: the declared dependencies, the result type and whether it may fail.
pub struct ComponentSpec {
    constructor: DynConstructor,
    dependencies: Vec<DependencyInfo>,
    /// `None` if the constructor only produces `()`
    result: Option<TypeInfo>,
    fallible: bool,
}
impl Debug for ComponentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSpec")
            .field("dependencies", &self.dependencies)
            .field("result", &self.result.map(|info| info.type_name))
            .field("fallible", &self.fallible)
            .finish()
    }
}

impl ComponentSpec {
    /// `Fn() -> T`
    pub fn new<F, Fut, T>(constructor: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Injectable,
    {
        Self::with_dependencies(move |()| constructor())
    }

    /// `Fn() -> Result<T, E>`
    pub fn fallible<F, Fut, T, E>(constructor: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError> + 'static,
    {
        Self::fallible_with_dependencies(move |()| constructor())
    }

    /// `Fn(Dependencies) -> T`
    pub fn with_dependencies<D, F, Fut, T>(constructor: F) -> Self
    where
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Injectable,
    {
        let mut spec = Self::fallible_with_dependencies(move |dependencies: D| {
            constructor(dependencies).map(Ok::<T, Infallible>)
        });
        spec.fallible = false;
        spec
    }

    /// `Fn(Dependencies) -> Result<T, E>`
    pub fn fallible_with_dependencies<D, F, Fut, T, E>(constructor: F) -> Self
    where
        D: Dependencies,
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable,
        E: Into<DynError> + 'static,
    {
        let result = TypeInfo::of::<T>();

        let constructor: DynConstructor = Arc::new(
            move |mut resolved: ResolvedDependencies| -> BoxFuture<'static, Result<Instance, ConstructError>> {
                let dependencies = match D::bind(&mut resolved) {
                    Ok(dependencies) => dependencies,
                    Err(error) => return future::ready(Err(ConstructError::Bind(error))).boxed(),
                };

                constructor(dependencies)
                    .map(|result| {
                        result
                            .map(Instance::new)
                            .map_err(|error| ConstructError::Failed(error.into()))
                    })
                    .boxed()
            },
        );

        ComponentSpec {
            constructor,
            dependencies: D::declare(),
            result: (!result.is_unit()).then_some(result),
            fallible: true,
        }
    }

    /// Dependencies in the order the dependency record declares them
    pub fn dependencies(&self) -> &[DependencyInfo] {
        &self.dependencies
    }

    /// The declared result type, `None` if the constructor produces only `()`
    pub fn result(&self) -> Option<TypeInfo> {
        self.result
    }

    pub fn is_fallible(&self) -> bool {
        self.fallible
    }

    /// Invokes the constructor with the loaded dependency values
    pub(crate) fn construct(
        &self,
        resolved: ResolvedDependencies,
    ) -> BoxFuture<'static, Result<Instance, ConstructError>> {
        (self.constructor)(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Arc};

    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;

    crate::dependencies! {
        struct PlusOptions {
            base: Arc<i64> => "Base",
        }
    }

    #[test]
    fn describes_the_four_shapes() {
        let plain = ComponentSpec::new(|| async { 5_i64 });
        assert!(plain.dependencies().is_empty());
        assert_eq!(plain.result(), Some(TypeInfo::of::<i64>()));
        assert!(!plain.is_fallible());

        let fallible = ComponentSpec::fallible(|| async { Ok::<_, io::Error>(5_i64) });
        assert!(fallible.is_fallible());

        let with_dependencies =
            ComponentSpec::with_dependencies(|options: PlusOptions| async move { *options.base + 7 });
        assert_eq!(with_dependencies.dependencies()[0].name, "Base");
        assert!(!with_dependencies.is_fallible());

        let error_only = ComponentSpec::fallible_with_dependencies(|_: PlusOptions| async {
            Err::<(), _>(io::Error::other("nope"))
        });
        assert_eq!(error_only.result(), None);
        assert!(error_only.is_fallible());
    }

    #[test]
    fn construct_binds_dependencies() {
        let spec =
            ComponentSpec::with_dependencies(|options: PlusOptions| async move { *options.base + 7 });

        let mut resolved = ResolvedDependencies::new();
        resolved.insert("Base", Instance::new(5_i64));

        let Ok(instance) = block_on(spec.construct(resolved)) else {
            panic!("construct failed");
        };
        assert_eq!(*instance.downcast::<i64>().unwrap(), 12);
    }

    #[test]
    fn construct_reports_failures() {
        let spec = ComponentSpec::fallible(|| async { Err::<i64, _>(io::Error::other("nope")) });
        assert!(matches!(
            block_on(spec.construct(ResolvedDependencies::new())),
            Err(ConstructError::Failed(error)) if error.to_string() == "nope"
        ));

        let spec =
            ComponentSpec::with_dependencies(|options: PlusOptions| async move { *options.base });
        assert!(matches!(
            block_on(spec.construct(ResolvedDependencies::new())),
            Err(ConstructError::Bind(BindError::Missing(_)))
        ));
    }
}
