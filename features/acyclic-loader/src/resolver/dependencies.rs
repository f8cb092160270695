use std::collections::HashMap;

use crate::{
    errors::BindError,
    resolver::Resolver,
    types::{DependencyInfo, Instance},
};

/// A record of named dependencies handed to a component constructor
///
/// Every field names another component. [`Dependencies::declare`] lists them in field order,
/// [`Dependencies::bind`] builds the record once all of them are loaded.
///
/// Usually implemented through [`dependencies!`](crate::dependencies).
pub trait Dependencies: Sized + Send + 'static {
    /// Returns the dependencies in declaration order
    fn declare() -> Vec<DependencyInfo>;

    /// Builds the record from the loaded dependency values
    fn bind(resolved: &mut ResolvedDependencies) -> Result<Self, BindError>;
}

/// Loaded dependency values, keyed by component name
#[derive(Debug, Default)]
pub struct ResolvedDependencies {
    values: HashMap<String, Instance>,
}
impl ResolvedDependencies {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, instance: Instance) {
        self.values.insert(name.into(), instance);
    }

    /// Takes the value of a dependency out, converting it into the requested type
    pub fn take<R: Resolver>(&mut self, name: &str) -> Result<R, BindError> {
        let instance = self
            .values
            .remove(name)
            .ok_or_else(|| BindError::Missing(name.to_string()))?;

        R::resolve(instance).map_err(|actual_type| BindError::DowncastFailed {
            dependency: name.to_string(),
            required_type: R::type_info().type_name,
            actual_type,
        })
    }
}

/// Declares a dependency record and implements [`Dependencies`] for it
///
/// Each field is mapped onto the component named after the `=>`.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
///
/// acyclic_loader::dependencies! {
///     pub struct ServerOptions {
///         pub port: Arc<u16> => "Port",
///         pub template: Arc<String> => "Template",
///     }
/// }
/// ```
#[macro_export]
macro_rules! dependencies {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty => $component:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Dependencies for $name {
            fn declare() -> ::std::vec::Vec<$crate::DependencyInfo> {
                ::std::vec![
                    $( $crate::DependencyInfo::new::<$ty>($component) ),*
                ]
            }

            fn bind(
                resolved: &mut $crate::ResolvedDependencies,
            ) -> ::std::result::Result<Self, $crate::BindError> {
                ::std::result::Result::Ok(Self {
                    $( $field: resolved.take::<$ty>($component)?, )*
                })
            }
        }
    };
}
