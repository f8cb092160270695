use crate::types::{Instance, TypeInfo};

pub mod arc;
pub mod dependencies;

/// Turns a type-erased component value into the type a dependency record asks for
pub trait Resolver: Sized + Send + 'static {
    /// The component result type this resolver accepts
    fn type_info() -> TypeInfo;

    /// Returns the actual type name if the instance has a different type
    fn resolve(instance: Instance) -> Result<Self, &'static str>;
}
