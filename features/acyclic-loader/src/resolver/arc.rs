use std::sync::Arc;

use crate::{
    resolver::Resolver,
    types::{Injectable, Instance, TypeInfo},
};

impl<T: Injectable> Resolver for Arc<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn resolve(instance: Instance) -> Result<Self, &'static str> {
        instance.downcast::<T>()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{resolver::Resolver, types::Instance};

    #[test]
    fn resolves_matching_type() {
        let resolved = <Arc<u16> as Resolver>::resolve(Instance::new(80u16)).unwrap();
        assert_eq!(*resolved, 80);
    }

    #[test]
    fn reports_actual_type_on_mismatch() {
        let err = <Arc<u16> as Resolver>::resolve(Instance::new("80".to_string())).unwrap_err();
        assert_eq!(err, std::any::type_name::<String>());
    }
}
