//! Factories that take a runtime parameter.
//!
//! A [`ParameterizedFactory`] is resolved like any other service and then
//! called with a value to pick or configure what it builds, for example an
//! authentication strategy chosen by provider name.

use std::fmt;
use std::sync::Arc;

use crate::container::LifetimeScope;
use crate::error::Result;
use crate::registry::{Factory, Instance, Resolver};

type CreateFn<P, I> = dyn Fn(&dyn Resolver, P) -> Result<Arc<I>> + Send + Sync;

/// Builds an `I` from a parameter `P`, resolving from the scope it was
/// resolved in.
pub struct ParameterizedFactory<P, I: ?Sized> {
    scope: LifetimeScope,
    create: Arc<CreateFn<P, I>>,
}

impl<P, I: ?Sized> ParameterizedFactory<P, I> {
    pub fn create(&self, parameter: P) -> Result<Arc<I>> {
        let resolver: &dyn Resolver = &self.scope;
        (self.create)(resolver, parameter)
    }

    /// The scope instances are resolved from.
    pub fn scope(&self) -> &LifetimeScope {
        &self.scope
    }
}

impl<P, I: ?Sized> fmt::Debug for ParameterizedFactory<P, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterizedFactory")
            .field("parameter", &std::any::type_name::<P>())
            .field("service", &std::any::type_name::<I>())
            .finish()
    }
}

/// Factory producing a new [`ParameterizedFactory`] bound to the resolving
/// scope.
pub fn parameterized<P, I>(
    create: impl Fn(&dyn Resolver, P) -> Result<Arc<I>> + Send + Sync + 'static,
) -> Factory
where
    P: 'static,
    I: ?Sized + Send + Sync + 'static,
{
    let create: Arc<CreateFn<P, I>> = Arc::new(create);
    Arc::new(move |resolver: &dyn Resolver| {
        let factory = ParameterizedFactory {
            scope: resolver.lifetime_scope(),
            create: create.clone(),
        };
        Ok(Arc::new(Arc::new(factory)) as Instance)
    })
}
