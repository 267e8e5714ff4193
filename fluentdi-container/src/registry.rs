//! Service registry: what the container knows how to build.
//!
//! Three kinds of entries:
//! - components, a key with a factory and a lifetime
//! - aliases, a service key answered by a component plus an upcast
//! - generic registrations, an open generic service answered by an open
//!   generic implementation, closed on demand through the type catalog

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use fluentdi_support::TypeDescriptor;
use tracing::{debug, trace};

use crate::catalog::TypeCatalog;
use crate::container::LifetimeScope;
use crate::error::{AlreadyRegisteredError, FluentError};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::reflect::{TypeRef, Upcast};

/// A type-erased resolved value.
///
/// Always holds an `Arc<T>` where `T` is the service type, so trait
/// objects and sized types are stored the same way.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds an [`Instance`], resolving its own dependencies through the
/// given [`Resolver`].
pub type Factory = Arc<dyn Fn(&dyn Resolver) -> Result<Instance, FluentError> + Send + Sync>;

/// What factories see of the container.
pub trait Resolver: Send + Sync {
    /// Resolves the type-erased instance registered for `key`.
    fn resolve_key(&self, key: &ServiceKey) -> Result<Instance, FluentError>;

    /// Whether `key` can be resolved.
    fn is_registered_key(&self, key: &ServiceKey) -> bool;

    /// An owned handle to the scope this resolver resolves from.
    fn lifetime_scope(&self) -> LifetimeScope;
}

/// A component: a key, how to build it and how long to keep it.
#[derive(Clone)]
pub(crate) struct Registration {
    pub key: ServiceKey,
    pub lifetime: Lifetime,
    pub factory: Factory,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// A service answered by another component.
#[derive(Clone)]
pub(crate) struct Alias {
    pub component: ServiceKey,
    pub upcast: Upcast,
}

impl std::fmt::Debug for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alias").field("component", &self.component).finish()
    }
}

/// An open generic service mapped to an open generic implementation.
#[derive(Debug, Clone)]
pub(crate) struct GenericRegistration {
    pub implementation: TypeRef,
    pub service: TypeRef,
    pub lifetime: Lifetime,
}

/// How to produce the instance for a requested key.
pub(crate) enum Plan<'a> {
    Component(&'a Registration),
    Aliased {
        component: &'a Registration,
        upcast: &'a Upcast,
    },
    Generic {
        lifetime: Lifetime,
        activator: &'a Factory,
        upcast: &'a Upcast,
    },
}

/// All registrations of a container.
///
/// Filled by the builder, read-only once the container is built.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    registrations: HashMap<ServiceKey, Registration>,
    aliases: HashMap<ServiceKey, Alias>,
    generics: HashMap<ServiceKey, GenericRegistration>,
    types: TypeCatalog,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component.
    ///
    /// # Errors
    /// [`FluentError::AlreadyRegistered`] if `key` already answers and
    /// `allow_override` is false.
    pub fn register(
        &mut self,
        registration: Registration,
        allow_override: bool,
    ) -> Result<(), FluentError> {
        let key = registration.key;
        self.check_vacant(key, allow_override)?;

        debug!(key = %key, lifetime = %registration.lifetime, "Registered component");
        self.aliases.remove(&key);
        self.registrations.insert(key, registration);
        Ok(())
    }

    /// Makes `service` resolve through `alias.component`.
    pub fn register_alias(
        &mut self,
        service: ServiceKey,
        alias: Alias,
        allow_override: bool,
    ) -> Result<(), FluentError> {
        self.check_vacant(service, allow_override)?;

        debug!(service = %service, component = %alias.component, "Registered alias");
        self.registrations.remove(&service);
        self.aliases.insert(service, alias);
        Ok(())
    }

    /// Registers an open generic mapping, keyed by the service definition.
    pub fn register_generic(
        &mut self,
        generic: GenericRegistration,
        allow_override: bool,
    ) -> Result<(), FluentError> {
        let key = generic.service.key();
        if !allow_override && self.generics.contains_key(&key) {
            return Err(FluentError::AlreadyRegistered(AlreadyRegisteredError { key }));
        }

        debug!(
            service = %key,
            implementation = %generic.implementation.key(),
            lifetime = %generic.lifetime,
            "Registered open generic"
        );
        self.generics.insert(key, generic);
        Ok(())
    }

    /// Adds type metadata used to close open generics.
    pub fn add_types(&mut self, catalog: &TypeCatalog) {
        self.types.extend(catalog);
    }

    pub fn types(&self) -> &TypeCatalog {
        &self.types
    }

    /// Works out how `key` would be built, if it can be.
    pub fn plan(&self, key: &ServiceKey) -> Option<Plan<'_>> {
        if let Some(registration) = self.registrations.get(key) {
            return Some(Plan::Component(registration));
        }

        if let Some(alias) = self.aliases.get(key) {
            trace!(service = %key, component = %alias.component, "Following alias");
            let component = self.registrations.get(&alias.component)?;
            return Some(Plan::Aliased {
                component,
                upcast: &alias.upcast,
            });
        }

        self.plan_generic(key)
    }

    fn plan_generic(&self, key: &ServiceKey) -> Option<Plan<'_>> {
        let requested = self.types.get(key)?;
        let definition = requested
            .generic_definition()
            .filter(|definition| !definition.is_same(requested))?;
        let generic = self.generics.get(&definition.key())?;

        let implementation = self
            .types
            .closed_instance_of(&generic.implementation, requested.type_arguments())?;
        trace!(
            service = %key,
            implementation = %implementation.key(),
            "Closing open generic"
        );

        Some(Plan::Generic {
            lifetime: generic.lifetime,
            activator: implementation.activator()?,
            upcast: implementation.upcast_to(key)?,
        })
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.plan(key).is_some()
    }

    /// Number of components and aliases.
    pub fn len(&self) -> usize {
        self.registrations.len() + self.aliases.len()
    }

    pub fn generic_count(&self) -> usize {
        self.generics.len()
    }

    /// Names of everything registered, for "did you mean" suggestions.
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.registrations
            .keys()
            .chain(self.aliases.keys())
            .chain(self.generics.keys())
            .map(ServiceKey::type_name)
            .collect()
    }

    /// Whether `key` already answers as a component or an alias.
    pub fn is_taken(&self, key: &ServiceKey) -> bool {
        self.registrations.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Whether an open generic mapping exists for the service definition `key`.
    pub fn has_generic(&self, key: &ServiceKey) -> bool {
        self.generics.contains_key(key)
    }

    fn check_vacant(&self, key: ServiceKey, allow_override: bool) -> Result<(), FluentError> {
        if self.is_taken(&key) && !allow_override {
            return Err(FluentError::AlreadyRegistered(AlreadyRegisteredError { key }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{Implements, Open, TypeInfo};

    trait Repository<T>: Send + Sync {}

    struct GenericRepository<T>(std::marker::PhantomData<fn() -> T>);
    struct Customer;

    impl<T: 'static> Implements<dyn Repository<T>> for GenericRepository<T> {
        fn upcast(self: Arc<Self>) -> Arc<dyn Repository<T>> {
            self
        }
    }

    impl<T: 'static> Repository<T> for GenericRepository<T> {}

    fn constant_factory() -> Factory {
        Arc::new(|_: &dyn Resolver| Ok(Arc::new(Arc::new(7u8)) as Instance))
    }

    fn component(key: ServiceKey) -> Registration {
        Registration {
            key,
            lifetime: Lifetime::Singleton,
            factory: constant_factory(),
        }
    }

    #[test]
    fn register_and_plan() {
        let mut registry = Registry::new();
        let key = ServiceKey::of::<u8>();
        registry.register(component(key), false).unwrap();

        assert!(matches!(registry.plan(&key), Some(Plan::Component(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_rejected_without_override() {
        let mut registry = Registry::new();
        let key = ServiceKey::of::<u8>();
        registry.register(component(key), false).unwrap();

        let err = registry.register(component(key), false).unwrap_err();
        assert!(matches!(err, FluentError::AlreadyRegistered(_)));
        assert!(registry.register(component(key), true).is_ok());
    }

    #[test]
    fn alias_plans_through_component() {
        let mut registry = Registry::new();
        let component_key = ServiceKey::of::<u8>();
        let service_key = ServiceKey::of::<u16>();
        registry.register(component(component_key), false).unwrap();

        let upcast: Upcast = Arc::new(|instance: &Instance| Some(instance.clone()));
        registry
            .register_alias(service_key, Alias { component: component_key, upcast }, false)
            .unwrap();

        match registry.plan(&service_key) {
            Some(Plan::Aliased { component, .. }) => assert_eq!(component.key, component_key),
            _ => panic!("expected an aliased plan"),
        }
    }

    #[test]
    fn dangling_alias_has_no_plan() {
        let mut registry = Registry::new();
        let upcast: Upcast = Arc::new(|instance: &Instance| Some(instance.clone()));
        registry
            .register_alias(
                ServiceKey::of::<u16>(),
                Alias { component: ServiceKey::of::<u8>(), upcast },
                false,
            )
            .unwrap();

        assert!(!registry.contains(&ServiceKey::of::<u16>()));
    }

    #[test]
    fn generic_plan_needs_closed_implementation() {
        let service = TypeInfo::interface::<dyn Repository<Open>>().generic_definition().build();
        let implementation = TypeInfo::class::<GenericRepository<Open>>()
            .generic_definition()
            .implements(&service)
            .build();
        let closed_service = TypeInfo::interface::<dyn Repository<Customer>>()
            .closing(&service, &[ServiceKey::of::<Customer>()])
            .build();

        let mut registry = Registry::new();
        registry
            .register_generic(
                GenericRegistration {
                    implementation: implementation.clone(),
                    service: service.clone(),
                    lifetime: Lifetime::Transient,
                },
                false,
            )
            .unwrap();

        let mut catalog = TypeCatalog::new();
        catalog.add(closed_service.clone());
        registry.add_types(&catalog);

        let requested = ServiceKey::of::<dyn Repository<Customer>>();
        assert!(registry.plan(&requested).is_none());

        let closed_impl = TypeInfo::class::<GenericRepository<Customer>>()
            .closing(&implementation, &[ServiceKey::of::<Customer>()])
            .implements_as::<dyn Repository<Customer>>(&closed_service)
            .activated_by(|_| Ok(GenericRepository(std::marker::PhantomData)))
            .build();
        let mut catalog = TypeCatalog::new();
        catalog.add(closed_impl);
        registry.add_types(&catalog);

        match registry.plan(&requested) {
            Some(Plan::Generic { lifetime, .. }) => assert_eq!(lifetime, Lifetime::Transient),
            _ => panic!("expected a generic plan"),
        }
    }

    #[test]
    fn registered_names_cover_everything() {
        let mut registry = Registry::new();
        registry.register(component(ServiceKey::of::<u8>()), false).unwrap();
        assert_eq!(registry.registered_names(), vec!["u8"]);
    }
}
