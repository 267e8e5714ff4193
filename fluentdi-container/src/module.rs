//! Modules: named groups of registrations.
//!
//! A module registers related services in one place and is applied to a
//! builder as a unit.
//!
//! # Examples
//! ```rust,ignore
//! struct StorageModule;
//!
//! impl Module for StorageModule {
//!     fn load(&self, registry: &mut dyn ModuleRegistry) {
//!         registry.register_as::<SqlCustomers, dyn Customers>(Lifetime::Singleton);
//!         registry.register_generic(&generic_repository, &repository, Lifetime::Scoped);
//!     }
//! }
//! ```

use crate::catalog::TypeCatalog;
use crate::inject::{Injectable, injectable, injectable_as};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::reflect::{Implements, TypeRef};
use crate::registry::Factory;

/// A group of registrations applied together.
pub trait Module: Send + Sync {
    /// Registers the module's services.
    fn load(&self, registry: &mut dyn ModuleRegistry);

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The part of the builder modules register through.
///
/// Kept separate from the builder so modules can be exercised against a
/// recording registry in tests.
pub trait ModuleRegistry {
    /// Registers `key` built by `factory`.
    fn register_factory(&mut self, key: ServiceKey, lifetime: Lifetime, factory: Factory);

    /// Registers a described class as itself and as every interface it
    /// declares an upcast for.
    fn register_type(&mut self, ty: &TypeRef, lifetime: Lifetime);

    /// Registers an open generic implementation for an open generic service.
    fn register_generic(&mut self, implementation: &TypeRef, service: &TypeRef, lifetime: Lifetime);

    /// Makes type metadata available for closing open generics.
    fn register_types(&mut self, catalog: &TypeCatalog);
}

impl dyn ModuleRegistry + '_ {
    /// Registers injectable `C` as service `I`.
    pub fn register_as<C, I>(&mut self, lifetime: Lifetime)
    where
        C: Injectable + Implements<I>,
        I: ?Sized + Send + Sync + 'static,
    {
        self.register_factory(ServiceKey::of::<I>(), lifetime, injectable_as::<C, I>());
    }

    /// Registers injectable `C` as itself.
    pub fn register_self<C: Injectable>(&mut self, lifetime: Lifetime) {
        self.register_factory(ServiceKey::of::<C>(), lifetime, injectable::<C>());
    }
}
