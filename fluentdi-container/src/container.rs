//! # The Container
//!
//! Builds object graphs from registrations and keeps instances for as long
//! as their [`Lifetime`] says.
//!
//! # Architecture
//! ```text
//! ContainerBuilder  ──build()──>  Container (root scope)
//!                                    │
//!                              begin_scope()
//!                                    │
//!                                    ▼
//!                              LifetimeScope ── begin_scope() ──> LifetimeScope
//! ```
//!
//! Singletons live in a cache shared by every scope of a container; each
//! scope, the root included, has its own cache of scoped instances.
//!
//! # Examples
//! ```rust
//! use fluentdi_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//!
//! let container = Container::builder()
//!     .singleton_with::<dyn Clock>(|_| Ok(Arc::new(FixedClock)))
//!     .build()
//!     .expect("Failed to build container");
//!
//! let clock: Arc<dyn Clock> = container.resolve().expect("Failed to resolve");
//! assert_eq!(clock.now(), 42);
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use fluentdi_support::rendering::suggest_similar;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use crate::catalog::TypeCatalog;
use crate::error::{
    AlreadyRegisteredError, CircularDependencyError, FluentError, NotRegisteredError, Result,
};
use crate::inject::{constant, from_fn};
use crate::key::ServiceKey;
use crate::lifetime::Lifetime;
use crate::module::{Module, ModuleRegistry};
use crate::reflect::TypeRef;
use crate::registry::{
    Alias, Factory, GenericRegistration, Instance, Plan, Registration, Registry, Resolver,
};
use crate::settings::ContainerSettings;

// ============================================================
// ContainerBuilder
// ============================================================

/// Collects registrations and builds a [`Container`].
///
/// Registration methods chain. A registration that fails (a class that
/// cannot be constructed) is remembered and reported by
/// [`build()`](ContainerBuilder::build). A later registration for a taken
/// service replaces the earlier one; whether that is allowed is decided by
/// the settings in effect when `build()` runs.
pub struct ContainerBuilder {
    registry: Registry,
    settings: ContainerSettings,
    errors: Vec<FluentError>,
    duplicates: Vec<ServiceKey>,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            settings: ContainerSettings::default(),
            errors: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    /// Replaces the settings. They apply to the whole builder, including
    /// registrations made before this call.
    pub fn with_settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Allow replacing previously registered services, wherever in the
    /// chain they were registered.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.settings.allow_override = allow;
        self
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Type metadata registered so far.
    pub fn types(&self) -> &TypeCatalog {
        self.registry.types()
    }

    /// Registers a pre-built value. Every resolve returns the same `Arc`.
    pub fn singleton_value<T: ?Sized + Send + Sync + 'static>(self, value: Arc<T>) -> Self {
        self.register(ServiceKey::of::<T>(), Lifetime::Singleton, constant(value))
    }

    /// Registers a factory called once per container.
    pub fn singleton_with<T: ?Sized + Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<Arc<T>> + Send + Sync + 'static,
    ) -> Self {
        self.register(ServiceKey::of::<T>(), Lifetime::Singleton, from_fn(factory))
    }

    /// Registers a factory called once per lifetime scope.
    pub fn scoped_with<T: ?Sized + Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<Arc<T>> + Send + Sync + 'static,
    ) -> Self {
        self.register(ServiceKey::of::<T>(), Lifetime::Scoped, from_fn(factory))
    }

    /// Registers a factory called on every resolve.
    pub fn transient_with<T: ?Sized + Send + Sync + 'static>(
        self,
        factory: impl Fn(&dyn Resolver) -> Result<Arc<T>> + Send + Sync + 'static,
    ) -> Self {
        self.register(ServiceKey::of::<T>(), Lifetime::Transient, from_fn(factory))
    }

    /// Registers a type-erased factory for `key`.
    pub fn register(mut self, key: ServiceKey, lifetime: Lifetime, factory: Factory) -> Self {
        self.register_factory(key, lifetime, factory);
        self
    }

    /// Registers a described class as itself and as each interface it
    /// declares an upcast for. All of them share one instance per lifetime.
    pub fn register_described(mut self, ty: &TypeRef, lifetime: Lifetime) -> Self {
        ModuleRegistry::register_type(&mut self, ty, lifetime);
        self
    }

    /// Maps an open generic service to an open generic implementation.
    ///
    /// Closed services are built from the closed implementation with the
    /// same type arguments, looked up in the registered type metadata.
    pub fn register_open_generic(
        mut self,
        implementation: &TypeRef,
        service: &TypeRef,
        lifetime: Lifetime,
    ) -> Self {
        ModuleRegistry::register_generic(&mut self, implementation, service, lifetime);
        self
    }

    /// Adds type metadata used to close open generics.
    pub fn register_catalog(mut self, catalog: &TypeCatalog) -> Self {
        ModuleRegistry::register_types(&mut self, catalog);
        self
    }

    /// Applies a [`Module`].
    pub fn register_module(mut self, module: &dyn Module) -> Self {
        debug!(module = module.name(), "Loading module");
        module.load(&mut self);
        self
    }

    /// Builds the container.
    ///
    /// # Errors
    /// The first registration error recorded while chaining, then
    /// [`FluentError::AlreadyRegistered`] for the first replaced service
    /// unless overriding is allowed.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        let ContainerBuilder {
            registry,
            settings,
            errors,
            duplicates,
        } = self;

        info!(
            registered = registry.len(),
            open_generics = registry.generic_count(),
            described_types = registry.types().len(),
            "Building container"
        );

        if let Some(error) = errors.into_iter().next() {
            warn!(%error, "Container build rejected");
            return Err(error);
        }

        if let Some(&key) = duplicates.first().filter(|_| !settings.allow_override) {
            warn!(%key, duplicates = duplicates.len(), "Container build rejected");
            return Err(FluentError::AlreadyRegistered(AlreadyRegisteredError { key }));
        }

        info!("Container built successfully ✓");
        Ok(Container {
            root: LifetimeScope::root(Arc::new(registry)),
        })
    }

    fn record(&mut self, result: Result<()>) {
        if let Err(error) = result {
            warn!(%error, "Registration rejected");
            self.errors.push(error);
        }
    }

    fn note_duplicate(&mut self, key: ServiceKey) {
        debug!(%key, "Replacing registration");
        self.duplicates.push(key);
    }
}

impl ModuleRegistry for ContainerBuilder {
    fn register_factory(&mut self, key: ServiceKey, lifetime: Lifetime, factory: Factory) {
        if self.registry.is_taken(&key) {
            self.note_duplicate(key);
        }
        let registration = Registration { key, lifetime, factory };
        let result = self.registry.register(registration, true);
        self.record(result);
    }

    fn register_type(&mut self, ty: &TypeRef, lifetime: Lifetime) {
        let Some(activator) = ty.activator() else {
            self.record(Err(FluentError::invalid_argument(
                "ty",
                format!("{} has no activator and cannot be constructed", ty.key()),
            )));
            return;
        };

        let component = ty.key();
        self.register_factory(component, lifetime, activator.clone());

        for (service, upcast) in ty.upcasts() {
            let alias = Alias {
                component,
                upcast: upcast.clone(),
            };
            if self.registry.is_taken(&service) {
                self.note_duplicate(service);
            }
            let result = self.registry.register_alias(service, alias, true);
            self.record(result);
        }
    }

    fn register_generic(&mut self, implementation: &TypeRef, service: &TypeRef, lifetime: Lifetime) {
        if self.registry.has_generic(&service.key()) {
            self.note_duplicate(service.key());
        }
        let generic = GenericRegistration {
            implementation: implementation.clone(),
            service: service.clone(),
            lifetime,
        };
        let result = self.registry.register_generic(generic, true);
        self.record(result);
    }

    fn register_types(&mut self, catalog: &TypeCatalog) {
        debug!(types = catalog.len(), "Registered type metadata");
        self.registry.add_types(catalog);
    }
}

impl fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("registered", &self.registry.len())
            .field("settings", &self.settings)
            .field("errors", &self.errors.len())
            .field("duplicates", &self.duplicates.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Immutable, thread-safe container. Also the root lifetime scope.
///
/// Created by [`ContainerBuilder::build()`].
pub struct Container {
    root: LifetimeScope,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Resolve a service from the root scope.
    ///
    /// ```rust,ignore
    /// let repository: Arc<dyn Repository<Customer>> = container.resolve()?;
    /// ```
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.root.resolve()
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.root.is_registered::<T>()
    }

    /// Starts a child scope with its own scoped instances.
    pub fn begin_scope(&self) -> LifetimeScope {
        self.root.begin_scope()
    }

    /// The root scope.
    pub fn root_scope(&self) -> &LifetimeScope {
        &self.root
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &ServiceKey) -> Result<Instance> {
        self.root.resolve_key(key)
    }

    fn is_registered_key(&self, key: &ServiceKey) -> bool {
        self.root.is_registered_key(key)
    }

    fn lifetime_scope(&self) -> LifetimeScope {
        self.root.clone()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.root.state.registry.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// LifetimeScope
// ═══════════════════════════════════════════

/// Instances created once per key, kept until the cache is dropped.
#[derive(Default)]
struct InstanceCache {
    entries: DashMap<ServiceKey, Arc<OnceCell<Instance>>>,
}

impl InstanceCache {
    fn get_or_create(
        &self,
        key: ServiceKey,
        create: impl FnOnce() -> Result<Instance>,
    ) -> Result<Instance> {
        // the map guard must be gone before `create` resolves other keys
        let cell = Arc::clone(&self.entries.entry(key).or_default());
        cell.get_or_try_init(create).cloned()
    }
}

struct ScopeState {
    registry: Arc<Registry>,
    singletons: Arc<InstanceCache>,
    scoped: InstanceCache,
    // None for the root scope itself
    root: Option<LifetimeScope>,
    depth: usize,
}

/// A unit of work with its own scoped instances.
///
/// Cheap to clone; clones share the same instances.
#[derive(Clone)]
pub struct LifetimeScope {
    state: Arc<ScopeState>,
}

impl LifetimeScope {
    fn root(registry: Arc<Registry>) -> Self {
        Self {
            state: Arc::new(ScopeState {
                registry,
                singletons: Arc::new(InstanceCache::default()),
                scoped: InstanceCache::default(),
                root: None,
                depth: 0,
            }),
        }
    }

    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        resolve(self)
    }

    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.is_registered_key(&ServiceKey::of::<T>())
    }

    /// Starts a nested scope. Singletons are shared, scoped instances are not.
    pub fn begin_scope(&self) -> LifetimeScope {
        let depth = self.state.depth + 1;
        debug!(depth, "Beginning lifetime scope");

        LifetimeScope {
            state: Arc::new(ScopeState {
                registry: self.state.registry.clone(),
                singletons: self.state.singletons.clone(),
                scoped: InstanceCache::default(),
                root: Some(self.root_scope().clone()),
                depth,
            }),
        }
    }

    /// Nesting depth, 0 for the container itself.
    pub fn depth(&self) -> usize {
        self.state.depth
    }

    fn root_scope(&self) -> &LifetimeScope {
        self.state.root.as_ref().unwrap_or(self)
    }
}

impl Resolver for LifetimeScope {
    fn resolve_key(&self, key: &ServiceKey) -> Result<Instance> {
        let path = Mutex::new(Vec::new());
        ResolveContext { scope: self, path: &path }.resolve_key(key)
    }

    fn is_registered_key(&self, key: &ServiceKey) -> bool {
        self.state.registry.contains(key)
    }

    fn lifetime_scope(&self) -> LifetimeScope {
        self.clone()
    }
}

impl fmt::Debug for LifetimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeScope")
            .field("depth", &self.state.depth)
            .finish()
    }
}

// ═══════════════════════════════════════════
// ResolveContext (one top-level resolve)
// ═══════════════════════════════════════════

/// Resolver handed to factories during one top-level resolve.
///
/// Tracks the services being built so cycles fail instead of recursing
/// forever.
struct ResolveContext<'a> {
    scope: &'a LifetimeScope,
    path: &'a Mutex<Vec<ServiceKey>>,
}

impl ResolveContext<'_> {
    fn enter(&self, key: &ServiceKey) -> Result<()> {
        let mut path = self.path.lock();

        if let Some(start) = path.iter().position(|visited| visited == key) {
            let mut chain = path[start..].to_vec();
            chain.push(*key);

            warn!(cycle = ?chain, "Circular dependency detected!");
            return Err(FluentError::CircularDependency(CircularDependencyError { chain }));
        }

        path.push(*key);
        Ok(())
    }

    fn activate(&self, key: &ServiceKey) -> Result<Instance> {
        let registry = &self.scope.state.registry;

        match registry.plan(key) {
            Some(Plan::Component(registration)) => {
                self.instance(registration.key, registration.lifetime, &registration.factory)
            }
            Some(Plan::Aliased { component, upcast }) => {
                // the forwarded component stays on the path while it is built
                let forwarded = component.key != *key;
                if forwarded {
                    self.enter(&component.key)?;
                }
                let instance = self.instance(component.key, component.lifetime, &component.factory);
                if forwarded {
                    self.path.lock().pop();
                }
                upcast(&instance?).ok_or_else(|| FluentError::type_mismatch(*key, key.type_name()))
            }
            Some(Plan::Generic {
                lifetime,
                activator,
                upcast,
            }) => self.cached(*key, lifetime, |context| {
                let component = activator(context)?;
                upcast(&component).ok_or_else(|| FluentError::type_mismatch(*key, key.type_name()))
            }),
            None => Err(self.not_registered(key)),
        }
    }

    fn instance(&self, key: ServiceKey, lifetime: Lifetime, factory: &Factory) -> Result<Instance> {
        self.cached(key, lifetime, |context| factory(context))
    }

    /// Runs `create` at most once per cache entry for cached lifetimes.
    fn cached(
        &self,
        key: ServiceKey,
        lifetime: Lifetime,
        create: impl FnOnce(&dyn Resolver) -> Result<Instance>,
    ) -> Result<Instance> {
        let state = &self.scope.state;

        match lifetime {
            Lifetime::Singleton => {
                // singletons never see the scope they were first requested from
                let root = ResolveContext {
                    scope: self.scope.root_scope(),
                    path: self.path,
                };
                state.singletons.get_or_create(key, || create(&root))
            }
            Lifetime::Scoped => state.scoped.get_or_create(key, || create(self)),
            Lifetime::Transient => create(self),
        }
    }

    fn not_registered(&self, key: &ServiceKey) -> FluentError {
        let required_by = self.path.lock().iter().rev().nth(1).copied();
        let registered = self.scope.state.registry.registered_names();

        FluentError::NotRegistered(NotRegisteredError {
            requested: *key,
            required_by,
            suggestions: suggest_similar(key.type_name(), &registered, 3),
        })
    }
}

impl Resolver for ResolveContext<'_> {
    fn resolve_key(&self, key: &ServiceKey) -> Result<Instance> {
        self.enter(key)?;
        trace!(key = %key, depth = self.scope.depth(), "Resolving");

        let result = self.activate(key);
        self.path.lock().pop();
        result
    }

    fn is_registered_key(&self, key: &ServiceKey) -> bool {
        self.scope.is_registered_key(key)
    }

    fn lifetime_scope(&self) -> LifetimeScope {
        self.scope.clone()
    }
}

// ═══════════════════════════════════════════
// Free function for use inside factories
// ═══════════════════════════════════════════

/// Resolve a typed service from a [`Resolver`].
///
/// Use this inside factories and [`Injectable`](crate::inject::Injectable) impls:
///
/// ```rust,ignore
/// impl Injectable for CustomerService {
///     fn inject(resolver: &dyn Resolver) -> Result<Self> {
///         Ok(Self { customers: resolve(resolver)? })
///     }
/// }
/// ```
pub fn resolve<T: ?Sized + Send + Sync + 'static>(resolver: &dyn Resolver) -> Result<Arc<T>> {
    let key = ServiceKey::of::<T>();
    let instance = resolver.resolve_key(&key)?;
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| FluentError::type_mismatch(key, type_name::<Arc<T>>()))
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, LifetimeScope, resolve};
    pub use crate::catalog::TypeCatalog;
    pub use crate::delegate::ParameterizedFactory;
    pub use crate::error::{FluentError, Result};
    pub use crate::inject::Injectable;
    pub use crate::key::ServiceKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::module::{Module, ModuleRegistry};
    pub use crate::reflect::{Implements, Open, TypeInfo, TypeRef};
    pub use crate::registry::Resolver;
    pub use crate::settings::ContainerSettings;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
