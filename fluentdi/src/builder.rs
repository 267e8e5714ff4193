//! The fluent registration facade.
//!
//! [`FluentBuilder`] wraps a [`ContainerBuilder`] and turns each chained
//! call into one registration on it. Generic registrations are checked
//! against the type metadata before they are forwarded.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use fluentdi_container::delegate::parameterized;
use fluentdi_container::error::{DoesNotCloseError, NotAssignableError};
use fluentdi_container::inject::{constant, injectable, injectable_as};
use fluentdi_container::{
    Container, ContainerBuilder, ContainerSettings, Factory, FluentError, Implements, Injectable,
    Instance, Lifetime, Module, ParameterizedFactory, Resolver, Result, ServiceKey, TypeCatalog,
    TypeRef,
};
use fluentdi_support::TypeDescriptor;
use fluentdi_support::closure::{closes_type, is_assignable_to};
use tracing::{debug, instrument, warn};

/// Chainable registration facade over [`ContainerBuilder`].
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use fluentdi::prelude::*;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct SystemClock;
///
/// impl Clock for SystemClock {
///     fn now(&self) -> u64 { 7 }
/// }
///
/// impl Injectable for SystemClock {
///     fn inject(_: &dyn Resolver) -> Result<Self> {
///         Ok(SystemClock)
///     }
/// }
///
/// fluentdi::implements!(SystemClock => dyn Clock);
///
/// let container = FluentBuilder::new()
///     .register_type_as_singleton::<SystemClock, dyn Clock>()
///     .build()
///     .unwrap();
///
/// let clock: Arc<dyn Clock> = container.resolve().unwrap();
/// assert_eq!(clock.now(), 7);
/// ```
pub struct FluentBuilder {
    builder: ContainerBuilder,
}

impl Default for FluentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FluentBuilder {
    pub fn new() -> Self {
        Self::from_builder(ContainerBuilder::new())
    }

    /// Continues configuring an existing container builder, including the
    /// type metadata already registered on it.
    pub fn from_builder(builder: ContainerBuilder) -> Self {
        Self { builder }
    }

    /// Replaces the container settings. `allow_override` is checked when
    /// [`build`](Self::build) runs, so it also covers registrations chained
    /// before this call.
    pub fn with_settings(self, settings: ContainerSettings) -> Self {
        self.map(|builder| builder.with_settings(settings))
    }

    // ── Typed registrations ──────────────────────────────

    /// Registers `C` as service `I`, one instance per container.
    pub fn register_type_as_singleton<C, I>(self) -> Self
    where
        C: Injectable + Implements<I>,
        I: ?Sized + Send + Sync + 'static,
    {
        self.register_type_as::<C, I>(Lifetime::Singleton)
    }

    /// Registers `C` as service `I`, a new instance per resolve.
    pub fn register_type_as_transient<C, I>(self) -> Self
    where
        C: Injectable + Implements<I>,
        I: ?Sized + Send + Sync + 'static,
    {
        self.register_type_as::<C, I>(Lifetime::Transient)
    }

    /// Registers `C` as service `I`, one instance per lifetime scope.
    pub fn register_type_as_scoped<C, I>(self) -> Self
    where
        C: Injectable + Implements<I>,
        I: ?Sized + Send + Sync + 'static,
    {
        self.register_type_as::<C, I>(Lifetime::Scoped)
    }

    pub fn register_self_as_singleton<C: Injectable>(self) -> Self {
        self.register_self::<C>(Lifetime::Singleton)
    }

    pub fn register_self_as_transient<C: Injectable>(self) -> Self {
        self.register_self::<C>(Lifetime::Transient)
    }

    pub fn register_self_as_scoped<C: Injectable>(self) -> Self {
        self.register_self::<C>(Lifetime::Scoped)
    }

    fn register_type_as<C, I>(self, lifetime: Lifetime) -> Self
    where
        C: Injectable + Implements<I>,
        I: ?Sized + Send + Sync + 'static,
    {
        debug!(
            component = %ServiceKey::of::<C>(),
            service = %ServiceKey::of::<I>(),
            %lifetime,
            "register_type_as"
        );
        self.map(|builder| builder.register(ServiceKey::of::<I>(), lifetime, injectable_as::<C, I>()))
    }

    fn register_self<C: Injectable>(self, lifetime: Lifetime) -> Self {
        debug!(component = %ServiceKey::of::<C>(), %lifetime, "register_self");
        self.map(|builder| builder.register(ServiceKey::of::<C>(), lifetime, injectable::<C>()))
    }

    // ── Instances and resolvers ──────────────────────────

    /// Registers a pre-built instance as service `I`.
    pub fn register_instance<I: ?Sized + Send + Sync + 'static>(self, instance: Arc<I>) -> Self {
        debug!(service = %ServiceKey::of::<I>(), "register_instance");
        self.map(|builder| builder.singleton_value(instance))
    }

    /// Registers a pre-built instance as the runtime-described `service`.
    ///
    /// `C` must be described in the builder's type metadata (see
    /// [`with_types`](Self::with_types)) and declare an upcast to `service`.
    ///
    /// # Errors
    /// - [`FluentError::InvalidArgument`] if `C` is not described, or is
    ///   related to `service` without an upcast to it.
    /// - [`FluentError::NotAssignable`] if `C` neither is nor implements
    ///   `service`.
    pub fn register_instance_as<C: Send + Sync + 'static>(
        self,
        service: &TypeRef,
        instance: Arc<C>,
    ) -> Result<Self> {
        let key = ServiceKey::of::<C>();
        let Some(described) = self.builder.types().get(&key) else {
            return Err(FluentError::invalid_argument(
                "instance",
                format!("{key} is not described; add it with with_types"),
            ));
        };

        if !is_assignable_to(&**described, &**service) {
            warn!(instance = %key, service = %service.key(), "Instance rejected");
            return Err(FluentError::NotAssignable(NotAssignableError {
                instance: key,
                service: service.key(),
            }));
        }

        let factory = if described.is_same(service) {
            constant(instance)
        } else {
            let Some(upcast) = described.upcast_to(&service.key()) else {
                return Err(FluentError::invalid_argument(
                    "service",
                    format!("{key} declares no upcast to {}", service.key()),
                ));
            };
            let component: Instance = Arc::new(instance);
            let Some(upcasted) = upcast(&component) else {
                return Err(FluentError::invalid_argument(
                    "instance",
                    format!("upcast from {key} to {} failed", service.key()),
                ));
            };
            Arc::new(move |_: &dyn Resolver| Ok(upcasted.clone())) as Factory
        };

        debug!(instance = %key, service = %service.key(), "register_instance_as");
        Ok(self.map(|builder| builder.register(service.key(), Lifetime::Singleton, factory)))
    }

    /// Registers a factory for `I`, called on every resolve.
    pub fn register_resolver<I: ?Sized + Send + Sync + 'static>(
        self,
        resolve: impl Fn(&dyn Resolver) -> Result<Arc<I>> + Send + Sync + 'static,
    ) -> Self {
        debug!(service = %ServiceKey::of::<I>(), "register_resolver");
        self.map(|builder| builder.transient_with(resolve))
    }

    /// Registers a [`ParameterizedFactory<P, I>`] that calls `create` with
    /// the scope it was resolved from.
    ///
    /// ```rust,ignore
    /// let factory: Arc<ParameterizedFactory<Provider, dyn AuthStrategy>> = scope.resolve()?;
    /// let google = factory.create(Provider::Google)?;
    /// ```
    pub fn register_parameterized_resolver<P, I>(
        self,
        create: impl Fn(&dyn Resolver, P) -> Result<Arc<I>> + Send + Sync + 'static,
    ) -> Self
    where
        P: 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<ParameterizedFactory<P, I>>();
        debug!(service = %key, "register_parameterized_resolver");
        self.map(|builder| builder.register(key, Lifetime::Transient, parameterized(create)))
    }

    // ── Open generics ────────────────────────────────────

    /// Maps the open generic `service` to `implementation`, one instance
    /// per closed service per container.
    ///
    /// # Errors
    /// - [`FluentError::InvalidArgument`] unless both are unbound generic
    ///   definitions.
    /// - [`FluentError::DoesNotClose`] unless `implementation` closes `service`.
    pub fn add_generic_as_singleton(self, implementation: &TypeRef, service: &TypeRef) -> Result<Self> {
        self.add_generic_as(implementation, service, Lifetime::Singleton)
    }

    pub fn add_generic_as_transient(self, implementation: &TypeRef, service: &TypeRef) -> Result<Self> {
        self.add_generic_as(implementation, service, Lifetime::Transient)
    }

    pub fn add_generic_as_scoped(self, implementation: &TypeRef, service: &TypeRef) -> Result<Self> {
        self.add_generic_as(implementation, service, Lifetime::Scoped)
    }

    fn add_generic_as(
        self,
        implementation: &TypeRef,
        service: &TypeRef,
        lifetime: Lifetime,
    ) -> Result<Self> {
        require_definition("implementation", implementation)?;
        require_definition("service", service)?;

        if !closes_type(&**implementation, &**service) {
            warn!(
                implementation = %implementation.key(),
                service = %service.key(),
                "Generic implementation does not close service"
            );
            return Err(FluentError::DoesNotClose(DoesNotCloseError {
                candidate: implementation.key(),
                target: service.key(),
                chain: implementation.chain(),
            }));
        }

        debug!(
            implementation = %implementation.key(),
            service = %service.key(),
            %lifetime,
            "add_generic_as"
        );
        Ok(self.map(|builder| builder.register_open_generic(implementation, service, lifetime)))
    }

    // ── Closed types ─────────────────────────────────────

    /// Registers every constructible class in `catalogs` that closes
    /// `service`, as itself and as each interface it upcasts to.
    ///
    /// Only interfaces the class declares with
    /// [`implements_as`](fluentdi_container::reflect::ClassBuilder::implements_as)
    /// become services. A class that closes `service` only through its base
    /// class has no upcast to the base's interfaces, so it is registered as
    /// itself alone.
    ///
    /// # Errors
    /// [`FluentError::InvalidArgument`] unless `service` is an unbound
    /// generic definition.
    pub fn add_closed_types_as_singleton(self, service: &TypeRef, catalogs: &[&TypeCatalog]) -> Result<Self> {
        self.add_closed_types_as(service, catalogs, Lifetime::Singleton)
    }

    pub fn add_closed_types_as_transient(self, service: &TypeRef, catalogs: &[&TypeCatalog]) -> Result<Self> {
        self.add_closed_types_as(service, catalogs, Lifetime::Transient)
    }

    pub fn add_closed_types_as_scoped(self, service: &TypeRef, catalogs: &[&TypeCatalog]) -> Result<Self> {
        self.add_closed_types_as(service, catalogs, Lifetime::Scoped)
    }

    fn add_closed_types_as(
        mut self,
        service: &TypeRef,
        catalogs: &[&TypeCatalog],
        lifetime: Lifetime,
    ) -> Result<Self> {
        require_definition("service", service)?;

        let mut seen = HashSet::new();
        for catalog in catalogs {
            for ty in catalog.closing_types(service) {
                if !seen.insert(ty.key()) {
                    continue;
                }
                debug!(component = %ty.key(), service = %service.key(), %lifetime, "add_closed_type");
                self.builder = self.builder.register_described(ty, lifetime);
            }
        }

        if seen.is_empty() {
            warn!(service = %service.key(), "No closing types found");
        }
        Ok(self)
    }

    // ── Metadata, modules, build ─────────────────────────

    /// Adds type metadata for open generic resolution and
    /// [`register_instance_as`](Self::register_instance_as).
    pub fn with_types(self, catalog: &TypeCatalog) -> Self {
        self.map(|builder| builder.register_catalog(catalog))
    }

    /// Applies a default-constructed module.
    pub fn apply_module<M: Module + Default>(self) -> Self {
        self.apply_module_instance(&M::default())
    }

    pub fn apply_module_instance(self, module: &dyn Module) -> Self {
        self.map(|builder| builder.register_module(module))
    }

    /// Builds the container.
    ///
    /// # Errors
    /// The first error from a chained registration, such as a duplicate
    /// service with overriding disabled.
    #[instrument(skip(self), name = "fluent_build")]
    pub fn build(self) -> Result<Container> {
        self.builder.build()
    }

    fn map(mut self, apply: impl FnOnce(ContainerBuilder) -> ContainerBuilder) -> Self {
        self.builder = apply(self.builder);
        self
    }
}

impl fmt::Debug for FluentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluentBuilder")
            .field("builder", &self.builder)
            .finish()
    }
}

fn require_definition(parameter: &'static str, ty: &TypeRef) -> Result<()> {
    if ty.is_generic_type_definition() {
        return Ok(());
    }
    Err(FluentError::invalid_argument(
        parameter,
        format!("{} is not an open generic definition", ty.key()),
    ))
}
