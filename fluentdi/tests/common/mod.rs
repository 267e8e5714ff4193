//! Shared fixtures for the builder integration tests.

#![allow(dead_code)]

use std::marker::PhantomData;
use std::sync::Arc;

use fluentdi::prelude::*;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── lifetimes ─────────────────────────────────────────

pub trait SingletonService: Send + Sync {}
pub trait TransientService: Send + Sync {}
pub trait ScopedService: Send + Sync {}

pub struct Singleton;
pub struct Transient;
pub struct Scoped;

impl SingletonService for Singleton {}
impl TransientService for Transient {}
impl ScopedService for Scoped {}

fluentdi::implements!(Singleton => dyn SingletonService);
fluentdi::implements!(Transient => dyn TransientService);
fluentdi::implements!(Scoped => dyn ScopedService);

impl Injectable for Singleton {
    fn inject(_: &dyn Resolver) -> Result<Self> {
        Ok(Singleton)
    }
}

impl Injectable for Transient {
    fn inject(_: &dyn Resolver) -> Result<Self> {
        Ok(Transient)
    }
}

impl Injectable for Scoped {
    fn inject(_: &dyn Resolver) -> Result<Self> {
        Ok(Scoped)
    }
}

// ── generics ──────────────────────────────────────────

pub trait GenericService<T>: Send + Sync {
    fn argument(&self) -> &'static str;
}

pub trait GenericClosingService: GenericService<GenericClass> {}

pub struct GenericClass;

pub struct GenericImplementation<T>(PhantomData<fn() -> T>);

impl<T: 'static> GenericService<T> for GenericImplementation<T> {
    fn argument(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: 'static> Implements<dyn GenericService<T>> for GenericImplementation<T> {
    fn upcast(self: Arc<Self>) -> Arc<dyn GenericService<T>> {
        self
    }
}

impl<T: 'static> Injectable for GenericImplementation<T> {
    fn inject(_: &dyn Resolver) -> Result<Self> {
        Ok(GenericImplementation(PhantomData))
    }
}

pub struct GenericClosingType;

impl GenericService<GenericClass> for GenericClosingType {
    fn argument(&self) -> &'static str {
        "closing"
    }
}

impl GenericClosingService for GenericClosingType {}

fluentdi::implements!(
    GenericClosingType => dyn GenericClosingService, dyn GenericService<GenericClass>
);

impl Injectable for GenericClosingType {
    fn inject(_: &dyn Resolver) -> Result<Self> {
        Ok(GenericClosingType)
    }
}

/// Described generic types.
pub struct GenericTypes {
    /// `dyn GenericService<Open>`
    pub service: TypeRef,
    /// `GenericImplementation<Open>`
    pub implementation: TypeRef,
    /// The closed instantiations open generic resolution needs.
    pub instantiations: TypeCatalog,
    /// `GenericClosingType` and the interfaces it implements.
    pub closing: TypeCatalog,
}

pub fn generic_types() -> GenericTypes {
    let service = TypeInfo::interface::<dyn GenericService<Open>>()
        .generic_definition()
        .build();
    let implementation = TypeInfo::class::<GenericImplementation<Open>>()
        .generic_definition()
        .implements(&service)
        .build();

    let arguments = [ServiceKey::of::<GenericClass>()];
    let closed_service = TypeInfo::interface::<dyn GenericService<GenericClass>>()
        .closing(&service, &arguments)
        .build();
    let closed_implementation = TypeInfo::class::<GenericImplementation<GenericClass>>()
        .closing(&implementation, &arguments)
        .implements_as::<dyn GenericService<GenericClass>>(&closed_service)
        .injectable()
        .build();

    let closing_service = TypeInfo::interface::<dyn GenericClosingService>()
        .extends(&closed_service)
        .build();
    let closing_type = TypeInfo::class::<GenericClosingType>()
        .implements_as::<dyn GenericClosingService>(&closing_service)
        .implements_as::<dyn GenericService<GenericClass>>(&closed_service)
        .injectable()
        .build();

    GenericTypes {
        service,
        implementation,
        instantiations: TypeCatalog::new()
            .with(closed_service.clone())
            .with(closed_implementation),
        closing: TypeCatalog::new()
            .with(closed_service)
            .with(closing_service)
            .with(closing_type),
    }
}

// ── modules ───────────────────────────────────────────

#[derive(Default)]
pub struct MultiItemModule;

impl Module for MultiItemModule {
    fn load(&self, registry: &mut dyn ModuleRegistry) {
        registry.register_as::<Singleton, dyn SingletonService>(Lifetime::Singleton);
        registry.register_as::<Transient, dyn TransientService>(Lifetime::Transient);
        registry.register_as::<Scoped, dyn ScopedService>(Lifetime::Scoped);

        let generics = generic_types();
        registry.register_types(&generics.instantiations);
        registry.register_generic(&generics.implementation, &generics.service, Lifetime::Transient);
    }
}

// ── parameterized resolvers ───────────────────────────

#[derive(Debug, Clone, Copy)]
pub enum AuthenticationProvider {
    Google,
    Facebook,
}

pub trait AuthenticationStrategy: Send + Sync {
    fn provider(&self) -> &'static str;
}

pub struct GoogleAuthenticationStrategy;
pub struct FacebookAuthenticationStrategy;

impl AuthenticationStrategy for GoogleAuthenticationStrategy {
    fn provider(&self) -> &'static str {
        "google"
    }
}

impl AuthenticationStrategy for FacebookAuthenticationStrategy {
    fn provider(&self) -> &'static str {
        "facebook"
    }
}

impl Injectable for GoogleAuthenticationStrategy {
    fn inject(_: &dyn Resolver) -> Result<Self> {
        Ok(GoogleAuthenticationStrategy)
    }
}

impl Injectable for FacebookAuthenticationStrategy {
    fn inject(_: &dyn Resolver) -> Result<Self> {
        Ok(FacebookAuthenticationStrategy)
    }
}

pub fn strategy_for(
    resolver: &dyn Resolver,
    provider: AuthenticationProvider,
) -> Result<Arc<dyn AuthenticationStrategy>> {
    let strategy: Arc<dyn AuthenticationStrategy> = match provider {
        AuthenticationProvider::Google => resolve::<GoogleAuthenticationStrategy>(resolver)?,
        AuthenticationProvider::Facebook => resolve::<FacebookAuthenticationStrategy>(resolver)?,
    };
    Ok(strategy)
}
