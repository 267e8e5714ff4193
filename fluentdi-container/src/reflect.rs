//! Type metadata the container reasons about.
//!
//! Rust has no runtime reflection over trait implementations or generic
//! definitions, so types that take part in generic registrations are
//! described up front with [`TypeInfo`] builders:
//!
//! ```text
//! dyn Repository<Open>            interface, generic definition
//!   ▲
//! dyn Repository<Customer>        interface, closes dyn Repository<Open>
//!   ▲ implements_as
//! GenericRepository<Customer>     class, closes GenericRepository<Open>
//!   ▲ inherits
//! CustomerRepository              class
//! ```
//!
//! Unbound type parameters are spelled with the uninhabited [`Open`]
//! placeholder.
//!
//! # Examples
//! ```rust
//! use fluentdi_container::key::ServiceKey;
//! use fluentdi_container::reflect::{Open, TypeInfo};
//! use fluentdi_support::closes_type;
//!
//! trait Repository<T> {}
//! struct Customer;
//! struct CustomerRepository;
//!
//! let repository = TypeInfo::interface::<dyn Repository<Open>>()
//!     .generic_definition()
//!     .build();
//! let customer_repository = TypeInfo::interface::<dyn Repository<Customer>>()
//!     .closing(&repository, &[ServiceKey::of::<Customer>()])
//!     .build();
//! let class = TypeInfo::class::<CustomerRepository>()
//!     .implements(&customer_repository)
//!     .build();
//!
//! assert!(closes_type(&*class, &*repository));
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use fluentdi_support::TypeDescriptor;

use crate::error::Result;
use crate::inject::Injectable;
use crate::key::ServiceKey;
use crate::registry::{Factory, Instance, Resolver};

/// Placeholder for an unbound type parameter: `Repository<Open>` stands for
/// `Repository<_>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Open {}

/// Shared handle to a described type.
pub type TypeRef = Arc<TypeInfo>;

/// Converts an instance holding `Arc<C>` into one holding `Arc<I>`.
///
/// Returns `None` when the instance is not an `Arc<C>`.
pub type Upcast = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// Coercion from a component to one of the services it provides.
///
/// Generic code cannot coerce `Arc<C>` to `Arc<dyn I>` on its own, so
/// components state it once:
///
/// ```rust
/// use std::sync::Arc;
/// use fluentdi_container::reflect::Implements;
///
/// trait ConsoleWrite: Send + Sync {}
/// struct ConsoleWriter;
/// impl ConsoleWrite for ConsoleWriter {}
///
/// impl Implements<dyn ConsoleWrite> for ConsoleWriter {
///     fn upcast(self: Arc<Self>) -> Arc<dyn ConsoleWrite> {
///         self
///     }
/// }
/// ```
///
/// The [`implements!`](crate::implements) macro writes these impls for
/// non-generic types.
pub trait Implements<I: ?Sized> {
    fn upcast(self: Arc<Self>) -> Arc<I>;
}

/// Implements [`Implements`](crate::reflect::Implements) for each listed
/// service.
///
/// ```rust
/// use fluentdi_container::implements;
///
/// trait Scoped: Send + Sync {}
/// trait Named: Send + Sync {}
/// struct RequestContext;
/// impl Scoped for RequestContext {}
/// impl Named for RequestContext {}
///
/// implements!(RequestContext => dyn Scoped, dyn Named);
/// ```
#[macro_export]
macro_rules! implements {
    ($component:ty => $($service:ty),+ $(,)?) => {
        $(
            impl $crate::reflect::Implements<$service> for $component {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$service> {
                    self
                }
            }
        )+
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Debug, Clone)]
enum Generic {
    None,
    Definition,
    Instance {
        definition: TypeRef,
        arguments: Vec<ServiceKey>,
    },
}

/// An interface a type declares, with the coercion to it when known.
#[derive(Clone)]
struct Declared {
    interface: TypeRef,
    upcast: Option<Upcast>,
}

/// Metadata about one type.
///
/// Built with [`TypeInfo::interface`] or [`TypeInfo::class`] and shared as
/// [`TypeRef`]. Immutable once built; a base or interface has to exist
/// before anything can refer to it, so inheritance chains never loop.
pub struct TypeInfo {
    key: ServiceKey,
    kind: TypeKind,
    generic: Generic,
    base: Option<TypeRef>,
    declared: Vec<Declared>,
    // declared interfaces plus the interfaces they extend
    interfaces: Vec<TypeRef>,
    activator: Option<Factory>,
}

impl TypeInfo {
    /// Starts describing an interface (a trait object type).
    pub fn interface<I: ?Sized + 'static>() -> InterfaceBuilder {
        InterfaceBuilder {
            key: ServiceKey::of::<I>(),
            generic: Generic::None,
            extends: Vec::new(),
        }
    }

    /// Starts describing a concrete class.
    pub fn class<C: 'static>() -> ClassBuilder<C> {
        ClassBuilder {
            key: ServiceKey::of::<C>(),
            generic: Generic::None,
            base: None,
            declared: Vec::new(),
            activator: None,
            _component: PhantomData,
        }
    }

    pub fn key(&self) -> ServiceKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.type_name()
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn base(&self) -> Option<&TypeRef> {
        self.base.as_ref()
    }

    /// Every interface this type implements directly, including the
    /// interfaces those extend.
    pub fn interfaces(&self) -> &[TypeRef] {
        &self.interfaces
    }

    /// Type arguments of a closed generic, empty otherwise.
    pub fn type_arguments(&self) -> &[ServiceKey] {
        match &self.generic {
            Generic::Instance { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// How to construct an instance, for classes that can be built.
    pub fn activator(&self) -> Option<&Factory> {
        self.activator.as_ref()
    }

    pub fn can_activate(&self) -> bool {
        self.activator.is_some()
    }

    /// Coercion from an instance of this class to `service`.
    pub fn upcast_to(&self, service: &ServiceKey) -> Option<&Upcast> {
        self.declared
            .iter()
            .find(|declared| declared.interface.key == *service)
            .and_then(|declared| declared.upcast.as_ref())
    }

    /// Every service this class can be exposed as through a declared upcast.
    pub fn upcasts(&self) -> impl Iterator<Item = (ServiceKey, &Upcast)> {
        self.declared.iter().filter_map(|declared| {
            declared
                .upcast
                .as_ref()
                .map(|upcast| (declared.interface.key, upcast))
        })
    }

    /// This type followed by its base types.
    pub fn chain(&self) -> Vec<ServiceKey> {
        fluentdi_support::closure::ancestry(self)
            .map(TypeInfo::key)
            .collect()
    }
}

impl TypeDescriptor for TypeInfo {
    fn implemented_interfaces(&self) -> impl Iterator<Item = &Self> {
        self.interfaces.iter().map(|interface| &**interface)
    }

    fn base_type(&self) -> Option<&Self> {
        self.base.as_deref()
    }

    fn is_generic_type(&self) -> bool {
        !matches!(self.generic, Generic::None)
    }

    fn generic_definition(&self) -> Option<&Self> {
        match &self.generic {
            Generic::None => None,
            Generic::Definition => Some(self),
            Generic::Instance { definition, .. } => Some(definition),
        }
    }

    fn is_same(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interfaces: Vec<ServiceKey> = self.interfaces.iter().map(|i| i.key).collect();
        f.debug_struct("TypeInfo")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("generic", &self.generic)
            .field("base", &self.base.as_ref().map(|base| base.key))
            .field("interfaces", &interfaces)
            .field("activatable", &self.activator.is_some())
            .finish()
    }
}

fn flatten(declared: &[TypeRef]) -> Vec<TypeRef> {
    let mut all: Vec<TypeRef> = Vec::new();
    for interface in declared {
        for candidate in std::iter::once(interface).chain(interface.interfaces.iter()) {
            if !all.iter().any(|known| known.key == candidate.key) {
                all.push(candidate.clone());
            }
        }
    }
    all
}

/// Builder for interface metadata.
#[derive(Debug)]
pub struct InterfaceBuilder {
    key: ServiceKey,
    generic: Generic,
    extends: Vec<TypeRef>,
}

impl InterfaceBuilder {
    /// Marks this interface as an unbound generic definition.
    pub fn generic_definition(mut self) -> Self {
        self.generic = Generic::Definition;
        self
    }

    /// Marks this interface as `definition` closed over `arguments`.
    pub fn closing(mut self, definition: &TypeRef, arguments: &[ServiceKey]) -> Self {
        self.generic = Generic::Instance {
            definition: definition.clone(),
            arguments: arguments.to_vec(),
        };
        self
    }

    /// Declares a super-interface.
    pub fn extends(mut self, interface: &TypeRef) -> Self {
        self.extends.push(interface.clone());
        self
    }

    pub fn build(self) -> TypeRef {
        Arc::new(TypeInfo {
            key: self.key,
            kind: TypeKind::Interface,
            generic: self.generic,
            base: None,
            interfaces: flatten(&self.extends),
            declared: self
                .extends
                .into_iter()
                .map(|interface| Declared { interface, upcast: None })
                .collect(),
            activator: None,
        })
    }
}

/// Builder for class metadata.
///
/// Typed by the class so upcasts and activators can be checked at compile time.
pub struct ClassBuilder<C> {
    key: ServiceKey,
    generic: Generic,
    base: Option<TypeRef>,
    declared: Vec<Declared>,
    activator: Option<Factory>,
    _component: PhantomData<fn() -> C>,
}

impl<C: 'static> ClassBuilder<C> {
    /// Marks this class as an unbound generic definition.
    pub fn generic_definition(mut self) -> Self {
        self.generic = Generic::Definition;
        self
    }

    /// Marks this class as `definition` closed over `arguments`.
    pub fn closing(mut self, definition: &TypeRef, arguments: &[ServiceKey]) -> Self {
        self.generic = Generic::Instance {
            definition: definition.clone(),
            arguments: arguments.to_vec(),
        };
        self
    }

    /// Sets the base class.
    pub fn inherits(mut self, base: &TypeRef) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Declares an implemented interface without a way to upcast to it.
    ///
    /// Enough for closure checks; resolving the class as this interface
    /// needs [`implements_as`](Self::implements_as).
    pub fn implements(mut self, interface: &TypeRef) -> Self {
        self.declared.push(Declared {
            interface: interface.clone(),
            upcast: None,
        });
        self
    }

    /// Declares an implemented interface the class can be resolved as.
    pub fn implements_as<I>(mut self, interface: &TypeRef) -> Self
    where
        C: Implements<I> + Send + Sync,
        I: ?Sized + Send + Sync + 'static,
    {
        let upcast: Upcast = Arc::new(|instance: &Instance| {
            let component = instance.downcast_ref::<Arc<C>>()?.clone();
            Some(Arc::new(<C as Implements<I>>::upcast(component)) as Instance)
        });
        self.declared.push(Declared {
            interface: interface.clone(),
            upcast: Some(upcast),
        });
        self
    }

    /// Builds instances with `create`.
    pub fn activated_by(
        mut self,
        create: impl Fn(&dyn Resolver) -> Result<C> + Send + Sync + 'static,
    ) -> Self
    where
        C: Send + Sync,
    {
        self.activator = Some(Arc::new(move |resolver: &dyn Resolver| {
            Ok(Arc::new(Arc::new(create(resolver)?)) as Instance)
        }));
        self
    }

    /// Builds instances through [`Injectable::inject`].
    pub fn injectable(mut self) -> Self
    where
        C: Injectable,
    {
        self.activator = Some(crate::inject::injectable::<C>());
        self
    }

    pub fn build(self) -> TypeRef {
        let declared_interfaces: Vec<TypeRef> = self
            .declared
            .iter()
            .map(|declared| declared.interface.clone())
            .collect();

        Arc::new(TypeInfo {
            key: self.key,
            kind: TypeKind::Class,
            generic: self.generic,
            base: self.base,
            interfaces: flatten(&declared_interfaces),
            declared: self.declared,
            activator: self.activator,
        })
    }
}

impl<C> fmt::Debug for ClassBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder").field("key", &self.key).finish()
    }
}
