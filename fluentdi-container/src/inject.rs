//! Constructor injection.
//!
//! A component implements [`Injectable`] to say how it is built from the
//! container. The fluent registration methods only accept injectable
//! components.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use fluentdi_container::container::resolve;
//! use fluentdi_container::inject::Injectable;
//! use fluentdi_container::registry::Resolver;
//! use fluentdi_container::Result;
//!
//! struct Config {
//!     connection: String,
//! }
//!
//! struct CustomerRepository {
//!     config: Arc<Config>,
//! }
//!
//! impl Injectable for CustomerRepository {
//!     fn inject(resolver: &dyn Resolver) -> Result<Self> {
//!         Ok(Self { config: resolve(resolver)? })
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::reflect::Implements;
use crate::registry::{Factory, Instance, Resolver};

/// A component the container can construct.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Builds the component, resolving what it needs from `resolver`.
    fn inject(resolver: &dyn Resolver) -> Result<Self>;
}

/// Factory producing `Arc<C>`.
pub fn injectable<C: Injectable>() -> Factory {
    Arc::new(|resolver: &dyn Resolver| Ok(Arc::new(Arc::new(C::inject(resolver)?)) as Instance))
}

/// Factory producing `Arc<I>` backed by a freshly injected `C`.
pub fn injectable_as<C, I>() -> Factory
where
    C: Injectable + Implements<I>,
    I: ?Sized + Send + Sync + 'static,
{
    Arc::new(|resolver: &dyn Resolver| {
        let component = Arc::new(C::inject(resolver)?);
        Ok(Arc::new(<C as Implements<I>>::upcast(component)) as Instance)
    })
}

/// Factory returning `value` every time.
pub fn constant<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Factory {
    let instance: Instance = Arc::new(value);
    Arc::new(move |_: &dyn Resolver| Ok(instance.clone()))
}

/// Factory calling `create` and erasing its result.
pub fn from_fn<T, F>(create: F) -> Factory
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&dyn Resolver) -> Result<Arc<T>> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &dyn Resolver| Ok(Arc::new(create(resolver)?) as Instance))
}
