//! Container library behind the fluentdi facade.

pub mod catalog;
pub mod container;
pub mod delegate;
pub mod error;
pub mod inject;
pub mod key;
pub mod lifetime;
pub mod module;
pub mod reflect;
pub mod registry;
pub mod settings;

pub use catalog::TypeCatalog;
pub use container::{Container, ContainerBuilder, LifetimeScope, prelude, resolve};
pub use delegate::ParameterizedFactory;
pub use error::{FluentError, Result};
pub use inject::Injectable;
pub use key::ServiceKey;
pub use lifetime::Lifetime;
pub use module::{Module, ModuleRegistry};
pub use reflect::{Implements, Open, TypeInfo, TypeKind, TypeRef};
pub use registry::{Factory, Instance, Resolver};
pub use settings::ContainerSettings;
