//! # fluentdi: fluent dependency-injection registration for Rust
//!
//! A chainable facade over the `fluentdi-container` builder. Typed
//! registrations are checked by the compiler; open generic registrations
//! are checked against described type metadata before they are accepted.
//!
//! ```rust,ignore
//! let container = FluentBuilder::new()
//!     .with_types(&catalog)
//!     .register_type_as_singleton::<ConsoleWriter, dyn ConsoleWrite>()
//!     .add_generic_as_scoped(&generic_repository, &repository)?
//!     .apply_module::<StorageModule>()
//!     .build()?;
//! ```

pub mod builder;

pub use builder::FluentBuilder;
pub use fluentdi_container::*;
pub use fluentdi_support::{ClosureQuery, TypeDescriptor, closes_type};

pub mod prelude {
    pub use crate::builder::FluentBuilder;
    pub use fluentdi_container::prelude::*;
    pub use fluentdi_support::{TypeDescriptor, closes_type};
}
