//! # fluentdi Support
//!
//! Container-independent building blocks for the fluentdi crates.
//!
//! This crate provides:
//! - The [`closure::TypeDescriptor`] capability and the generic closure check
//! - Text rendering for error messages

pub mod closure;
pub mod rendering;

pub use closure::{ClosureQuery, TypeDescriptor, closes_type};
