//! A collection of described types.
//!
//! The catalog is where the container looks up closed generic
//! implementations, and what closed-type scanning walks.

use std::collections::HashMap;

use fluentdi_support::{TypeDescriptor, closes_type};

use crate::key::ServiceKey;
use crate::reflect::{TypeKind, TypeRef};

/// Described types, keyed by [`ServiceKey`].
#[derive(Debug, Default, Clone)]
pub struct TypeCatalog {
    types: HashMap<ServiceKey, TypeRef>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `ty`, replacing an earlier description of the same type, and
    /// hands the handle back.
    pub fn add(&mut self, ty: TypeRef) -> TypeRef {
        self.types.insert(ty.key(), ty.clone());
        ty
    }

    /// Chaining form of [`add`](Self::add).
    pub fn with(mut self, ty: TypeRef) -> Self {
        self.add(ty);
        self
    }

    pub fn get(&self, key: &ServiceKey) -> Option<&TypeRef> {
        self.types.get(key)
    }

    pub fn get_of<T: ?Sized + 'static>(&self) -> Option<&TypeRef> {
        self.get(&ServiceKey::of::<T>())
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.types.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeRef> {
        self.types.values()
    }

    /// Copies every type of `other` into this catalog.
    pub fn extend(&mut self, other: &TypeCatalog) {
        for ty in other.iter() {
            self.add(ty.clone());
        }
    }

    /// The class that closes `definition` over exactly `arguments`.
    pub fn closed_instance_of(
        &self,
        definition: &TypeRef,
        arguments: &[ServiceKey],
    ) -> Option<&TypeRef> {
        self.types.values().find(|ty| {
            ty.kind() == TypeKind::Class
                && !ty.is_generic_type_definition()
                && ty
                    .generic_definition()
                    .is_some_and(|own| own.is_same(definition))
                && ty.type_arguments() == arguments
        })
    }

    /// Constructible classes that close the open generic `target`, sorted by
    /// name.
    pub fn closing_types(&self, target: &TypeRef) -> Vec<&TypeRef> {
        let mut closing: Vec<&TypeRef> = self
            .types
            .values()
            .filter(|ty| {
                ty.kind() == TypeKind::Class
                    && !ty.is_generic_type_definition()
                    && ty.can_activate()
                    && closes_type(&***ty, &**target)
            })
            .collect();
        closing.sort_by_key(|ty| ty.name());
        closing
    }
}

impl FromIterator<TypeRef> for TypeCatalog {
    fn from_iter<I: IntoIterator<Item = TypeRef>>(iter: I) -> Self {
        let mut catalog = TypeCatalog::new();
        for ty in iter {
            catalog.add(ty);
        }
        catalog
    }
}
