//! Service identification keys.
//!
//! [`ServiceKey`] names a service by its Rust [`TypeId`]. Trait objects are
//! ordinary keys: `dyn Repository<Customer>` and `CustomerRepository` are
//! two different services.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use fluentdi_support::rendering::shorten_type_name;

/// Identifies a service, a component or a described type.
///
/// # Examples
/// ```
/// use fluentdi_container::key::ServiceKey;
///
/// let key = ServiceKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert_eq!(key.to_string(), "String");
/// ```
#[derive(Clone, Copy)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceKey {
    /// Key for type `T`, sized or not.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Key from a raw [`TypeId`] and the name to show for it.
    #[inline]
    pub fn from_raw(type_id: TypeId, type_name: &'static str) -> Self {
        Self { type_id, type_name }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name with module paths removed, for messages.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceKey {}

// consistent with PartialEq: TypeId only
impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceKey({})", self.type_name)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Repository<T> {
        fn get(&self, id: u32) -> Option<T>;
    }

    struct Customer;

    #[test]
    fn same_type_same_key() {
        assert_eq!(ServiceKey::of::<Customer>(), ServiceKey::of::<Customer>());
    }

    #[test]
    fn trait_object_and_struct_differ() {
        assert_ne!(
            ServiceKey::of::<dyn Repository<Customer>>(),
            ServiceKey::of::<Customer>()
        );
    }

    #[test]
    fn instantiations_differ() {
        assert_ne!(
            ServiceKey::of::<dyn Repository<Customer>>(),
            ServiceKey::of::<dyn Repository<u32>>()
        );
    }

    #[test]
    fn display_is_short() {
        let key = ServiceKey::of::<dyn Repository<Customer>>();
        assert_eq!(key.to_string(), "dyn Repository<Customer>");
        assert!(format!("{key:?}").contains("::"));
    }

    #[test]
    fn usable_as_map_key() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(ServiceKey::of::<Customer>(), "customer");
        assert_eq!(map.get(&ServiceKey::of::<Customer>()), Some(&"customer"));
        assert_eq!(map.get(&ServiceKey::of::<u8>()), None);
    }

    #[test]
    fn raw_key_matches_typed_key() {
        let raw = ServiceKey::from_raw(TypeId::of::<u64>(), "u64");
        assert_eq!(raw, ServiceKey::of::<u64>());
    }
}
