//! Generic closure checks over type metadata.
//!
//! A type *closes* an open generic interface `I<>` when it, or any type in
//! its inheritance chain, implements some instantiation `I<X>`. The check
//! compares generic definitions by identity, so `Repository<Customer>` and
//! `Repository<Order>` both close `Repository<>`.
//!
//! Nothing here knows where the metadata comes from. Anything that answers
//! the [`TypeDescriptor`] queries can be checked.
//!
//! # Examples
//! ```rust,ignore
//! if !closes_type(&*implementation, &*service) {
//!     return Err(/* reject the registration */);
//! }
//! ```

use tracing::trace;

/// Read-only view of a type in some host type system.
///
/// Handles are borrowed: a descriptor hands out references to the
/// descriptors of its interfaces, its base and its generic definition.
pub trait TypeDescriptor {
    /// Interfaces this type declares as implemented.
    fn implemented_interfaces(&self) -> impl Iterator<Item = &Self>;

    /// Immediate ancestor, `None` for a root type.
    fn base_type(&self) -> Option<&Self>;

    /// Whether the type is generic, either a definition or an instantiation.
    fn is_generic_type(&self) -> bool;

    /// The unbound definition of a generic type.
    ///
    /// An unbound definition returns itself.
    fn generic_definition(&self) -> Option<&Self>;

    /// Identity comparison.
    fn is_same(&self, other: &Self) -> bool;

    /// Whether this type is an unbound generic definition such as `Repository<>`.
    fn is_generic_type_definition(&self) -> bool {
        self.is_generic_type()
            && self
                .generic_definition()
                .is_some_and(|definition| definition.is_same(self))
    }
}

/// Iterator over a type followed by each of its ancestors.
///
/// Created by [`ancestry`].
#[derive(Debug)]
pub struct Ancestry<'a, T> {
    next: Option<&'a T>,
}

impl<'a, T: TypeDescriptor> Iterator for Ancestry<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let current = self.next?;
        self.next = current.base_type();
        Some(current)
    }
}

/// Walks `ty` and its base types, nearest first.
pub fn ancestry<T: TypeDescriptor>(ty: &T) -> Ancestry<'_, T> {
    Ancestry { next: Some(ty) }
}

/// Returns `true` if `candidate`, or any of its ancestors, implements an
/// instantiation of the generic definition `target`.
///
/// `target` must be an unbound generic definition; callers check this
/// before asking.
///
/// # Examples
/// ```rust,ignore
/// // CustomerRepository : GenericRepository<Customer> : Repository<Customer>
/// assert!(closes_type(&customer_repository, &repository_definition));
/// assert!(!closes_type(&console_writer, &repository_definition));
/// ```
pub fn closes_type<T: TypeDescriptor>(candidate: &T, target: &T) -> bool {
    let closes = ancestry(candidate).any(|ty| {
        ty.implemented_interfaces()
            .any(|interface| instantiates(interface, target))
    });

    trace!(closes, "Generic closure check");
    closes
}

/// Every interface along `candidate`'s chain that instantiates `target`.
///
/// Interfaces come back nearest type first, in declaration order.
/// Empty exactly when [`closes_type`] is `false`.
pub fn closing_interfaces<'a, T: TypeDescriptor>(candidate: &'a T, target: &T) -> Vec<&'a T> {
    ancestry(candidate)
        .flat_map(|ty| ty.implemented_interfaces())
        .filter(|interface| instantiates(*interface, target))
        .collect()
}

/// Whether a value of type `candidate` can stand in for `service`.
///
/// True when `service` is the candidate itself, one of its ancestors, or
/// an interface implemented anywhere along the chain.
pub fn is_assignable_to<T: TypeDescriptor>(candidate: &T, service: &T) -> bool {
    ancestry(candidate).any(|ty| {
        ty.is_same(service)
            || ty
                .implemented_interfaces()
                .any(|interface| interface.is_same(service))
    })
}

fn instantiates<T: TypeDescriptor>(interface: &T, definition: &T) -> bool {
    interface.is_generic_type()
        && interface
            .generic_definition()
            .is_some_and(|own| own.is_same(definition))
}

/// A single closure question: does `candidate` close `target`?
#[derive(Debug)]
pub struct ClosureQuery<'a, T> {
    pub candidate: &'a T,
    pub target: &'a T,
}

impl<'a, T: TypeDescriptor> ClosureQuery<'a, T> {
    pub fn new(candidate: &'a T, target: &'a T) -> Self {
        Self { candidate, target }
    }

    /// Runs [`closes_type`] for this pair.
    pub fn evaluate(&self) -> bool {
        closes_type(self.candidate, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Ty {
        name: &'static str,
        generic: bool,
        definition: Option<Arc<Ty>>,
        interfaces: Vec<Arc<Ty>>,
        base: Option<Arc<Ty>>,
    }

    impl TypeDescriptor for Ty {
        fn implemented_interfaces(&self) -> impl Iterator<Item = &Self> {
            self.interfaces.iter().map(|i| &**i)
        }

        fn base_type(&self) -> Option<&Self> {
            self.base.as_deref()
        }

        fn is_generic_type(&self) -> bool {
            self.generic
        }

        fn generic_definition(&self) -> Option<&Self> {
            self.definition.as_deref().or(self.generic.then_some(self))
        }

        fn is_same(&self, other: &Self) -> bool {
            self.name == other.name
        }
    }

    fn open(name: &'static str) -> Arc<Ty> {
        Arc::new(Ty { name, generic: true, definition: None, interfaces: vec![], base: None })
    }

    fn closed(definition: &Arc<Ty>, name: &'static str) -> Arc<Ty> {
        Arc::new(Ty {
            name,
            generic: true,
            definition: Some(definition.clone()),
            interfaces: vec![],
            base: None,
        })
    }

    fn plain(name: &'static str) -> Arc<Ty> {
        Arc::new(Ty { name, generic: false, definition: None, interfaces: vec![], base: None })
    }

    fn class(name: &'static str, interfaces: Vec<Arc<Ty>>, base: Option<Arc<Ty>>) -> Arc<Ty> {
        Arc::new(Ty { name, generic: false, definition: None, interfaces, base })
    }

    #[test]
    fn direct_implementation_closes() {
        let repo = open("dyn Repository<>");
        let customer_repo_iface = closed(&repo, "dyn Repository<Customer>");
        let customer_repository = class("CustomerRepository", vec![customer_repo_iface], None);

        assert!(closes_type(&*customer_repository, &*repo));
    }

    #[test]
    fn inherited_implementation_closes() {
        let repo = open("dyn Repository<>");
        let generic_repository = class(
            "GenericRepository<Customer>",
            vec![closed(&repo, "dyn Repository<Customer>")],
            None,
        );
        // no interfaces of its own, only the ancestor path can match
        let customer_repository = class("CustomerRepository", vec![], Some(generic_repository));

        assert!(closes_type(&*customer_repository, &*repo));
    }

    #[test]
    fn non_generic_interface_does_not_close() {
        let repo = open("dyn Repository<>");
        let console_writer = class("ConsoleWriter", vec![plain("dyn ConsoleWrite")], None);

        assert!(!closes_type(&*console_writer, &*repo));
    }

    #[test]
    fn root_without_interfaces_does_not_close() {
        let repo = open("dyn Repository<>");
        let root = class("Root", vec![], None);

        assert!(!closes_type(&*root, &*repo));
    }

    #[test]
    fn other_generic_definition_does_not_close() {
        let repo = open("dyn Repository<>");
        let handler = open("dyn Handler<>");
        let ty = class("OrderHandler", vec![closed(&handler, "dyn Handler<Order>")], None);

        assert!(!closes_type(&*ty, &*repo));
    }

    #[test]
    fn unrelated_chain_does_not_close() {
        let repo = open("dyn Repository<>");
        let base = class("Base", vec![plain("dyn Close")], None);
        let middle = class("Middle", vec![plain("dyn ConsoleWrite")], Some(base));
        let leaf = class("Leaf", vec![], Some(middle));

        assert!(!closes_type(&*leaf, &*repo));
    }

    #[test]
    fn two_instantiations_still_one_answer() {
        let repo = open("dyn Repository<>");
        let ty = class(
            "MultiRepository",
            vec![
                closed(&repo, "dyn Repository<Customer>"),
                closed(&repo, "dyn Repository<Order>"),
            ],
            None,
        );

        assert!(closes_type(&*ty, &*repo));
        assert_eq!(closing_interfaces(&*ty, &*repo).len(), 2);
    }

    #[test]
    fn match_deep_in_chain() {
        let repo = open("dyn Repository<>");
        let mut ty = class("Level0", vec![closed(&repo, "dyn Repository<Customer>")], None);
        for name in ["Level1", "Level2", "Level3", "Level4"] {
            ty = class(name, vec![plain("dyn Marker")], Some(ty));
        }

        assert!(closes_type(&*ty, &*repo));
    }

    #[test]
    fn open_implementation_closes_open_interface() {
        let repo = open("dyn Repository<>");
        let implementation = Arc::new(Ty {
            name: "GenericRepository<>",
            generic: true,
            definition: None,
            interfaces: vec![repo.clone()],
            base: None,
        });

        assert!(implementation.is_generic_type_definition());
        assert!(closes_type(&*implementation, &*repo));
    }

    #[test]
    fn closed_instantiation_is_not_a_definition() {
        let repo = open("dyn Repository<>");
        let closed_repo = closed(&repo, "dyn Repository<Customer>");

        assert!(repo.is_generic_type_definition());
        assert!(!closed_repo.is_generic_type_definition());
        assert!(!plain("dyn ConsoleWrite").is_generic_type_definition());
    }

    #[test]
    fn closing_interfaces_walks_ancestors_nearest_first() {
        let repo = open("dyn Repository<>");
        let base = class("Base", vec![closed(&repo, "dyn Repository<Order>")], None);
        let leaf = class("Leaf", vec![closed(&repo, "dyn Repository<Customer>")], Some(base));

        let names: Vec<_> = closing_interfaces(&*leaf, &*repo)
            .into_iter()
            .map(|ty| ty.name)
            .collect();
        assert_eq!(names, ["dyn Repository<Customer>", "dyn Repository<Order>"]);
    }

    #[test]
    fn ancestry_starts_with_self() {
        let base = class("Base", vec![], None);
        let leaf = class("Leaf", vec![], Some(base));

        let names: Vec<_> = ancestry(&*leaf).map(|ty| ty.name).collect();
        assert_eq!(names, ["Leaf", "Base"]);
    }

    #[test]
    fn assignable_through_interface_and_base() {
        let writer = plain("dyn ConsoleWrite");
        let base = class("WriterBase", vec![writer.clone()], None);
        let leaf = class("ConsoleWriter", vec![], Some(base.clone()));

        assert!(is_assignable_to(&*leaf, &*leaf));
        assert!(is_assignable_to(&*leaf, &*base));
        assert!(is_assignable_to(&*leaf, &*writer));
        assert!(!is_assignable_to(&*base, &*leaf));
        assert!(!is_assignable_to(&*leaf, &*plain("dyn Scoped")));
    }

    #[test]
    fn query_evaluates_pair() {
        let repo = open("dyn Repository<>");
        let ty = class("CustomerRepository", vec![closed(&repo, "dyn Repository<Customer>")], None);

        assert!(ClosureQuery::new(&*ty, &*repo).evaluate());
        assert!(!ClosureQuery::new(&*plain("Other"), &*repo).evaluate());
    }
}
