//! Class presence and type conformance checks
//!
//! Every rule that needs a loaded type goes through [`ConformanceChecker`], so
//! a type that cannot be loaded is always reported the same way and never
//! stops the rule from looking at the next component.

use crate::messages::keys;
use crate::types::{is_assignable, TypeDescriptor, TypeLoadError, TypeLookup};
use diagnostics::ValidationContext;
use std::sync::Arc;

pub struct ConformanceChecker<'a> {
    lookup: &'a dyn TypeLookup,
    context: &'a mut ValidationContext,
}

impl<'a> ConformanceChecker<'a> {
    pub fn new(lookup: &'a dyn TypeLookup, context: &'a mut ValidationContext) -> Self {
        Self { lookup, context }
    }

    pub fn lookup(&self) -> &'a dyn TypeLookup {
        self.lookup
    }

    pub fn context(&mut self) -> &mut ValidationContext {
        &mut *self.context
    }

    /// Load `name` or record why it could not be loaded.
    ///
    /// `None` tells the caller to skip the checks that need this type.
    pub fn require_class(
        &mut self,
        component: &str,
        name: &str,
        role: &str,
    ) -> Option<Arc<TypeDescriptor>> {
        match self.lookup.load_type(name) {
            Ok(ty) => Some(ty),
            Err(TypeLoadError::NotFound { .. }) => {
                self.context
                    .fail(component, keys::MISSING_CLASS, &[&name, &role, &component]);
                None
            }
            Err(TypeLoadError::Linkage { missing, .. }) => {
                self.context
                    .fail(component, keys::MISSLOCATED_CLASS, &[&name, &missing, &role]);
                None
            }
        }
    }

    /// Load `candidate` and check it is a subtype of `expected`.
    ///
    /// A load failure is reported once by [`Self::require_class`] and
    /// yields `false` without a type mismatch on top of it.
    pub fn require_assignable(
        &mut self,
        component: &str,
        candidate: &str,
        expected: &str,
        role: &str,
    ) -> bool {
        let Some(ty) = self.require_class(component, candidate, role) else {
            return false;
        };

        if is_assignable(self.lookup, expected, &ty) {
            true
        } else {
            self.context.fail(
                component,
                keys::WRONG_CLASS_TYPE,
                &[&candidate, &expected, &role],
            );
            false
        }
    }

    /// Load `name` and check it is an interface, failing with `key` if not
    pub fn require_interface(
        &mut self,
        component: &str,
        name: &str,
        role: &str,
        key: &str,
    ) -> Option<Arc<TypeDescriptor>> {
        let ty = self.require_class(component, name, role)?;
        if ty.is_interface() {
            Some(ty)
        } else {
            self.context.fail(component, key, &[&name]);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{well_known, TypeCatalog};

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::with_parent(Arc::new(TypeCatalog::platform()));
        catalog.insert(TypeDescriptor::interface("com.acme.CartHome").implements(well_known::EJB_HOME));
        catalog.insert(TypeDescriptor::interface("com.acme.NotAHome"));
        catalog.insert(TypeDescriptor::class("com.acme.Orphan").extends("com.acme.Missing"));
        catalog
    }

    #[test]
    fn test_missing_class_is_a_failure_with_sentinel() {
        let catalog = catalog();
        let mut context = ValidationContext::new("m");
        let mut checker = ConformanceChecker::new(&catalog, &mut context);

        assert!(checker.require_class("Cart", "com.acme.Nope", "bean").is_none());
        assert_eq!(context.failures().len(), 1);
        assert_eq!(context.failures()[0].key, keys::MISSING_CLASS);
        assert_eq!(context.failures()[0].params, vec!["com.acme.Nope", "bean", "Cart"]);
    }

    #[test]
    fn test_link_failure_is_misslocated() {
        let catalog = catalog();
        let mut context = ValidationContext::new("m");
        let mut checker = ConformanceChecker::new(&catalog, &mut context);

        assert!(checker.require_class("Cart", "com.acme.Orphan", "bean").is_none());
        assert_eq!(context.failures()[0].key, keys::MISSLOCATED_CLASS);
        assert_eq!(context.failures()[0].params[1], "com.acme.Missing");
    }

    #[test]
    fn test_wrong_type() {
        let catalog = catalog();
        let mut context = ValidationContext::new("m");
        let mut checker = ConformanceChecker::new(&catalog, &mut context);

        assert!(checker.require_assignable("Cart", "com.acme.CartHome", well_known::EJB_HOME, "home"));
        assert!(!checker.require_assignable("Cart", "com.acme.NotAHome", well_known::EJB_HOME, "home"));

        assert_eq!(context.failures().len(), 1);
        assert_eq!(context.failures()[0].key, keys::WRONG_CLASS_TYPE);
        assert_eq!(
            context.failures()[0].params,
            vec!["com.acme.NotAHome", well_known::EJB_HOME, "home"]
        );
    }

    #[test]
    fn test_missing_candidate_does_not_compound() {
        let catalog = catalog();
        let mut context = ValidationContext::new("m");
        let mut checker = ConformanceChecker::new(&catalog, &mut context);

        assert!(!checker.require_assignable("Cart", "com.acme.Gone", well_known::EJB_HOME, "home"));
        assert_eq!(context.len(), 1);
        assert_eq!(context.failures()[0].key, keys::MISSING_CLASS);
    }
}
