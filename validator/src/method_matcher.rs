//! Interface to implementation method matching
//!
//! Looks methods up by name and parameter types along the superclass chain.
//! When a method is missing, the matcher looks for near misses (same name
//! with other parameters, or a name that differs only in the case of its
//! first letter) so the diagnostic can point at the likely typo.

use crate::messages::keys;
use crate::model::{Component, ComponentKind, SessionKind};
use crate::types::{superclass_chain, well_known, MethodDescriptor, TypeDescriptor, TypeLookup};
use diagnostics::ValidationContext;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

const CREATE_PREFIX: &str = "create";
const EJB_CREATE_PREFIX: &str = "ejbCreate";
const EJB_POST_CREATE_PREFIX: &str = "ejbPostCreate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearMiss {
    /// Same name, different parameter types
    Arguments,
    /// Name differs only in the case of its first letter
    Case,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatch {
    Matched(MethodDescriptor),
    NotFound,
    AmbiguousCandidates { near_miss: NearMiss, count: usize },
}

pub struct MethodMatcher<'a> {
    lookup: &'a dyn TypeLookup,
}

impl<'a> MethodMatcher<'a> {
    pub fn new(lookup: &'a dyn TypeLookup) -> Self {
        Self { lookup }
    }

    /// Exact lookup by name and parameter types, nearest declaration first
    pub fn find_method<S: AsRef<str>>(
        &self,
        ty: &Arc<TypeDescriptor>,
        name: &str,
        parameter_types: &[S],
    ) -> Option<MethodDescriptor> {
        superclass_chain(self.lookup, ty)
            .iter()
            .find_map(|t| t.declared_method(name, parameter_types).cloned())
    }

    /// Every method called `name` along the superclass chain
    pub fn methods_named(&self, ty: &Arc<TypeDescriptor>, name: &str) -> Vec<MethodDescriptor> {
        superclass_chain(self.lookup, ty)
            .iter()
            .flat_map(|t| t.declared_methods_named(name).cloned().collect::<Vec<_>>())
            .collect()
    }

    fn methods_with_other_case(&self, ty: &Arc<TypeDescriptor>, name: &str) -> Vec<MethodDescriptor> {
        superclass_chain(self.lookup, ty)
            .iter()
            .flat_map(|t| {
                t.methods
                    .iter()
                    .filter(|m| differs_only_in_first_letter_case(&m.name, name))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn match_method(
        &self,
        interface_method: &MethodDescriptor,
        implementation: &Arc<TypeDescriptor>,
    ) -> MethodMatch {
        if let Some(found) = self.find_method(
            implementation,
            &interface_method.name,
            &interface_method.parameter_types,
        ) {
            return MethodMatch::Matched(found);
        }

        let same_name = self.methods_named(implementation, &interface_method.name).len();
        if same_name > 0 {
            return MethodMatch::AmbiguousCandidates {
                near_miss: NearMiss::Arguments,
                count: same_name,
            };
        }

        let other_case = self
            .methods_with_other_case(implementation, &interface_method.name)
            .len();
        if other_case > 0 {
            return MethodMatch::AmbiguousCandidates {
                near_miss: NearMiss::Case,
                count: other_case,
            };
        }

        MethodMatch::NotFound
    }

    /// Methods of `interface` and of every interface it extends, first
    /// declaration of each signature wins
    pub fn interface_methods(&self, interface: &Arc<TypeDescriptor>) -> Vec<MethodDescriptor> {
        let mut methods = Vec::new();
        let mut signatures = HashSet::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([Arc::clone(interface)]);

        while let Some(ty) = queue.pop_front() {
            if !seen.insert(ty.name.clone()) {
                continue;
            }
            for method in &ty.methods {
                if signatures.insert(method.signature()) {
                    methods.push(method.clone());
                }
            }
            for parent in &ty.interfaces {
                if let Ok(parent) = self.lookup.load_type(parent) {
                    queue.push_back(parent);
                }
            }
        }

        methods
    }

    /// One diagnostic per interface method the implementation lacks.
    /// Returns `true` when every method matched.
    pub fn check_business_interface(
        &self,
        component: &Component,
        interface: &Arc<TypeDescriptor>,
        implementation: &Arc<TypeDescriptor>,
        context: &mut ValidationContext,
    ) -> bool {
        let mut all_matched = true;

        for method in self.interface_methods(interface) {
            let signature = method.signature();
            match self.match_method(&method, implementation) {
                MethodMatch::Matched(_) => continue,
                MethodMatch::NotFound => context.fail(
                    &component.name,
                    keys::NO_BUSINESS_METHOD,
                    &[&method.name, &signature, &interface.name, &implementation.name],
                ),
                MethodMatch::AmbiguousCandidates { near_miss, count } => {
                    let key = match near_miss {
                        NearMiss::Arguments => keys::NO_BUSINESS_METHOD_ARGS,
                        NearMiss::Case => keys::NO_BUSINESS_METHOD_CASE,
                    };
                    context.fail(
                        &component.name,
                        key,
                        &[
                            &method.name,
                            &signature,
                            &interface.name,
                            &implementation.name,
                            &count,
                        ],
                    );
                }
            }
            all_matched = false;
        }

        all_matched
    }

    /// Every `create*` method of `home` needs an `ejbCreate*` counterpart on
    /// the bean (and an `ejbPostCreate*` one for entities).
    pub fn match_create_methods(
        &self,
        component: &Component,
        home: &Arc<TypeDescriptor>,
        bean: &Arc<TypeDescriptor>,
        context: &mut ValidationContext,
    ) -> bool {
        let mut all_matched = true;

        for create in self.interface_methods(home) {
            let Some(suffix) = create.name.strip_prefix(CREATE_PREFIX) else {
                continue;
            };
            let parameters = create.parameter_list();

            let ejb_create = format!("{}{}", EJB_CREATE_PREFIX, suffix);
            if self
                .find_method(bean, &ejb_create, &create.parameter_types)
                .is_none()
            {
                match &component.kind {
                    ComponentKind::Entity { primary_key_class } => {
                        let primary_key = primary_key_class.as_deref().unwrap_or(well_known::OBJECT);
                        context.fail(
                            &component.name,
                            keys::ENTITY_NO_EJB_CREATE,
                            &[&bean.name, &primary_key, &ejb_create, &parameters],
                        );
                        all_matched = false;
                    }
                    ComponentKind::Session(kind) if *kind != SessionKind::Stateless => {
                        context.fail(
                            &component.name,
                            keys::SESSION_NO_EJB_CREATE,
                            &[&bean.name, &ejb_create, &parameters],
                        );
                        all_matched = false;
                    }
                    _ => {}
                }
            }

            if component.kind.is_entity() {
                let ejb_post_create = format!("{}{}", EJB_POST_CREATE_PREFIX, suffix);
                if self
                    .find_method(bean, &ejb_post_create, &create.parameter_types)
                    .is_none()
                {
                    context.fail(
                        &component.name,
                        keys::ENTITY_NO_EJB_POST_CREATE,
                        &[&bean.name, &ejb_post_create, &parameters],
                    );
                    all_matched = false;
                }
            }
        }

        all_matched
    }

    /// Bean-side `ejbCreate*` / `ejbPostCreate*` methods no home declares.
    ///
    /// These are warnings: the bean is usable, the method is just dead.
    pub fn check_unused_create_methods(
        &self,
        component: &Component,
        homes: &[Arc<TypeDescriptor>],
        bean: &Arc<TypeDescriptor>,
        context: &mut ValidationContext,
    ) {
        let home_methods: Vec<MethodDescriptor> = homes
            .iter()
            .flat_map(|home| self.interface_methods(home))
            .collect();
        let home_names = homes
            .iter()
            .map(|h| h.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let declared_in_home = |suffix: &str, method: &MethodDescriptor| {
            let create = format!("{}{}", CREATE_PREFIX, suffix);
            home_methods
                .iter()
                .any(|m| m.name == create && m.has_parameters(&method.parameter_types))
        };

        let mut reported = HashSet::new();
        for ty in superclass_chain(self.lookup, bean) {
            for method in &ty.methods {
                if !reported.insert(method.signature()) {
                    continue;
                }

                if let Some(suffix) = method.name.strip_prefix(EJB_POST_CREATE_PREFIX) {
                    if component.kind.is_entity() && !declared_in_home(suffix, method) {
                        context.warn(
                            &component.name,
                            keys::UNUSED_EJB_POST_CREATE,
                            &[&bean.name, &method.name, &method.parameter_list()],
                        );
                    }
                } else if let Some(suffix) = method.name.strip_prefix(EJB_CREATE_PREFIX) {
                    if !declared_in_home(suffix, method) {
                        context.warn(
                            &component.name,
                            keys::UNUSED_EJB_CREATE,
                            &[&bean.name, &method.name, &method.parameter_list(), &home_names],
                        );
                    }
                }
            }
        }
    }
}

fn differs_only_in_first_letter_case(a: &str, b: &str) -> bool {
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    match (a_chars.next(), b_chars.next()) {
        (Some(x), Some(y)) => {
            x != y && x.to_lowercase().eq(y.to_lowercase()) && a_chars.as_str() == b_chars.as_str()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeCatalog;

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::with_parent(Arc::new(TypeCatalog::platform()));
        catalog.insert(
            TypeDescriptor::interface("com.acme.Cart")
                .with_method(MethodDescriptor::new("add", &["java.lang.String"]))
                .with_method(MethodDescriptor::new("checkout", &[]))
                .with_method(MethodDescriptor::new("total", &[]).returning("int"))
                .with_method(MethodDescriptor::new("clear", &[])),
        );
        catalog.insert(
            TypeDescriptor::class("com.acme.BaseCart")
                .with_method(MethodDescriptor::new("clear", &[])),
        );
        catalog.insert(
            TypeDescriptor::class("com.acme.CartBean")
                .extends("com.acme.BaseCart")
                .with_method(MethodDescriptor::new("add", &["int"]))
                .with_method(MethodDescriptor::new("add", &["long"]))
                .with_method(MethodDescriptor::new("Checkout", &[])),
        );
        catalog
    }

    #[test]
    fn test_match_method_classifications() {
        let catalog = catalog();
        let matcher = MethodMatcher::new(&catalog);
        let bean = catalog.load_type("com.acme.CartBean").unwrap();

        assert!(matches!(
            matcher.match_method(&MethodDescriptor::new("clear", &[]), &bean),
            MethodMatch::Matched(_)
        ));
        assert_eq!(
            matcher.match_method(&MethodDescriptor::new("add", &["java.lang.String"]), &bean),
            MethodMatch::AmbiguousCandidates {
                near_miss: NearMiss::Arguments,
                count: 2
            }
        );
        assert_eq!(
            matcher.match_method(&MethodDescriptor::new("checkout", &[]), &bean),
            MethodMatch::AmbiguousCandidates {
                near_miss: NearMiss::Case,
                count: 1
            }
        );
        assert_eq!(
            matcher.match_method(&MethodDescriptor::new("total", &[]), &bean),
            MethodMatch::NotFound
        );
    }

    #[test]
    fn test_business_interface_emits_one_record_per_method() {
        let catalog = catalog();
        let matcher = MethodMatcher::new(&catalog);
        let interface = catalog.load_type("com.acme.Cart").unwrap();
        let bean = catalog.load_type("com.acme.CartBean").unwrap();
        let component = Component::stateless("Cart", "com.acme.CartBean");
        let mut context = ValidationContext::new("m");

        assert!(!matcher.check_business_interface(&component, &interface, &bean, &mut context));

        let found: Vec<_> = context.failures().iter().map(|r| r.key.as_str()).collect();
        assert_eq!(
            found,
            vec![
                keys::NO_BUSINESS_METHOD_ARGS,
                keys::NO_BUSINESS_METHOD_CASE,
                keys::NO_BUSINESS_METHOD
            ]
        );
        assert!(context.failures().iter().all(|r| r.component == "Cart"));
        assert_eq!(context.failures()[0].params[4], "2");
        assert_eq!(context.failures()[2].params[1], "total()");
    }

    #[test]
    fn test_first_letter_case() {
        assert!(differs_only_in_first_letter_case("Checkout", "checkout"));
        assert!(!differs_only_in_first_letter_case("checkout", "checkout"));
        assert!(!differs_only_in_first_letter_case("checkOut", "checkout"));
        assert!(!differs_only_in_first_letter_case("", "a"));
    }

    fn entity_catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::with_parent(Arc::new(TypeCatalog::platform()));
        catalog.insert(
            TypeDescriptor::interface("com.acme.AccountHome")
                .implements(well_known::EJB_HOME)
                .with_method(
                    MethodDescriptor::new("create", &["java.lang.String"])
                        .returning("com.acme.Account"),
                )
                .with_method(
                    MethodDescriptor::new("createWithBalance", &["java.lang.String", "int"])
                        .returning("com.acme.Account"),
                )
                .with_method(MethodDescriptor::new("findByPrimaryKey", &["java.lang.String"])),
        );
        catalog.insert(
            TypeDescriptor::class("com.acme.AccountBean")
                .with_method(MethodDescriptor::new("ejbCreate", &["java.lang.String"]))
                .with_method(MethodDescriptor::new("ejbPostCreate", &["java.lang.String"]))
                .with_method(MethodDescriptor::new("ejbCreateWithBalance", &["java.lang.String"]))
                .with_method(MethodDescriptor::new("ejbCreateLegacy", &[])),
        );
        catalog
    }

    #[test]
    fn test_create_methods_for_entity() {
        let catalog = entity_catalog();
        let matcher = MethodMatcher::new(&catalog);
        let home = catalog.load_type("com.acme.AccountHome").unwrap();
        let bean = catalog.load_type("com.acme.AccountBean").unwrap();
        let component = Component::entity("Account", "com.acme.AccountBean");
        let mut context = ValidationContext::new("m");

        assert!(!matcher.match_create_methods(&component, &home, &bean, &mut context));

        let failures = context.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].key, keys::ENTITY_NO_EJB_CREATE);
        assert_eq!(failures[0].params[2], "ejbCreateWithBalance");
        assert_eq!(failures[0].params[3], "(java.lang.String, int)");
        assert_eq!(failures[1].key, keys::ENTITY_NO_EJB_POST_CREATE);
        assert_eq!(failures[1].params[1], "ejbPostCreateWithBalance");
    }

    #[test]
    fn test_stateless_session_needs_no_ejb_create() {
        let catalog = entity_catalog();
        let matcher = MethodMatcher::new(&catalog);
        let home = catalog.load_type("com.acme.AccountHome").unwrap();
        let bean = catalog.load_type("com.acme.AccountBean").unwrap();
        let stateless = Component::stateless("Account", "com.acme.AccountBean");
        let stateful = Component::stateful("Account", "com.acme.AccountBean");

        let mut context = ValidationContext::new("m");
        assert!(matcher.match_create_methods(&stateless, &home, &bean, &mut context));
        assert!(context.is_empty());

        assert!(!matcher.match_create_methods(&stateful, &home, &bean, &mut context));
        assert_eq!(context.failures().len(), 1);
        assert_eq!(context.failures()[0].key, keys::SESSION_NO_EJB_CREATE);
    }

    #[test]
    fn test_unused_create_methods_are_warnings() {
        let catalog = entity_catalog();
        let matcher = MethodMatcher::new(&catalog);
        let home = catalog.load_type("com.acme.AccountHome").unwrap();
        let bean = catalog.load_type("com.acme.AccountBean").unwrap();
        let component = Component::entity("Account", "com.acme.AccountBean");
        let mut context = ValidationContext::new("m");

        matcher.check_unused_create_methods(&component, &[home], &bean, &mut context);

        assert!(!context.has_failures());
        let unused: Vec<_> = context.warnings().iter().map(|r| r.params[1].as_str()).collect();
        assert_eq!(unused, vec!["ejbCreateWithBalance", "ejbCreateLegacy"]);
        assert!(context
            .warnings()
            .iter()
            .all(|r| r.key == keys::UNUSED_EJB_CREATE));
    }
}
