use super::{RuleError, Target, ValidationRule};
use crate::method_matcher::MethodMatcher;
use crate::model::Component;
use crate::types::{TypeDescriptor, TypeLookup};
use diagnostics::ValidationContext;
use std::sync::Arc;

/// Interface methods are implemented and home create methods line up with
/// the bean's `ejbCreate` methods.
///
/// Types that cannot be loaded are skipped here; `CheckClasses` reports them.
pub struct CheckMethods;

impl ValidationRule for CheckMethods {
    fn name(&self) -> &'static str {
        "CheckMethods"
    }

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError> {
        let Target::Components(set) = target else {
            return Ok(());
        };

        let matcher = MethodMatcher::new(set.types);
        for component in set.components.iter() {
            check_component(&matcher, set.types, component, set.context);
        }
        Ok(())
    }
}

fn load_interface(lookup: &dyn TypeLookup, name: &str) -> Option<Arc<TypeDescriptor>> {
    lookup.load_type(name).ok().filter(|ty| ty.is_interface())
}

fn check_component(
    matcher: &MethodMatcher<'_>,
    lookup: &dyn TypeLookup,
    component: &Component,
    context: &mut ValidationContext,
) {
    let Ok(bean) = lookup.load_type(&component.implementation_class) else {
        return;
    };

    let interfaces = component
        .remote
        .iter()
        .chain(component.local.iter())
        .chain(component.business_local.iter())
        .chain(component.business_remote.iter());
    for name in interfaces {
        if let Some(interface) = load_interface(lookup, name) {
            matcher.check_business_interface(component, &interface, &bean, context);
        }
    }

    let homes: Vec<Arc<TypeDescriptor>> = component
        .home_interfaces()
        .filter_map(|(home, _, _)| load_interface(lookup, home))
        .collect();
    for home in &homes {
        matcher.match_create_methods(component, home, &bean, context);
    }
    if !homes.is_empty() {
        matcher.check_unused_create_methods(component, &homes, &bean, context);
    }
}
