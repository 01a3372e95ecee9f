use super::{RuleError, Target, ValidationRule};
use crate::conformance::ConformanceChecker;
use crate::messages::keys;
use crate::model::Component;
use crate::types::well_known;

/// Implementation classes exist and declared interfaces have the right shape
pub struct CheckClasses;

impl ValidationRule for CheckClasses {
    fn name(&self) -> &'static str {
        "CheckClasses"
    }

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError> {
        let Target::Components(set) = target else {
            return Ok(());
        };

        let mut checker = ConformanceChecker::new(set.types, set.context);
        for component in set.components.iter() {
            check_component(&mut checker, component);
        }
        Ok(())
    }
}

fn check_component(checker: &mut ConformanceChecker<'_>, component: &Component) {
    let name = component.name.as_str();

    checker.require_class(name, &component.implementation_class, "ejb-class");

    let contracts = [
        (&component.home, well_known::EJB_HOME, "home"),
        (&component.remote, well_known::EJB_OBJECT, "remote"),
        (&component.local_home, well_known::EJB_LOCAL_HOME, "local-home"),
        (&component.local, well_known::EJB_LOCAL_OBJECT, "local"),
    ];
    for (class, expected, role) in contracts {
        if let Some(class) = class {
            checker.require_assignable(name, class, expected, role);
        }
    }

    for interface in &component.business_local {
        checker.require_interface(
            name,
            interface,
            "business-local",
            keys::BUSINESS_LOCAL_NOT_INTERFACE,
        );
    }
    for interface in &component.business_remote {
        checker.require_interface(
            name,
            interface,
            "business-remote",
            keys::BUSINESS_REMOTE_NOT_INTERFACE,
        );
    }

    for interface in component
        .business_local
        .iter()
        .filter(|i| component.business_remote.contains(i))
    {
        checker
            .context()
            .fail(name, keys::LOCAL_REMOTE_CONFLICT, &[interface]);
    }

    if component.kind.is_entity() && !component.has_home() {
        checker.context().fail(
            name,
            keys::NO_INTERFACE_DECLARED_ENTITY,
            &[&component.implementation_class],
        );
    }
}
