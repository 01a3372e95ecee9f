use super::{RuleError, Target, ValidationRule};
use crate::messages::keys;

/// Injection target names written as setters (`setFoo`) are rewritten to
/// the property name (`foo`), with a warning.
pub struct CheckInjectionTargets;

impl ValidationRule for CheckInjectionTargets {
    fn name(&self) -> &'static str {
        "CheckInjectionTargets"
    }

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError> {
        let Target::Components(set) = target else {
            return Ok(());
        };

        for component in set.components.iter_mut() {
            for injection in &mut component.injections {
                for injection_target in &mut injection.targets {
                    let Some(property) = property_name(&injection_target.name) else {
                        continue;
                    };
                    set.context.warn(
                        &component.name,
                        keys::INJECTION_TARGET_NAME_CONTAINS_SET,
                        &[
                            &injection.reference_name,
                            &injection_target.name,
                            &property,
                            &injection_target.class_name,
                        ],
                    );
                    injection_target.name = property;
                }
            }
        }
        Ok(())
    }
}

/// `setFoo` -> `foo`. `None` unless `name` is a setter name.
fn property_name(name: &str) -> Option<String> {
    let rest = name.strip_prefix("set")?;
    if !rest.chars().next()?.is_uppercase() {
        return None;
    }
    Some(decapitalize(rest))
}

/// Lowercase the first letter, unless the name starts with an acronym
/// (`URLPath` stays as is).
fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    if chars.next().map_or(false, char::is_uppercase) {
        return name.to_string();
    }
    first.to_lowercase().chain(name[first.len_utf8()..].chars()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Injection, Module, ModuleClassLoader, ModuleKind};
    use crate::rules::ComponentSet;

    #[test]
    fn test_property_name() {
        assert_eq!(property_name("setDataSource").as_deref(), Some("dataSource"));
        assert_eq!(property_name("setX").as_deref(), Some("x"));
        assert_eq!(property_name("setURL").as_deref(), Some("URL"));
        assert_eq!(property_name("settings"), None);
        assert_eq!(property_name("set"), None);
        assert_eq!(property_name("dataSource"), None);
    }

    #[test]
    fn test_setter_target_is_rewritten() {
        let mut module = Module::new("a.jar", ModuleKind::Ejb, ModuleClassLoader::default())
            .with_component(
                Component::stateless("Cart", "com.acme.CartBean").with_injection(
                    Injection::new("jdbc/cart")
                        .target("com.acme.CartBean", "setDataSource")
                        .target("com.acme.CartBean", "settings"),
                ),
            );

        CheckInjectionTargets
            .visit(&mut Target::Components(ComponentSet::of(&mut module)))
            .unwrap();

        let names: Vec<_> = module.components[0].injections[0]
            .targets
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["dataSource", "settings"]);

        let warnings = module.context.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].component, "Cart");
        assert_eq!(
            warnings[0].params,
            vec!["jdbc/cart", "setDataSource", "dataSource", "com.acme.CartBean"]
        );
    }
}
