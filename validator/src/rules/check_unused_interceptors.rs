use super::{RuleError, Target, ValidationRule};
use crate::messages::keys;
use std::collections::HashSet;

/// Interceptor classes declared in a module but bound to nothing
pub struct CheckUnusedInterceptors;

impl ValidationRule for CheckUnusedInterceptors {
    fn name(&self) -> &'static str {
        "CheckUnusedInterceptors"
    }

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError> {
        let Target::Module(module) = target else {
            return Ok(());
        };

        let bound: HashSet<&str> = module
            .components
            .iter()
            .flat_map(|c| c.interceptors.iter())
            .chain(module.default_interceptors.iter())
            .map(String::as_str)
            .collect();

        let unused: Vec<String> = module
            .interceptors
            .iter()
            .filter(|i| !bound.contains(i.class_name.as_str()))
            .map(|i| i.class_name.clone())
            .collect();

        for class_name in &unused {
            module
                .context
                .warn(class_name, keys::INTERCEPTOR_UNUSED, &[class_name]);
        }
        Ok(())
    }
}
