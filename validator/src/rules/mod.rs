//! Validation rules and the targets they visit
//!
//! A rule sees the deployment at three granularities: the whole unit, one
//! module, and the component set of one module. Each rule matches on the
//! [`Target`] variants it cares about and returns `Ok(())` for the rest.

use crate::config::ValidationConfig;
use crate::dependency_graph::ResolverError;
use crate::model::{Component, DeploymentUnit, Module, ModuleKind};
use crate::types::TypeLookup;
use diagnostics::ValidationContext;
use thiserror::Error;

pub mod check_callbacks;
pub mod check_class_loading;
pub mod check_classes;
pub mod check_depends_on;
pub mod check_injection_targets;
pub mod check_methods;
pub mod check_unused_interceptors;

pub use check_callbacks::CheckCallbacks;
pub use check_class_loading::CheckClassLoading;
pub use check_classes::CheckClasses;
pub use check_depends_on::CheckDependsOn;
pub use check_injection_targets::CheckInjectionTargets;
pub use check_methods::CheckMethods;
pub use check_unused_interceptors::CheckUnusedInterceptors;

#[derive(Debug, Error)]
pub enum RuleError {
    /// A bug in the rule itself. The dispatcher drops whatever the rule
    /// recorded for the target and moves on.
    #[error("internal rule error: {0}")]
    Internal(String),

    /// The environment cannot be validated at all; the pass is aborted
    #[error("environment error: {0}")]
    Environment(String),
}

impl From<ResolverError> for RuleError {
    fn from(err: ResolverError) -> Self {
        RuleError::Internal(err.to_string())
    }
}

/// The components of one module, with what a component-level rule needs
/// to check them
pub struct ComponentSet<'a> {
    pub module_id: &'a str,
    pub module_kind: ModuleKind,
    pub types: &'a dyn TypeLookup,
    pub components: &'a mut Vec<Component>,
    pub context: &'a mut ValidationContext,
}

impl<'a> ComponentSet<'a> {
    pub fn of(module: &'a mut Module) -> Self {
        Self {
            module_id: &module.id,
            module_kind: module.kind,
            types: module.class_loader.types.as_ref(),
            components: &mut module.components,
            context: &mut module.context,
        }
    }
}

pub enum Target<'a> {
    Application(&'a mut DeploymentUnit),
    Module(&'a mut Module),
    Components(ComponentSet<'a>),
}

impl Target<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Application(_) => "application",
            Target::Module(_) => "module",
            Target::Components(_) => "components",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Target::Application(unit) => &unit.id,
            Target::Module(module) => &module.id,
            Target::Components(set) => set.module_id,
        }
    }
}

pub trait ValidationRule {
    /// Name used in logs and in `[rules] disabled`
    fn name(&self) -> &'static str;

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError>;
}

/// The built-in rules in registration order
pub fn builtin_rules(config: &ValidationConfig) -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(CheckClasses),
        Box::new(CheckMethods),
        Box::new(CheckCallbacks),
        Box::new(CheckDependsOn),
        Box::new(CheckClassLoading::new(config.classloading.clone())),
        Box::new(CheckInjectionTargets),
        Box::new(CheckUnusedInterceptors),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rule_order() {
        let names: Vec<_> = builtin_rules(&ValidationConfig::default())
            .iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "CheckClasses",
                "CheckMethods",
                "CheckCallbacks",
                "CheckDependsOn",
                "CheckClassLoading",
                "CheckInjectionTargets",
                "CheckUnusedInterceptors",
            ]
        );
    }

    #[test]
    fn test_resolver_errors_are_internal() {
        let err: RuleError = ResolverError::DuplicateLink {
            module_id: "a.jar".to_string(),
            name: "Foo".to_string(),
        }
        .into();
        assert!(matches!(err, RuleError::Internal(_)));
    }
}
