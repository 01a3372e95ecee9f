//! Runs every registered rule over a deployment unit
//!
//! Each rule visits the unit itself, then every module, then every module's
//! component set. A rule that fails internally (an `Internal` error or a
//! panic) loses everything it recorded during the pass, is not run on the
//! remaining targets, and the other rules carry on.

use crate::config::{ConfigError, ValidationConfig};
use crate::model::DeploymentUnit;
use crate::rules::{builtin_rules, ComponentSet, RuleError, Target, ValidationRule};
use diagnostics::{Checkpoint, ErrorFormatter, Report};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("rule {rule} cannot validate {target}: {message}")]
    Environment {
        rule: &'static str,
        target: String,
        message: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// How a single visit ended, short of an environment error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Done,
    Crashed,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Application,
    Module(usize),
    Components(usize),
}

impl Scope {
    fn target<'u>(self, unit: &'u mut DeploymentUnit) -> Target<'u> {
        match self {
            Scope::Application => Target::Application(unit),
            Scope::Module(i) => Target::Module(&mut unit.modules[i]),
            Scope::Components(i) => Target::Components(ComponentSet::of(&mut unit.modules[i])),
        }
    }

    fn describe(self, unit: &DeploymentUnit) -> String {
        match self {
            Scope::Application => format!("application {}", unit.id),
            Scope::Module(i) => format!("module {}", unit.modules[i].id),
            Scope::Components(i) => format!("components of {}", unit.modules[i].id),
        }
    }
}

/// Positions of every context of a unit before a rule runs
struct Snapshot {
    unit: Checkpoint,
    modules: Vec<Checkpoint>,
}

impl Snapshot {
    fn take(unit: &DeploymentUnit) -> Self {
        Self {
            unit: unit.context.checkpoint(),
            modules: unit.modules.iter().map(|m| m.context.checkpoint()).collect(),
        }
    }

    fn restore(self, unit: &mut DeploymentUnit) {
        unit.context.rollback(self.unit);
        for (module, checkpoint) in unit.modules.iter_mut().zip(self.modules) {
            module.context.rollback(checkpoint);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

pub struct AppValidator {
    rules: Vec<Box<dyn ValidationRule>>,
    config: ValidationConfig,
}

impl AppValidator {
    /// Built-in rules, minus those the config disables
    pub fn new(config: ValidationConfig) -> Self {
        let mut validator = Self {
            rules: Vec::new(),
            config,
        };
        for rule in builtin_rules(&validator.config) {
            validator.register(rule);
        }
        validator
    }

    /// Validator configured from a TOML file
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        Ok(Self::new(ValidationConfig::load(config_path)?))
    }

    /// Append a rule after the built-in ones
    pub fn with_rule<R: ValidationRule + 'static>(mut self, rule: R) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn add_rule<R: ValidationRule + 'static>(&mut self, rule: R) {
        self.register(Box::new(rule));
    }

    fn register(&mut self, rule: Box<dyn ValidationRule>) {
        if self.config.is_rule_enabled(rule.name()) {
            self.rules.push(rule);
        } else {
            log::debug!("rule {} disabled by configuration", rule.name());
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Report formatter honouring `[report] colors`
    pub fn formatter(&self) -> ErrorFormatter {
        if self.config.report.colors {
            ErrorFormatter::with_colors()
        } else {
            ErrorFormatter::new()
        }
    }

    /// Validate `unit` from scratch and return everything the rules found.
    ///
    /// Findings of a previous run are discarded first, so validating the same
    /// unit twice yields the same report.
    pub fn validate(&self, unit: &mut DeploymentUnit) -> Result<Report, ValidationError> {
        log::info!(
            "validating {} ({} modules, {} rules)",
            unit.id,
            unit.modules.len(),
            self.rules.len()
        );
        unit.reset_contexts();

        for rule in &self.rules {
            let snapshot = Snapshot::take(unit);
            if self.run_rule(rule.as_ref(), unit)? == Visit::Crashed {
                snapshot.restore(unit);
            }
        }

        let report = unit.report();
        log::info!(
            "validated {}: {} failures, {} errors, {} warnings",
            unit.id,
            report.failure_count(),
            report.error_count(),
            report.warning_count()
        );
        Ok(report)
    }

    /// Every visit of `rule`, stopping at the first crash
    fn run_rule(
        &self,
        rule: &dyn ValidationRule,
        unit: &mut DeploymentUnit,
    ) -> Result<Visit, ValidationError> {
        let scopes = std::iter::once(Scope::Application).chain(
            (0..unit.modules.len()).flat_map(|i| [Scope::Module(i), Scope::Components(i)]),
        );
        for scope in scopes {
            if self.visit(rule, unit, scope)? == Visit::Crashed {
                log::error!("findings of rule {} on {} dropped", rule.name(), unit.id);
                return Ok(Visit::Crashed);
            }
        }
        Ok(Visit::Done)
    }

    fn visit(
        &self,
        rule: &dyn ValidationRule,
        unit: &mut DeploymentUnit,
        scope: Scope,
    ) -> Result<Visit, ValidationError> {
        log::debug!("{} -> {}", rule.name(), scope.describe(unit));

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut target = scope.target(&mut *unit);
            rule.visit(&mut target)
        }));

        match outcome {
            Ok(Ok(())) => Ok(Visit::Done),
            Ok(Err(RuleError::Environment(message))) => Err(ValidationError::Environment {
                rule: rule.name(),
                target: scope.describe(unit),
                message,
            }),
            Ok(Err(RuleError::Internal(message))) => {
                log::error!(
                    "rule {} failed on {}: {}",
                    rule.name(),
                    scope.describe(unit),
                    message
                );
                Ok(Visit::Crashed)
            }
            Err(payload) => {
                log::error!(
                    "rule {} panicked on {}: {}",
                    rule.name(),
                    scope.describe(unit),
                    panic_message(payload.as_ref())
                );
                Ok(Visit::Crashed)
            }
        }
    }
}

impl Default for AppValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
