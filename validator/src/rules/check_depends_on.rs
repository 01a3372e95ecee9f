use super::{RuleError, Target, ValidationRule};
use crate::dependency_graph::DependsOnResolver;
use crate::messages::keys;
use crate::model::DeploymentUnit;
use diagnostics::ValidationContext;

/// Singleton `depends_on` names resolve, and form no circuit
pub struct CheckDependsOn;

/// Context of the module `module_id`, or the unit's own context
fn module_context<'u>(unit: &'u mut DeploymentUnit, module_id: &str) -> &'u mut ValidationContext {
    match unit.modules.iter_mut().find(|m| m.id == module_id) {
        Some(module) => &mut module.context,
        None => &mut unit.context,
    }
}

impl ValidationRule for CheckDependsOn {
    fn name(&self) -> &'static str {
        "CheckDependsOn"
    }

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError> {
        let Target::Application(unit) = target else {
            return Ok(());
        };

        let resolution = DependsOnResolver::resolve(unit)?;

        for link in &resolution.unresolved {
            module_context(unit, &link.from.module_id).fail(
                &link.from.name,
                keys::DEPENDS_ON_NO_SUCH_EJB,
                &[&link.name],
            );
        }

        for circuit in &resolution.circuits {
            let first = circuit.first();
            module_context(unit, &first.module_id).fail(
                &first.name,
                keys::DEPENDS_ON_CIRCUIT,
                &[&circuit.chain(), &first.name],
            );
        }

        Ok(())
    }
}
