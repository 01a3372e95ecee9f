use super::{RuleError, Target, ValidationRule};
use crate::classloading::{intersection, ArchiveIndex, ArchiveScanner, FsArchiveScanner, OverlapItem, OverlapKind};
use crate::config::ClassLoadingConfig;
use crate::messages::keys;
use diagnostics::ValidationContext;
use std::collections::HashSet;
use std::path::PathBuf;

/// Archives that ship the same classes, within a module and across modules
pub struct CheckClassLoading {
    config: ClassLoadingConfig,
    scanner: Box<dyn ArchiveScanner>,
}

impl CheckClassLoading {
    pub fn new(config: ClassLoadingConfig) -> Self {
        Self::with_scanner(config, FsArchiveScanner)
    }

    pub fn with_scanner(config: ClassLoadingConfig, scanner: impl ArchiveScanner + 'static) -> Self {
        Self {
            config,
            scanner: Box::new(scanner),
        }
    }

    fn report(&self, module_id: &str, items: &[OverlapItem], context: &mut ValidationContext) {
        for item in items {
            let key = match item.kind {
                OverlapKind::Same => keys::CLASSLOADING_SAME,
                OverlapKind::Included => keys::CLASSLOADING_INCLUDED,
                OverlapKind::Containing => keys::CLASSLOADING_CONTAINING,
                OverlapKind::Diff => keys::CLASSLOADING_DIFF,
            };
            let classes = if self.config.verbose {
                format!(": {}", item.class_list())
            } else {
                String::new()
            };
            context.warn(
                module_id,
                key,
                &[&item.first, &item.second, &item.classes.len(), &classes],
            );
        }
    }
}

impl ValidationRule for CheckClassLoading {
    fn name(&self) -> &'static str {
        "CheckClassLoading"
    }

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError> {
        let Target::Application(unit) = target else {
            return Ok(());
        };
        if !self.config.enabled {
            return Ok(());
        }

        let mut index = ArchiveIndex::new(self.scanner.as_ref());
        let archives: Vec<Vec<PathBuf>> = unit
            .modules
            .iter()
            .map(|m| m.class_loader.class_path.exclusive_archives())
            .collect();
        let tables: Vec<_> = archives.iter().map(|a| index.table(a)).collect();

        for i in 0..unit.modules.len() {
            let mut items = intersection(&tables[i], &tables[i], true);

            if self.config.compare_modules {
                let own: HashSet<&PathBuf> = archives[i].iter().collect();
                for other in &archives[i + 1..] {
                    // an archive both modules load is one archive, not a duplicate
                    let foreign: Vec<PathBuf> = other
                        .iter()
                        .filter(|a| !own.contains(a))
                        .cloned()
                        .collect();
                    items.extend(intersection(&tables[i], &index.table(&foreign), false));
                }
            }

            items.sort_by(|a, b| {
                a.kind
                    .cmp(&b.kind)
                    .then_with(|| a.first.cmp(&b.first))
                    .then_with(|| a.second.cmp(&b.second))
            });

            let module = &mut unit.modules[i];
            log::debug!("{}: {} overlapping archive pairs", module.id, items.len());
            self.report(&module.id, &items, &mut module.context);
        }

        Ok(())
    }
}
