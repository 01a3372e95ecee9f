//! Diagnostics library for deployment validation
//!
//! This library provides the diagnostic sink used by the validation rules:
//! - Three severity levels (Failure, Error, Warning)
//! - Keyed, parameterized diagnostic records
//! - Per-module validation contexts and a deployment-wide report
//! - Template based rendering through an explicitly passed catalog
//! - Plain and colored terminal output, JSON output

use serde::Serialize;
use std::fmt;

pub mod catalog;

pub use catalog::MessageCatalog;

/// Severity level for diagnostics
///
/// Failures and errors both block deployment; errors are a distinct category
/// the assembler may treat specially. Warnings never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Failure,
    Error,
    Warning,
}

impl Severity {
    pub fn is_blocking(self) -> bool {
        !matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Failure => f.pad("FAIL"),
            Severity::Error => f.pad("ERROR"),
            Severity::Warning => f.pad("WARN"),
        }
    }
}

/// A single validation finding.
///
/// Parameters are stringified when the record is created; the text of the
/// message only exists once the record is rendered against a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    pub component: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl DiagnosticRecord {
    pub fn new(
        severity: Severity,
        component: impl Into<String>,
        key: impl Into<String>,
        params: &[&dyn fmt::Display],
    ) -> Self {
        Self {
            severity,
            component: component.into(),
            key: key.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Render the record's message with the given catalog
    pub fn message(&self, catalog: &MessageCatalog) -> String {
        catalog.render(&self.key, &self.params)
    }
}

/// Position in a context's three lists, taken before a rule runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    failures: usize,
    errors: usize,
    warnings: usize,
}

/// Diagnostics collected for one module (or for the deployment unit itself)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationContext {
    pub module_id: String,
    failures: Vec<DiagnosticRecord>,
    errors: Vec<DiagnosticRecord>,
    warnings: Vec<DiagnosticRecord>,
}

impl ValidationContext {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            ..Self::default()
        }
    }

    pub fn fail(
        &mut self,
        component: impl Into<String>,
        key: impl Into<String>,
        params: &[&dyn fmt::Display],
    ) {
        self.push(DiagnosticRecord::new(Severity::Failure, component, key, params));
    }

    pub fn error(
        &mut self,
        component: impl Into<String>,
        key: impl Into<String>,
        params: &[&dyn fmt::Display],
    ) {
        self.push(DiagnosticRecord::new(Severity::Error, component, key, params));
    }

    pub fn warn(
        &mut self,
        component: impl Into<String>,
        key: impl Into<String>,
        params: &[&dyn fmt::Display],
    ) {
        self.push(DiagnosticRecord::new(Severity::Warning, component, key, params));
    }

    pub fn push(&mut self, record: DiagnosticRecord) {
        match record.severity {
            Severity::Failure => self.failures.push(record),
            Severity::Error => self.errors.push(record),
            Severity::Warning => self.warnings.push(record),
        }
    }

    pub fn failures(&self) -> &[DiagnosticRecord] {
        &self.failures
    }

    pub fn errors(&self) -> &[DiagnosticRecord] {
        &self.errors
    }

    pub fn warnings(&self) -> &[DiagnosticRecord] {
        &self.warnings
    }

    /// All records: failures, then errors, then warnings
    pub fn records(&self) -> impl Iterator<Item = &DiagnosticRecord> {
        self.failures
            .iter()
            .chain(self.errors.iter())
            .chain(self.warnings.iter())
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// True when anything in this context must stop the deployment
    pub fn is_blocking(&self) -> bool {
        self.has_failures() || self.has_errors()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.failures.len() + self.errors.len() + self.warnings.len()
    }

    /// Append every record of `other`, keeping the per-severity order.
    /// Repeated findings are kept as they are.
    pub fn absorb(&mut self, other: &ValidationContext) {
        self.failures.extend(other.failures.iter().cloned());
        self.errors.extend(other.errors.iter().cloned());
        self.warnings.extend(other.warnings.iter().cloned());
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            failures: self.failures.len(),
            errors: self.errors.len(),
            warnings: self.warnings.len(),
        }
    }

    /// Drop everything recorded after `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.failures.truncate(checkpoint.failures);
        self.errors.truncate(checkpoint.errors);
        self.warnings.truncate(checkpoint.warnings);
    }
}

/// Aggregated diagnostics of a whole deployment unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub unit_id: String,
    pub contexts: Vec<ValidationContext>,
}

impl Report {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            contexts: Vec::new(),
        }
    }

    pub fn push(&mut self, context: ValidationContext) {
        self.contexts.push(context);
    }

    pub fn context(&self, module_id: &str) -> Option<&ValidationContext> {
        self.contexts.iter().find(|c| c.module_id == module_id)
    }

    /// Concatenation of every context, in report order
    pub fn merged(&self) -> ValidationContext {
        let mut merged = ValidationContext::new(self.unit_id.clone());
        for context in &self.contexts {
            merged.absorb(context);
        }
        merged
    }

    pub fn failure_count(&self) -> usize {
        self.contexts.iter().map(|c| c.failures().len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.contexts.iter().map(|c| c.errors().len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.contexts.iter().map(|c| c.warnings().len()).sum()
    }

    pub fn is_blocking(&self) -> bool {
        self.contexts.iter().any(|c| c.is_blocking())
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.iter().all(|c| c.is_empty())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Formatter for displaying diagnostics
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    pub fn format_report(&self, report: &Report, catalog: &MessageCatalog) -> String {
        let mut output = String::new();

        for context in &report.contexts {
            output.push_str(&self.format_context(context, catalog));
        }

        output.push_str(&format!(
            "{} failure(s), {} error(s), {} warning(s) in {}\n",
            report.failure_count(),
            report.error_count(),
            report.warning_count(),
            report.unit_id
        ));

        output
    }

    pub fn format_context(&self, context: &ValidationContext, catalog: &MessageCatalog) -> String {
        let mut output = String::new();

        for record in context.records() {
            output.push_str(&self.format_record(&context.module_id, record, catalog));
            output.push('\n');
        }

        output
    }

    pub fn format_record(
        &self,
        module_id: &str,
        record: &DiagnosticRecord,
        catalog: &MessageCatalog,
    ) -> String {
        let message = record.message(catalog);

        if self.use_colors {
            let color = match record.severity {
                Severity::Failure => "\x1b[31m",
                Severity::Error => "\x1b[35m",
                Severity::Warning => "\x1b[33m",
            };
            format!(
                "{}{:<5}\x1b[0m ... \x1b[96m{}\x1b[0m {}: \x1b[1;97m{}\x1b[0m",
                color, record.severity, module_id, record.component, message
            )
        } else {
            format!(
                "{:<5} ... {} {}: {}",
                record.severity, module_id, record.component, message
            )
        }
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_segments_by_severity() {
        let mut context = ValidationContext::new("orders.jar");
        context.fail("OrderBean", "missing.class", &[&"com.acme.Order"]);
        context.warn("OrderBean", "interceptor.unused", &[&"com.acme.Audit"]);
        context.error("OrderBean", "restricted.resource", &[]);
        context.fail("OrderBean", "missing.class", &[&"com.acme.Order"]);

        assert_eq!(context.failures().len(), 2);
        assert_eq!(context.errors().len(), 1);
        assert_eq!(context.warnings().len(), 1);
        assert!(context.is_blocking());

        let keys: Vec<_> = context.records().map(|r| r.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "missing.class",
                "missing.class",
                "restricted.resource",
                "interceptor.unused"
            ]
        );
    }

    #[test]
    fn test_params_are_stringified() {
        let mut context = ValidationContext::new("m");
        context.fail("Bean", "no.business.method.args", &[&"doIt", &3usize]);

        let record = &context.failures()[0];
        assert_eq!(record.params, vec!["doIt".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_warnings_do_not_block() {
        let mut context = ValidationContext::new("m");
        context.warn("Bean", "classloading.same", &[&"a.jar", &"b.jar"]);
        assert!(!context.is_blocking());
        assert!(context.has_warnings());
    }

    #[test]
    fn test_rollback_to_checkpoint() {
        let mut context = ValidationContext::new("m");
        context.fail("A", "k1", &[]);
        let checkpoint = context.checkpoint();
        context.fail("B", "k2", &[]);
        context.warn("B", "k3", &[]);

        context.rollback(checkpoint);
        assert_eq!(context.len(), 1);
        assert_eq!(context.failures()[0].component, "A");
    }

    #[test]
    fn test_report_merges_in_order_without_dedup() {
        let mut first = ValidationContext::new("a.jar");
        first.fail("X", "dependsOn.noSuchEjb", &[&"Y"]);
        let mut second = ValidationContext::new("b.jar");
        second.fail("X", "dependsOn.noSuchEjb", &[&"Y"]);
        second.warn("Z", "interceptor.unused", &[&"I"]);

        let mut report = Report::new("app");
        report.push(first);
        report.push(second);

        let merged = report.merged();
        assert_eq!(merged.failures().len(), 2);
        assert_eq!(merged.warnings().len(), 1);
        assert_eq!(report.failure_count(), 2);
        assert!(report.is_blocking());
        assert!(report.context("b.jar").is_some());
    }

    #[test]
    fn test_format_record_plain() {
        let mut catalog = MessageCatalog::new();
        catalog.insert("dependsOn.noSuchEjb", "No such bean: {0}");

        let record =
            DiagnosticRecord::new(Severity::Failure, "Foo", "dependsOn.noSuchEjb", &[&"Bar"]);
        let line = ErrorFormatter::new().format_record("app.jar", &record, &catalog);
        assert_eq!(line, "FAIL  ... app.jar Foo: No such bean: Bar");
    }

    #[test]
    fn test_severity_label_width() {
        let warning = DiagnosticRecord::new(Severity::Warning, "Foo", "k", &[]);
        let error = DiagnosticRecord::new(Severity::Error, "Foo", "k", &[]);
        let catalog = MessageCatalog::new();
        let formatter = ErrorFormatter::new();

        assert_eq!(format!("[{:<5}]", Severity::Warning), "[WARN ]");
        assert_eq!(formatter.format_record("m", &warning, &catalog), "WARN  ... m Foo: k");
        assert_eq!(formatter.format_record("m", &error, &catalog), "ERROR ... m Foo: k");
    }

    #[test]
    fn test_report_json() {
        let mut context = ValidationContext::new("m");
        context.warn("Bean", "interceptor.unused", &[&"I"]);
        let mut report = Report::new("app");
        report.push(context);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"interceptor.unused\""));
        assert!(json.contains("\"warning\""));
    }
}
