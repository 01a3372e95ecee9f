//! Static deployment validation engine
//!
//! Checks an in-memory deployment model (modules, components, interceptors,
//! class loaders) against the component contract before anything starts:
//! - Implementation classes and interfaces exist and have the right shape
//! - Business, home and create methods are implemented
//! - Lifecycle callbacks and around methods have legal signatures
//! - Singleton `depends_on` names resolve and form no circuit
//! - No two archives on a module's class path ship the same classes
//!
//! Findings are recorded as keyed diagnostics (see the `diagnostics` crate)
//! and rendered through a message catalog only when displayed.

pub mod classloading;
pub mod config;
pub mod conformance;
pub mod dependency_graph;
pub mod dispatcher;
pub mod logging;
pub mod messages;
pub mod method_matcher;
pub mod model;
pub mod rules;
pub mod types;

pub use config::{ConfigError, ValidationConfig};
pub use dispatcher::{AppValidator, ValidationError};
pub use messages::builtin_catalog;
pub use model::{Component, ComponentKind, DeploymentUnit, Interceptor, Module, ModuleKind};
pub use rules::{RuleError, Target, ValidationRule};
pub use types::{TypeCatalog, TypeDescriptor, TypeLookup};

pub use diagnostics::{DiagnosticRecord, Report, Severity, ValidationContext};
