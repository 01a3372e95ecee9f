//! In-memory deployment model handed over by the descriptor stage
//!
//! The model is read-only for rules except for the few normalizations they
//! are allowed to make (see `rules::check_injection_targets`).

use crate::classloading::ClassPath;
use crate::types::{TypeCatalog, TypeLookup};
use diagnostics::{Report, ValidationContext};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// The application being validated
#[derive(Debug)]
pub struct DeploymentUnit {
    pub id: String,
    pub modules: Vec<Module>,
    /// Findings that belong to the unit rather than to one module
    pub context: ValidationContext,
}

impl DeploymentUnit {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            context: ValidationContext::new(id.clone()),
            id,
            modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Unit context first, then every module context in declaration order
    pub fn report(&self) -> Report {
        let mut report = Report::new(self.id.clone());
        report.push(self.context.clone());
        for module in &self.modules {
            report.push(module.context.clone());
        }
        report
    }

    /// Start a fresh pass: every context is emptied
    pub fn reset_contexts(&mut self) {
        self.context = ValidationContext::new(self.id.clone());
        for module in &mut self.modules {
            module.context = ValidationContext::new(module.id.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Ejb,
    Client,
    Web,
    Connector,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Ejb => write!(f, "ejb"),
            ModuleKind::Client => write!(f, "client"),
            ModuleKind::Web => write!(f, "web"),
            ModuleKind::Connector => write!(f, "connector"),
        }
    }
}

/// Type lookup plus the archives backing it
#[derive(Clone)]
pub struct ModuleClassLoader {
    pub types: Arc<dyn TypeLookup>,
    pub class_path: ClassPath,
}

impl ModuleClassLoader {
    pub fn new(types: Arc<dyn TypeLookup>, class_path: ClassPath) -> Self {
        Self { types, class_path }
    }
}

impl fmt::Debug for ModuleClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleClassLoader")
            .field("class_path", &self.class_path)
            .finish_non_exhaustive()
    }
}

impl Default for ModuleClassLoader {
    fn default() -> Self {
        Self::new(Arc::new(TypeCatalog::platform()), ClassPath::default())
    }
}

#[derive(Debug)]
pub struct Module {
    pub id: String,
    pub kind: ModuleKind,
    pub location: PathBuf,
    pub class_loader: ModuleClassLoader,
    pub components: Vec<Component>,
    pub interceptors: Vec<Interceptor>,
    /// Interceptor classes bound to every component of the module
    pub default_interceptors: Vec<String>,
    pub context: ValidationContext,
}

impl Module {
    pub fn new(id: impl Into<String>, kind: ModuleKind, class_loader: ModuleClassLoader) -> Self {
        let id = id.into();
        Self {
            location: PathBuf::from(&id),
            context: ValidationContext::new(id.clone()),
            id,
            kind,
            class_loader,
            components: Vec::new(),
            interceptors: Vec::new(),
            default_interceptors: Vec::new(),
        }
    }

    pub fn at(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_default_interceptor(mut self, class_name: impl Into<String>) -> Self {
        self.default_interceptors.push(class_name.into());
        self
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn types(&self) -> &dyn TypeLookup {
        self.class_loader.types.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    Stateless,
    Stateful,
    Singleton,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Session(SessionKind),
    MessageDriven,
    Entity { primary_key_class: Option<String> },
    Managed,
}

impl ComponentKind {
    pub fn is_session(&self) -> bool {
        matches!(self, ComponentKind::Session(_))
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, ComponentKind::Session(SessionKind::Singleton))
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self, ComponentKind::Session(SessionKind::Stateful))
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, ComponentKind::Entity { .. })
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Session(SessionKind::Stateless) => write!(f, "Stateless"),
            ComponentKind::Session(SessionKind::Stateful) => write!(f, "Stateful"),
            ComponentKind::Session(SessionKind::Singleton) => write!(f, "Singleton"),
            ComponentKind::MessageDriven => write!(f, "MessageDriven"),
            ComponentKind::Entity { .. } => write!(f, "Entity"),
            ComponentKind::Managed => write!(f, "Managed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    PostConstruct,
    PreDestroy,
    PostActivate,
    PrePassivate,
    AfterBegin,
    BeforeCompletion,
    AfterCompletion,
}

impl CallbackKind {
    /// Callbacks only honoured on stateful components
    pub fn is_stateful_only(self) -> bool {
        !matches!(self, CallbackKind::PostConstruct | CallbackKind::PreDestroy)
    }

    pub fn is_synchronization(self) -> bool {
        matches!(
            self,
            CallbackKind::AfterBegin | CallbackKind::BeforeCompletion | CallbackKind::AfterCompletion
        )
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::PostConstruct => "PostConstruct",
            CallbackKind::PreDestroy => "PreDestroy",
            CallbackKind::PostActivate => "PostActivate",
            CallbackKind::PrePassivate => "PrePassivate",
            CallbackKind::AfterBegin => "AfterBegin",
            CallbackKind::BeforeCompletion => "BeforeCompletion",
            CallbackKind::AfterCompletion => "AfterCompletion",
        };
        write!(f, "{}", name)
    }
}

/// A lifecycle callback declaration. `class_name` is `None` when the method
/// lives on the component or interceptor class itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleCallback {
    pub kind: CallbackKind,
    pub class_name: Option<String>,
    pub method_name: String,
}

impl LifecycleCallback {
    pub fn new(kind: CallbackKind, method_name: impl Into<String>) -> Self {
        Self {
            kind,
            class_name: None,
            method_name: method_name.into(),
        }
    }

    pub fn declared_on(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

/// An `AroundInvoke` or `AroundTimeout` method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AroundMethod {
    pub class_name: Option<String>,
    pub method_name: String,
}

impl AroundMethod {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            class_name: None,
            method_name: method_name.into(),
        }
    }

    pub fn declared_on(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionTarget {
    pub class_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub reference_name: String,
    pub targets: Vec<InjectionTarget>,
}

impl Injection {
    pub fn new(reference_name: impl Into<String>) -> Self {
        Self {
            reference_name: reference_name.into(),
            targets: Vec::new(),
        }
    }

    pub fn target(mut self, class_name: impl Into<String>, name: impl Into<String>) -> Self {
        self.targets.push(InjectionTarget {
            class_name: class_name.into(),
            name: name.into(),
        });
        self
    }
}

/// A bean: a named unit of business logic within a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub kind: ComponentKind,
    pub implementation_class: String,
    pub home: Option<String>,
    pub remote: Option<String>,
    pub local_home: Option<String>,
    pub local: Option<String>,
    pub business_local: Vec<String>,
    pub business_remote: Vec<String>,
    pub callbacks: Vec<LifecycleCallback>,
    pub around_invoke: Vec<AroundMethod>,
    pub around_timeout: Vec<AroundMethod>,
    pub interceptors: Vec<String>,
    pub depends_on: Vec<String>,
    pub injections: Vec<Injection>,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        kind: ComponentKind,
        implementation_class: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            implementation_class: implementation_class.into(),
            home: None,
            remote: None,
            local_home: None,
            local: None,
            business_local: Vec::new(),
            business_remote: Vec::new(),
            callbacks: Vec::new(),
            around_invoke: Vec::new(),
            around_timeout: Vec::new(),
            interceptors: Vec::new(),
            depends_on: Vec::new(),
            injections: Vec::new(),
        }
    }

    pub fn singleton(name: impl Into<String>, implementation_class: impl Into<String>) -> Self {
        Self::new(
            name,
            ComponentKind::Session(SessionKind::Singleton),
            implementation_class,
        )
    }

    pub fn stateless(name: impl Into<String>, implementation_class: impl Into<String>) -> Self {
        Self::new(
            name,
            ComponentKind::Session(SessionKind::Stateless),
            implementation_class,
        )
    }

    pub fn stateful(name: impl Into<String>, implementation_class: impl Into<String>) -> Self {
        Self::new(
            name,
            ComponentKind::Session(SessionKind::Stateful),
            implementation_class,
        )
    }

    pub fn entity(name: impl Into<String>, implementation_class: impl Into<String>) -> Self {
        Self::new(
            name,
            ComponentKind::Entity {
                primary_key_class: None,
            },
            implementation_class,
        )
    }

    pub fn with_home(mut self, home: impl Into<String>, remote: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self.remote = Some(remote.into());
        self
    }

    pub fn with_local_home(mut self, local_home: impl Into<String>, local: impl Into<String>) -> Self {
        self.local_home = Some(local_home.into());
        self.local = Some(local.into());
        self
    }

    pub fn with_business_local(mut self, interface: impl Into<String>) -> Self {
        self.business_local.push(interface.into());
        self
    }

    pub fn with_business_remote(mut self, interface: impl Into<String>) -> Self {
        self.business_remote.push(interface.into());
        self
    }

    pub fn with_callback(mut self, callback: LifecycleCallback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn with_around_invoke(mut self, method: AroundMethod) -> Self {
        self.around_invoke.push(method);
        self
    }

    pub fn with_around_timeout(mut self, method: AroundMethod) -> Self {
        self.around_timeout.push(method);
        self
    }

    pub fn with_interceptor(mut self, class_name: impl Into<String>) -> Self {
        self.interceptors.push(class_name.into());
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn with_injection(mut self, injection: Injection) -> Self {
        self.injections.push(injection);
        self
    }

    /// Home/component interface pairs: `(home, component, remote?)`
    pub fn home_interfaces(&self) -> impl Iterator<Item = (&str, Option<&str>, bool)> {
        let remote = self
            .home
            .as_deref()
            .map(|home| (home, self.remote.as_deref(), true));
        let local = self
            .local_home
            .as_deref()
            .map(|home| (home, self.local.as_deref(), false));
        remote.into_iter().chain(local)
    }

    pub fn has_home(&self) -> bool {
        self.home.is_some() || self.local_home.is_some()
    }
}

/// A module-level interceptor class declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interceptor {
    pub class_name: String,
    pub callbacks: Vec<LifecycleCallback>,
    pub around_invoke: Vec<AroundMethod>,
    pub around_timeout: Vec<AroundMethod>,
}

impl Interceptor {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            callbacks: Vec::new(),
            around_invoke: Vec::new(),
            around_timeout: Vec::new(),
        }
    }

    pub fn with_callback(mut self, callback: LifecycleCallback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn with_around_invoke(mut self, method: AroundMethod) -> Self {
        self.around_invoke.push(method);
        self
    }

    pub fn with_around_timeout(mut self, method: AroundMethod) -> Self {
        self.around_timeout.push(method);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_orders_unit_context_first() {
        let mut unit = DeploymentUnit::new("app")
            .with_module(Module::new("a.jar", ModuleKind::Ejb, ModuleClassLoader::default()))
            .with_module(Module::new("b.jar", ModuleKind::Client, ModuleClassLoader::default()));
        unit.modules[1].context.fail("X", "k", &[]);
        unit.context.warn("app", "w", &[]);

        let report = unit.report();
        let ids: Vec<_> = report.contexts.iter().map(|c| c.module_id.as_str()).collect();
        assert_eq!(ids, vec!["app", "a.jar", "b.jar"]);
        assert!(report.is_blocking());

        unit.reset_contexts();
        assert!(unit.report().is_empty());
    }

    #[test]
    fn test_home_interfaces() {
        let component = Component::stateless("Cart", "com.acme.CartBean")
            .with_home("com.acme.CartHome", "com.acme.CartRemote")
            .with_local_home("com.acme.CartLocalHome", "com.acme.CartLocal");

        let homes: Vec<_> = component.home_interfaces().collect();
        assert_eq!(
            homes,
            vec![
                ("com.acme.CartHome", Some("com.acme.CartRemote"), true),
                ("com.acme.CartLocalHome", Some("com.acme.CartLocal"), false),
            ]
        );
    }

    #[test]
    fn test_callback_kinds() {
        assert!(!CallbackKind::PostConstruct.is_stateful_only());
        assert!(CallbackKind::PrePassivate.is_stateful_only());
        assert!(CallbackKind::AfterCompletion.is_synchronization());
        assert_eq!(CallbackKind::AfterBegin.to_string(), "AfterBegin");
    }
}
