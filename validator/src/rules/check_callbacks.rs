//! Lifecycle callback and around-invoke method checks
//!
//! Callbacks declared on a component must exist with the expected parameters
//! (none, or `boolean` for `AfterCompletion`), return `void` and be neither
//! static nor final. Around-invoke and around-timeout methods take a single
//! `InvocationContext`, return `Object` and declare `throws Exception`.
//! Interceptor callbacks take an `InvocationContext` and return `void`.
//!
//! When a method is missing the other methods with the same name are used to
//! tell a wrong parameter list apart from a typo.

use super::{RuleError, Target, ValidationRule};
use crate::messages::keys;
use crate::method_matcher::MethodMatcher;
use crate::model::{AroundMethod, CallbackKind, Component, Interceptor, LifecycleCallback};
use crate::types::{is_assignable, well_known, TypeDescriptor, TypeLookup};
use diagnostics::ValidationContext;
use std::sync::Arc;

pub struct CheckCallbacks;

impl ValidationRule for CheckCallbacks {
    fn name(&self) -> &'static str {
        "CheckCallbacks"
    }

    fn visit(&self, target: &mut Target<'_>) -> Result<(), RuleError> {
        let Target::Module(module) = target else {
            return Ok(());
        };

        let lookup = module.class_loader.types.as_ref();
        let mut checker = CallbackChecker {
            lookup,
            matcher: MethodMatcher::new(lookup),
            context: &mut module.context,
        };

        for component in &module.components {
            checker.check_component(component);
        }
        for interceptor in &module.interceptors {
            checker.check_interceptor(interceptor);
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum AroundKind {
    Invoke,
    Timeout,
}

impl AroundKind {
    fn annotation(self) -> &'static str {
        match self {
            AroundKind::Invoke => "AroundInvoke",
            AroundKind::Timeout => "AroundTimeout",
        }
    }
}

/// `(a, b)` for a parameter type list
fn parameter_list(parameter_types: &[&str]) -> String {
    format!("({})", parameter_types.join(", "))
}

/// The only name a `SessionBean` implementor may use for `kind`, if any
fn session_bean_callback_name(kind: CallbackKind) -> Option<&'static str> {
    match kind {
        CallbackKind::PostConstruct => Some("ejbCreate"),
        CallbackKind::PreDestroy => Some("ejbRemove"),
        CallbackKind::PostActivate => Some("ejbActivate"),
        CallbackKind::PrePassivate => Some("ejbPassivate"),
        _ => None,
    }
}

struct CallbackChecker<'a> {
    lookup: &'a dyn TypeLookup,
    matcher: MethodMatcher<'a>,
    context: &'a mut ValidationContext,
}

impl CallbackChecker<'_> {
    /// The class a callback is declared on: its own class name when given,
    /// the component class otherwise. A class that cannot be loaded is
    /// reported and yields `None`.
    fn declaring_class(
        &mut self,
        default: &Arc<TypeDescriptor>,
        class_name: Option<&str>,
        annotation: &str,
        owner: &str,
    ) -> Option<Arc<TypeDescriptor>> {
        let Some(class_name) = class_name else {
            return Some(Arc::clone(default));
        };

        match self.lookup.load_type(class_name) {
            Ok(ty) => Some(ty),
            Err(_) => {
                self.context
                    .fail(owner, keys::MISSING_CLASS, &[&class_name, &annotation, &owner]);
                None
            }
        }
    }

    fn check_component(&mut self, component: &Component) {
        let Ok(bean) = self.lookup.load_type(&component.implementation_class) else {
            return;
        };

        for around in &component.around_invoke {
            self.check_around(AroundKind::Invoke, &bean, around, &component.name);
        }
        for around in &component.around_timeout {
            self.check_around(AroundKind::Timeout, &bean, around, &component.name);
        }

        let stateful = component.kind.is_stateful();
        for callback in &component.callbacks {
            if callback.kind.is_stateful_only() && !stateful {
                self.ignored(&callback.kind.to_string(), component, &callback.method_name);
                continue;
            }

            let expected: &[&str] = if callback.kind == CallbackKind::AfterCompletion {
                &[well_known::BOOLEAN]
            } else {
                &[]
            };
            self.check_callback(&bean, callback, component, expected);
        }

        if stateful {
            self.check_session_synchronization(&bean, component);
            for around in &component.around_timeout {
                self.ignored(AroundKind::Timeout.annotation(), component, &around.method_name);
            }
        }
    }

    fn ignored(&mut self, annotation: &str, component: &Component, method: &str) {
        let kind = component.kind.to_string();
        self.context.warn(
            &component.name,
            keys::IGNORED_METHOD_ANNOTATION,
            &[
                &annotation,
                &component.name,
                &component.implementation_class,
                &method,
                &kind,
            ],
        );
    }

    fn check_around(
        &mut self,
        kind: AroundKind,
        bean: &Arc<TypeDescriptor>,
        around: &AroundMethod,
        owner: &str,
    ) {
        let annotation = kind.annotation();
        let Some(declaring) =
            self.declaring_class(bean, around.class_name.as_deref(), annotation, owner)
        else {
            return;
        };
        let method_name = around.method_name.as_str();
        let class = declaring.name.as_str();

        match self
            .matcher
            .find_method(&declaring, method_name, &[well_known::INVOCATION_CONTEXT])
        {
            Some(method) => {
                if method.return_type != well_known::OBJECT {
                    self.context.fail(
                        owner,
                        keys::AROUND_INVOKE_BAD_RETURN_TYPE,
                        &[&annotation, &method_name, &method.return_type, &class],
                    );
                }
                if !method
                    .exception_types
                    .iter()
                    .any(|e| e == well_known::EXCEPTION)
                {
                    self.context.fail(
                        owner,
                        keys::AROUND_INVOKE_MUST_THROW_EXCEPTION,
                        &[&annotation, &method_name, &class],
                    );
                }
            }
            None => {
                let candidates = self.matcher.methods_named(&declaring, method_name);
                match candidates.as_slice() {
                    [] => self.context.fail(
                        owner,
                        keys::AROUND_INVOKE_MISSING,
                        &[&annotation, &method_name, &class],
                    ),
                    [candidate] => {
                        self.context.fail(
                            owner,
                            keys::AROUND_INVOKE_INVALID_ARGUMENTS,
                            &[&annotation, &method_name, &candidate.parameter_list(), &class],
                        );
                        if candidate.return_type != well_known::OBJECT {
                            self.context.fail(
                                owner,
                                keys::AROUND_INVOKE_BAD_RETURN_TYPE,
                                &[&annotation, &method_name, &candidate.return_type, &class],
                            );
                        }
                    }
                    _ => self.context.fail(
                        owner,
                        keys::AROUND_INVOKE_POSSIBLE_TYPO,
                        &[&annotation, &method_name, &candidates.len(), &class],
                    ),
                }
            }
        }
    }

    fn check_callback(
        &mut self,
        bean: &Arc<TypeDescriptor>,
        callback: &LifecycleCallback,
        component: &Component,
        expected: &[&str],
    ) {
        let owner = component.name.as_str();
        let annotation = callback.kind.to_string();
        let Some(declaring) =
            self.declaring_class(bean, callback.class_name.as_deref(), &annotation, owner)
        else {
            return;
        };
        let method_name = callback.method_name.as_str();
        let class = declaring.name.as_str();

        let Some(method) = self.matcher.find_method(&declaring, method_name, expected) else {
            let candidates = self.matcher.methods_named(&declaring, method_name);
            match candidates.as_slice() {
                [] => self.context.fail(
                    owner,
                    keys::CALLBACK_MISSING,
                    &[&annotation, &method_name, &class],
                ),
                [candidate]
                    if candidate.has_parameters(&[well_known::INVOCATION_CONTEXT]) =>
                {
                    self.context.fail(
                        owner,
                        keys::CALLBACK_INVOCATION_CONTEXT_NOT_ALLOWED,
                        &[&annotation, &method_name],
                    )
                }
                [candidate] => self.context.fail(
                    owner,
                    keys::CALLBACK_INVALID_ARGUMENTS,
                    &[
                        &annotation,
                        &method_name,
                        &candidate.parameter_list(),
                        &class,
                        &parameter_list(expected),
                    ],
                ),
                _ => self.context.fail(
                    owner,
                    keys::CALLBACK_POSSIBLE_TYPO,
                    &[
                        &annotation,
                        &method_name,
                        &candidates.len(),
                        &class,
                        &parameter_list(expected),
                    ],
                ),
            }
            return;
        };

        let implements_session_bean = declaring
            .interfaces
            .iter()
            .any(|i| i == well_known::SESSION_BEAN);
        if implements_session_bean {
            if let Some(required) = session_bean_callback_name(callback.kind) {
                if method_name != required {
                    self.context.fail(
                        owner,
                        keys::CALLBACK_SESSION_BEAN_INVALID_USAGE,
                        &[&annotation, &method_name, &class],
                    );
                }
            }
        }

        if method.return_type != well_known::VOID {
            self.context.fail(
                owner,
                keys::CALLBACK_BAD_RETURN_TYPE,
                &[&annotation, &method_name, &method.return_type, &class],
            );
        }

        if method.modifiers.is_static || method.modifiers.is_final {
            self.context.fail(
                owner,
                keys::CALLBACK_BAD_MODIFIER,
                &[&annotation, &method_name, &class],
            );
        }
    }

    fn check_session_synchronization(&mut self, bean: &Arc<TypeDescriptor>, component: &Component) {
        if !is_assignable(self.lookup, well_known::SESSION_SYNCHRONIZATION, bean) {
            return;
        }
        if component.callbacks.iter().any(|c| c.kind.is_synchronization()) {
            self.context.fail(
                &component.name,
                keys::CALLBACK_SESSION_SYNCHRONIZATION_INVALID_USE,
                &[&bean.name],
            );
        }
    }

    fn check_interceptor(&mut self, interceptor: &Interceptor) {
        let Ok(class) = self.lookup.load_type(&interceptor.class_name) else {
            return;
        };
        let owner = interceptor.class_name.as_str();

        for around in &interceptor.around_invoke {
            self.check_around(AroundKind::Invoke, &class, around, owner);
        }
        for around in &interceptor.around_timeout {
            self.check_around(AroundKind::Timeout, &class, around, owner);
        }
        for callback in &interceptor.callbacks {
            self.check_interceptor_callback(&class, callback, owner);
        }
    }

    fn check_interceptor_callback(
        &mut self,
        interceptor: &Arc<TypeDescriptor>,
        callback: &LifecycleCallback,
        owner: &str,
    ) {
        let annotation = callback.kind.to_string();
        let Some(declaring) =
            self.declaring_class(interceptor, callback.class_name.as_deref(), &annotation, owner)
        else {
            return;
        };
        let method_name = callback.method_name.as_str();
        let class = declaring.name.as_str();

        if let Some(method) =
            self.matcher
                .find_method(&declaring, method_name, &[well_known::INVOCATION_CONTEXT])
        {
            if method.return_type != well_known::VOID {
                self.context.fail(
                    owner,
                    keys::INTERCEPTOR_CALLBACK_BAD_RETURN_TYPE,
                    &[&class, &annotation, &method_name, &method.return_type],
                );
            }
            return;
        }

        let candidates = self.matcher.methods_named(&declaring, method_name);
        match candidates.as_slice() {
            [] => self.context.fail(
                owner,
                keys::INTERCEPTOR_CALLBACK_MISSING,
                &[&annotation, &method_name, &class],
            ),
            [candidate] => {
                self.context.fail(
                    owner,
                    keys::INTERCEPTOR_CALLBACK_INVALID_ARGUMENTS,
                    &[&annotation, &method_name, &candidate.parameter_list(), &class],
                );
                if candidate.return_type != well_known::VOID {
                    self.context.fail(
                        owner,
                        keys::INTERCEPTOR_CALLBACK_BAD_RETURN_TYPE,
                        &[&class, &annotation, &method_name, &candidate.return_type],
                    );
                }
            }
            _ => self.context.fail(
                owner,
                keys::INTERCEPTOR_CALLBACK_POSSIBLE_TYPO,
                &[&annotation, &method_name, &candidates.len(), &class],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Module, ModuleClassLoader, ModuleKind};
    use crate::types::{MethodDescriptor, Modifiers, TypeCatalog};

    fn invocation_method(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(name, &[well_known::INVOCATION_CONTEXT])
            .returning(well_known::OBJECT)
            .throwing(well_known::EXCEPTION)
    }

    fn catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::with_parent(Arc::new(TypeCatalog::platform()));
        catalog.insert(
            TypeDescriptor::class("com.acme.CartBean")
                .with_method(MethodDescriptor::new("init", &[]))
                .with_method(MethodDescriptor::new("destroy", &[]).returning("int"))
                .with_method(MethodDescriptor::new("passivate", &[]).with_modifiers(Modifiers {
                    is_public: true,
                    is_static: true,
                    ..Modifiers::default()
                }))
                .with_method(MethodDescriptor::new("done", &["int"]))
                .with_method(MethodDescriptor::new("begin", &[well_known::INVOCATION_CONTEXT]))
                .with_method(invocation_method("audit"))
                .with_method(MethodDescriptor::new("trace", &[well_known::INVOCATION_CONTEXT]))
                .with_method(MethodDescriptor::new("log", &[]))
                .with_method(MethodDescriptor::new("log", &["int"])),
        );
        catalog.insert(
            TypeDescriptor::class("com.acme.LegacyBean")
                .implements(well_known::SESSION_BEAN)
                .implements(well_known::SESSION_SYNCHRONIZATION)
                .with_method(MethodDescriptor::new("setUp", &[]))
                .with_method(MethodDescriptor::new("afterBegin", &[])),
        );
        catalog.insert(
            TypeDescriptor::class("com.acme.AuditInterceptor")
                .with_method(invocation_method("around"))
                .with_method(
                    MethodDescriptor::new("created", &[well_known::INVOCATION_CONTEXT])
                        .returning(well_known::OBJECT),
                )
                .with_method(MethodDescriptor::new("destroyed", &[])),
        );
        catalog
    }

    fn run(component: Component, interceptors: Vec<Interceptor>) -> ValidationContext {
        let loader = ModuleClassLoader::new(Arc::new(catalog()), Default::default());
        let mut module = interceptors.into_iter().fold(
            Module::new("a.jar", ModuleKind::Ejb, loader).with_component(component),
            Module::with_interceptor,
        );
        CheckCallbacks.visit(&mut Target::Module(&mut module)).unwrap();
        module.context
    }

    fn keys_of(records: &[diagnostics::DiagnosticRecord]) -> Vec<&str> {
        records.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_valid_callbacks_are_clean() {
        let context = run(
            Component::stateless("Cart", "com.acme.CartBean")
                .with_callback(LifecycleCallback::new(CallbackKind::PostConstruct, "init"))
                .with_around_invoke(AroundMethod::new("audit")),
            vec![],
        );
        assert!(context.is_empty(), "{:?}", context);
    }

    #[test]
    fn test_lifecycle_callback_problems() {
        let context = run(
            Component::stateful("Cart", "com.acme.CartBean")
                .with_callback(LifecycleCallback::new(CallbackKind::PreDestroy, "destroy"))
                .with_callback(LifecycleCallback::new(CallbackKind::PrePassivate, "passivate"))
                .with_callback(LifecycleCallback::new(CallbackKind::PostActivate, "activate"))
                .with_callback(LifecycleCallback::new(CallbackKind::AfterCompletion, "done"))
                .with_callback(LifecycleCallback::new(CallbackKind::AfterBegin, "begin"))
                .with_callback(LifecycleCallback::new(CallbackKind::BeforeCompletion, "log")),
            vec![],
        );

        assert_eq!(
            keys_of(context.failures()),
            vec![
                keys::CALLBACK_BAD_RETURN_TYPE,
                keys::CALLBACK_BAD_MODIFIER,
                keys::CALLBACK_MISSING,
                keys::CALLBACK_INVALID_ARGUMENTS,
                keys::CALLBACK_INVOCATION_CONTEXT_NOT_ALLOWED,
            ]
        );
        assert_eq!(context.failures()[3].params[2], "(int)");
        assert_eq!(context.failures()[3].params[4], "(boolean)");
        assert!(context.warnings().is_empty());
    }

    #[test]
    fn test_around_invoke_problems() {
        let context = run(
            Component::stateless("Cart", "com.acme.CartBean")
                .with_around_invoke(AroundMethod::new("trace"))
                .with_around_invoke(AroundMethod::new("missing"))
                .with_around_invoke(AroundMethod::new("log"))
                .with_around_invoke(AroundMethod::new("audit").declared_on("com.acme.Gone")),
            vec![],
        );

        assert_eq!(
            keys_of(context.failures()),
            vec![
                keys::AROUND_INVOKE_BAD_RETURN_TYPE,
                keys::AROUND_INVOKE_MUST_THROW_EXCEPTION,
                keys::AROUND_INVOKE_MISSING,
                keys::AROUND_INVOKE_POSSIBLE_TYPO,
                keys::MISSING_CLASS,
            ]
        );
        assert_eq!(context.failures()[3].params[2], "2");
    }

    #[test]
    fn test_stateful_only_callbacks_are_ignored_elsewhere() {
        let context = run(
            Component::singleton("Cart", "com.acme.CartBean")
                .with_callback(LifecycleCallback::new(CallbackKind::PrePassivate, "passivate"))
                .with_callback(LifecycleCallback::new(CallbackKind::AfterBegin, "begin")),
            vec![],
        );

        assert!(context.failures().is_empty());
        assert_eq!(
            keys_of(context.warnings()),
            vec![keys::IGNORED_METHOD_ANNOTATION, keys::IGNORED_METHOD_ANNOTATION]
        );
        assert_eq!(
            context.warnings()[0].params,
            vec!["PrePassivate", "Cart", "com.acme.CartBean", "passivate", "Singleton"]
        );
    }

    #[test]
    fn test_around_timeout_ignored_on_stateful() {
        let context = run(
            Component::stateful("Cart", "com.acme.CartBean")
                .with_around_timeout(AroundMethod::new("audit")),
            vec![],
        );

        assert!(context.failures().is_empty());
        assert_eq!(context.warnings().len(), 1);
        assert_eq!(context.warnings()[0].params[0], "AroundTimeout");
    }

    #[test]
    fn test_session_bean_implementor() {
        let context = run(
            Component::stateful("Legacy", "com.acme.LegacyBean")
                .with_callback(LifecycleCallback::new(CallbackKind::PostConstruct, "setUp"))
                .with_callback(LifecycleCallback::new(CallbackKind::AfterBegin, "afterBegin")),
            vec![],
        );

        assert_eq!(
            keys_of(context.failures()),
            vec![
                keys::CALLBACK_SESSION_BEAN_INVALID_USAGE,
                keys::CALLBACK_SESSION_SYNCHRONIZATION_INVALID_USE,
            ]
        );
    }

    #[test]
    fn test_interceptor_callbacks() {
        let interceptor = Interceptor::new("com.acme.AuditInterceptor")
            .with_around_invoke(AroundMethod::new("around"))
            .with_callback(LifecycleCallback::new(CallbackKind::PostConstruct, "created"))
            .with_callback(LifecycleCallback::new(CallbackKind::PreDestroy, "destroyed"))
            .with_callback(LifecycleCallback::new(CallbackKind::PostActivate, "activated"));

        let context = run(Component::stateless("Cart", "com.acme.CartBean"), vec![interceptor]);

        assert_eq!(
            keys_of(context.failures()),
            vec![
                keys::INTERCEPTOR_CALLBACK_BAD_RETURN_TYPE,
                keys::INTERCEPTOR_CALLBACK_INVALID_ARGUMENTS,
                keys::INTERCEPTOR_CALLBACK_MISSING,
            ]
        );
        assert!(context
            .failures()
            .iter()
            .all(|r| r.component == "com.acme.AuditInterceptor"));
    }
}
