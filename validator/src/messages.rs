//! Diagnostic keys and the built-in message catalog
//!
//! Every key a rule can emit is declared in [`keys`] and has a template in
//! [`builtin_catalog`]. Keys are grouped by the rule that emits them:
//!
//! - class presence and type conformance (`missing.class`, `wrong.class.type`, ...)
//! - business and creation methods (`no.business.method*`, `*.ejb.create`, ...)
//! - lifecycle and around-invoke callbacks (`callback.*`, `aroundInvoke.*`, ...)
//! - depends-on resolution (`dependsOn.*`)
//! - classloader overlap (`classloading.*`)
//! - injection targets and interceptor bindings
//!
//! Templates take positional parameters; the comment above each key lists
//! them in order.

use diagnostics::MessageCatalog;

pub mod keys {
    /// class, role, component
    pub const MISSING_CLASS: &str = "missing.class";
    /// class, missing supertype, role
    pub const MISSLOCATED_CLASS: &str = "misslocated.class";
    /// class, expected type, role
    pub const WRONG_CLASS_TYPE: &str = "wrong.class.type";
    /// interface
    pub const BUSINESS_LOCAL_NOT_INTERFACE: &str = "xml.businessLocal.notInterface";
    /// interface
    pub const BUSINESS_REMOTE_NOT_INTERFACE: &str = "xml.businessRemote.notInterface";
    /// interface
    pub const LOCAL_REMOTE_CONFLICT: &str = "xml.localRemote.conflict";
    /// implementation class
    pub const NO_INTERFACE_DECLARED_ENTITY: &str = "noInterfaceDeclared.entity";

    /// method name, method signature, interface, implementation class
    pub const NO_BUSINESS_METHOD: &str = "no.business.method";
    /// method name, method signature, interface, implementation class, candidates
    pub const NO_BUSINESS_METHOD_ARGS: &str = "no.business.method.args";
    /// method name, method signature, interface, implementation class, candidates
    pub const NO_BUSINESS_METHOD_CASE: &str = "no.business.method.case";
    /// implementation class, primary key class, method name, parameters
    pub const ENTITY_NO_EJB_CREATE: &str = "entity.no.ejb.create";
    /// implementation class, method name, parameters
    pub const SESSION_NO_EJB_CREATE: &str = "session.no.ejb.create";
    /// implementation class, method name, parameters
    pub const ENTITY_NO_EJB_POST_CREATE: &str = "entity.no.ejb.postCreate";
    /// implementation class, method name, parameters, home interface
    pub const UNUSED_EJB_CREATE: &str = "unused.ejb.create";
    /// implementation class, method name, parameters
    pub const UNUSED_EJB_POST_CREATE: &str = "unused.ejbPostCreate";

    /// around type, method, class
    pub const AROUND_INVOKE_MISSING: &str = "aroundInvoke.missing";
    /// around type, method, found parameters, class
    pub const AROUND_INVOKE_INVALID_ARGUMENTS: &str = "aroundInvoke.invalidArguments";
    /// around type, method, candidates, class
    pub const AROUND_INVOKE_POSSIBLE_TYPO: &str = "aroundInvoke.missing.possibleTypo";
    /// around type, method, return type, class
    pub const AROUND_INVOKE_BAD_RETURN_TYPE: &str = "aroundInvoke.badReturnType";
    /// around type, method, class
    pub const AROUND_INVOKE_MUST_THROW_EXCEPTION: &str = "aroundInvoke.mustThrowException";

    /// callback type, method, class
    pub const CALLBACK_MISSING: &str = "callback.missing";
    /// callback type, method, found parameters, class, expected parameters
    pub const CALLBACK_INVALID_ARGUMENTS: &str = "callback.invalidArguments";
    /// callback type, method, candidates, class, expected parameters
    pub const CALLBACK_POSSIBLE_TYPO: &str = "callback.missing.possibleTypo";
    /// callback type, method, return type, class
    pub const CALLBACK_BAD_RETURN_TYPE: &str = "callback.badReturnType";
    /// callback type, method, class
    pub const CALLBACK_BAD_MODIFIER: &str = "callback.badModifier";
    /// callback type, method
    pub const CALLBACK_INVOCATION_CONTEXT_NOT_ALLOWED: &str =
        "callback.invocationcontext.notallowed";
    /// callback type, method, class
    pub const CALLBACK_SESSION_BEAN_INVALID_USAGE: &str = "callback.sessionbean.invalidusage";
    /// class
    pub const CALLBACK_SESSION_SYNCHRONIZATION_INVALID_USE: &str =
        "callback.sessionSynchronization.invalidUse";
    /// callback type, method, class
    pub const INTERCEPTOR_CALLBACK_MISSING: &str = "interceptor.callback.missing";
    /// callback type, method, found parameters, class
    pub const INTERCEPTOR_CALLBACK_INVALID_ARGUMENTS: &str =
        "interceptor.callback.invalidArguments";
    /// callback type, method, candidates, class
    pub const INTERCEPTOR_CALLBACK_POSSIBLE_TYPO: &str = "interceptor.callback.missing.possibleTypo";
    /// class, callback type, method, return type
    pub const INTERCEPTOR_CALLBACK_BAD_RETURN_TYPE: &str = "interceptor.callback.badReturnType";
    /// annotation, component, class, method, component kind
    pub const IGNORED_METHOD_ANNOTATION: &str = "ignoredMethodAnnotation";

    /// referenced name
    pub const DEPENDS_ON_NO_SUCH_EJB: &str = "dependsOn.noSuchEjb";
    /// chain, first component
    pub const DEPENDS_ON_CIRCUIT: &str = "dependsOn.circuit";

    /// first archive, second archive, shared classes, class list
    pub const CLASSLOADING_SAME: &str = "classloading.same";
    /// first archive, second archive, shared classes, class list
    pub const CLASSLOADING_INCLUDED: &str = "classloading.included";
    /// first archive, second archive, shared classes, class list
    pub const CLASSLOADING_CONTAINING: &str = "classloading.containing";
    /// first archive, second archive, shared classes, class list
    pub const CLASSLOADING_DIFF: &str = "classloading.diff";

    /// reference name, original target name, corrected name, target class
    pub const INJECTION_TARGET_NAME_CONTAINS_SET: &str = "injectionTarget.nameContainsSet";
    /// interceptor class
    pub const INTERCEPTOR_UNUSED: &str = "interceptor.unused";

    /// Every key declared above
    pub const ALL: &[&str] = &[
        MISSING_CLASS,
        MISSLOCATED_CLASS,
        WRONG_CLASS_TYPE,
        BUSINESS_LOCAL_NOT_INTERFACE,
        BUSINESS_REMOTE_NOT_INTERFACE,
        LOCAL_REMOTE_CONFLICT,
        NO_INTERFACE_DECLARED_ENTITY,
        NO_BUSINESS_METHOD,
        NO_BUSINESS_METHOD_ARGS,
        NO_BUSINESS_METHOD_CASE,
        ENTITY_NO_EJB_CREATE,
        SESSION_NO_EJB_CREATE,
        ENTITY_NO_EJB_POST_CREATE,
        UNUSED_EJB_CREATE,
        UNUSED_EJB_POST_CREATE,
        AROUND_INVOKE_MISSING,
        AROUND_INVOKE_INVALID_ARGUMENTS,
        AROUND_INVOKE_POSSIBLE_TYPO,
        AROUND_INVOKE_BAD_RETURN_TYPE,
        AROUND_INVOKE_MUST_THROW_EXCEPTION,
        CALLBACK_MISSING,
        CALLBACK_INVALID_ARGUMENTS,
        CALLBACK_POSSIBLE_TYPO,
        CALLBACK_BAD_RETURN_TYPE,
        CALLBACK_BAD_MODIFIER,
        CALLBACK_INVOCATION_CONTEXT_NOT_ALLOWED,
        CALLBACK_SESSION_BEAN_INVALID_USAGE,
        CALLBACK_SESSION_SYNCHRONIZATION_INVALID_USE,
        INTERCEPTOR_CALLBACK_MISSING,
        INTERCEPTOR_CALLBACK_INVALID_ARGUMENTS,
        INTERCEPTOR_CALLBACK_POSSIBLE_TYPO,
        INTERCEPTOR_CALLBACK_BAD_RETURN_TYPE,
        IGNORED_METHOD_ANNOTATION,
        DEPENDS_ON_NO_SUCH_EJB,
        DEPENDS_ON_CIRCUIT,
        CLASSLOADING_SAME,
        CLASSLOADING_INCLUDED,
        CLASSLOADING_CONTAINING,
        CLASSLOADING_DIFF,
        INJECTION_TARGET_NAME_CONTAINS_SET,
        INTERCEPTOR_UNUSED,
    ];
}

const BUILTIN_TEMPLATES: &str = r#"
# Classes
missing.class = Class {0} ({1}) not found for {2}
misslocated.class = Class {0} ({2}) was found but cannot be linked: {1} is not visible from this module
wrong.class.type = {2} class {0} must be a {1}
xml.businessLocal.notInterface = Business local {0} is not an interface
xml.businessRemote.notInterface = Business remote {0} is not an interface
xml.localRemote.conflict = {0} is declared both as a business local and a business remote interface
noInterfaceDeclared.entity = Entity bean {0} declares neither a home nor a local home interface

# Methods
no.business.method = Business method {1} declared by {2} is not implemented by {3}
no.business.method.args = Business method {1} declared by {2} is not implemented; {4} method(s) named {0} with different arguments found in {3}
no.business.method.case = Business method {1} declared by {2} is not implemented; {4} method(s) named like {0} with different case found in {3}
entity.no.ejb.create = Entity bean {0} (primary key {1}) is missing {2}{3}
session.no.ejb.create = Session bean {0} is missing {1}{2}
entity.no.ejb.postCreate = Entity bean {0} is missing {1}{2}
unused.ejb.create = {0}.{1}{2} has no matching create method in {3}
unused.ejbPostCreate = {0}.{1}{2} has no matching create method

# Callbacks
aroundInvoke.missing = @{0} method {1} not found in {2}
aroundInvoke.invalidArguments = @{0} method {1}{2} in {3} must take exactly one InvocationContext parameter
aroundInvoke.missing.possibleTypo = @{0} method {1} not found in {3}; {2} method(s) with that name exist
aroundInvoke.badReturnType = @{0} method {1} in {3} must return java.lang.Object, not {2}
aroundInvoke.mustThrowException = @{0} method {1} in {2} must declare throws java.lang.Exception
callback.missing = @{0} method {1} not found in {2}
callback.invalidArguments = @{0} method {1}{2} in {3} must have parameters {4}
callback.missing.possibleTypo = @{0} method {1}{4} not found in {3}; {2} method(s) with that name exist
callback.badReturnType = @{0} method {1} in {3} must return void, not {2}
callback.badModifier = @{0} method {1} in {2} must not be static or final
callback.invocationcontext.notallowed = @{0} method {1} on a bean class must not take an InvocationContext
callback.sessionbean.invalidusage = @{0} method {1} is not allowed on {2}, which implements jakarta.ejb.SessionBean
callback.sessionSynchronization.invalidUse = {0} implements SessionSynchronization and also declares session synchronization callbacks
interceptor.callback.missing = Interceptor @{0} method {1} not found in {2}
interceptor.callback.invalidArguments = Interceptor @{0} method {1}{2} in {3} must take exactly one InvocationContext parameter
interceptor.callback.missing.possibleTypo = Interceptor @{0} method {1} not found in {3}; {2} method(s) with that name exist
interceptor.callback.badReturnType = Interceptor {0} @{1} method {2} must return void, not {3}
ignoredMethodAnnotation = @{0} is ignored on {4} bean {1} ({2}.{3})

# Depends-on
dependsOn.noSuchEjb = No bean named {0} found for @DependsOn
dependsOn.circuit = Circular @DependsOn reference: {0}

# Class loading
classloading.same = {0} and {1} contain the same {2} classes{3}
classloading.included = All {2} classes of {0} are also in {1}{3}
classloading.containing = {0} contains all {2} classes of {1}{3}
classloading.diff = {0} and {1} share {2} classes{3}

# Injection and interceptors
injectionTarget.nameContainsSet = Injection target {1} of {0} in {3} is a setter name; using property {2}
interceptor.unused = Interceptor {0} is declared but not bound to any bean
"#;

/// Templates for every key in [`keys::ALL`]
pub fn builtin_catalog() -> MessageCatalog {
    MessageCatalog::from_properties(BUILTIN_TEMPLATES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_has_a_template() {
        let catalog = builtin_catalog();
        for key in keys::ALL {
            assert!(catalog.contains(key), "no template for {}", key);
        }
        assert_eq!(catalog.len(), keys::ALL.len());
    }

    #[test]
    fn test_render_depends_on_circuit() {
        let catalog = builtin_catalog();
        let text = catalog.render(
            keys::DEPENDS_ON_CIRCUIT,
            &["One -> Two -> One".to_string(), "One".to_string()],
        );
        assert_eq!(text, "Circular @DependsOn reference: One -> Two -> One");
    }
}
