//! Type descriptors and the injected type lookup
//!
//! Rules never reflect over live classes. Every class or interface they
//! inspect is described by a [`TypeDescriptor`] obtained from a
//! [`TypeLookup`], which behaves like a classloader: it finds a type by its
//! fully-qualified name and refuses to hand out types whose supertypes are
//! not visible.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Platform type names the rules check against
pub mod well_known {
    pub const OBJECT: &str = "java.lang.Object";
    pub const EXCEPTION: &str = "java.lang.Exception";
    pub const VOID: &str = "void";
    pub const BOOLEAN: &str = "boolean";
    pub const EJB_HOME: &str = "jakarta.ejb.EJBHome";
    pub const EJB_LOCAL_HOME: &str = "jakarta.ejb.EJBLocalHome";
    pub const EJB_OBJECT: &str = "jakarta.ejb.EJBObject";
    pub const EJB_LOCAL_OBJECT: &str = "jakarta.ejb.EJBLocalObject";
    pub const SESSION_BEAN: &str = "jakarta.ejb.SessionBean";
    pub const SESSION_SYNCHRONIZATION: &str = "jakarta.ejb.SessionSynchronization";
    pub const INVOCATION_CONTEXT: &str = "jakarta.interceptor.InvocationContext";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub is_public: bool,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
}

impl Modifiers {
    pub fn public() -> Self {
        Self {
            is_public: true,
            ..Self::default()
        }
    }
}

fn void_type() -> String {
    well_known::VOID.to_string()
}

/// A method as declared on a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameter_types: Vec<String>,
    #[serde(default = "void_type")]
    pub return_type: String,
    #[serde(default)]
    pub exception_types: Vec<String>,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl MethodDescriptor {
    /// A public method returning `void`
    pub fn new(name: impl Into<String>, parameter_types: &[&str]) -> Self {
        Self {
            name: name.into(),
            parameter_types: parameter_types.iter().map(|p| p.to_string()).collect(),
            return_type: void_type(),
            exception_types: Vec::new(),
            modifiers: Modifiers::public(),
        }
    }

    pub fn returning(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    pub fn throwing(mut self, exception_type: impl Into<String>) -> Self {
        self.exception_types.push(exception_type.into());
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn has_parameters<S: AsRef<str>>(&self, parameter_types: &[S]) -> bool {
        self.parameter_types.len() == parameter_types.len()
            && self
                .parameter_types
                .iter()
                .zip(parameter_types)
                .all(|(a, b)| a == b.as_ref())
    }

    /// Parameter list as written in a signature: `(int, java.lang.String)`
    pub fn parameter_list(&self) -> String {
        format!("({})", self.parameter_types.join(", "))
    }

    /// `name(T1, T2)`
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.parameter_list())
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.return_type, self.signature())
    }
}

/// A class or interface contract: name, supertypes and declared methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            superclass: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Direct supertypes: superclass first, then interfaces
    pub fn supertype_names(&self) -> impl Iterator<Item = &str> {
        self.superclass
            .iter()
            .chain(self.interfaces.iter())
            .map(String::as_str)
    }

    pub fn declared_method<S: AsRef<str>>(
        &self,
        name: &str,
        parameter_types: &[S],
    ) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.has_parameters(parameter_types))
    }

    pub fn declared_methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a MethodDescriptor> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeLoadError {
    #[error("type `{name}` not found")]
    NotFound { name: String },

    /// The type exists but one of its supertypes is not visible
    #[error("type `{name}` cannot be linked: `{missing}` is not visible")]
    Linkage { name: String, missing: String },
}

impl TypeLoadError {
    pub fn not_found(name: impl Into<String>) -> Self {
        TypeLoadError::NotFound { name: name.into() }
    }
}

/// Finds types by fully-qualified name, like a classloader would
pub trait TypeLookup: Send + Sync {
    fn load_type(&self, name: &str) -> Result<Arc<TypeDescriptor>, TypeLoadError>;
}

/// In-memory type lookup with parent-first delegation
#[derive(Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<String, Arc<TypeDescriptor>>,
    parent: Option<Arc<dyn TypeLookup>>,
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("types", &self.types.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Arc<dyn TypeLookup>) -> Self {
        Self {
            types: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// A catalog holding the platform types listed in [`well_known`]
    pub fn platform() -> Self {
        use well_known::*;

        let mut catalog = Self::new();
        catalog.insert(TypeDescriptor::class(OBJECT));
        catalog.insert(TypeDescriptor::class("java.lang.Throwable").extends(OBJECT));
        catalog.insert(TypeDescriptor::class(EXCEPTION).extends("java.lang.Throwable"));
        catalog.insert(TypeDescriptor::interface(EJB_OBJECT));
        catalog.insert(TypeDescriptor::interface(EJB_LOCAL_OBJECT));
        catalog.insert(TypeDescriptor::interface(EJB_HOME));
        catalog.insert(TypeDescriptor::interface(EJB_LOCAL_HOME));
        catalog.insert(TypeDescriptor::interface("jakarta.ejb.EnterpriseBean"));
        catalog.insert(
            TypeDescriptor::interface(SESSION_BEAN).implements("jakarta.ejb.EnterpriseBean"),
        );
        catalog.insert(TypeDescriptor::interface(SESSION_SYNCHRONIZATION));
        catalog.insert(TypeDescriptor::interface(INVOCATION_CONTEXT));
        catalog
    }

    /// Parse a JSON array of type descriptors
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let types: Vec<TypeDescriptor> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for ty in types {
            catalog.insert(ty);
        }
        Ok(catalog)
    }

    pub fn set_parent(&mut self, parent: Arc<dyn TypeLookup>) {
        self.parent = Some(parent);
    }

    pub fn insert(&mut self, ty: TypeDescriptor) {
        self.types.insert(ty.name.clone(), Arc::new(ty));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn find(&self, name: &str) -> Result<Arc<TypeDescriptor>, TypeLoadError> {
        if let Some(parent) = &self.parent {
            match parent.load_type(name) {
                Err(TypeLoadError::NotFound { .. }) => {}
                other => return other,
            }
        }

        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| TypeLoadError::not_found(name))
    }

    fn link(&self, ty: &TypeDescriptor, linked: &mut HashSet<String>) -> Result<(), TypeLoadError> {
        if !linked.insert(ty.name.clone()) {
            return Ok(());
        }

        for supertype in ty.supertype_names() {
            let resolved = match self.find(supertype) {
                Ok(resolved) => resolved,
                Err(TypeLoadError::NotFound { .. }) => {
                    return Err(TypeLoadError::Linkage {
                        name: ty.name.clone(),
                        missing: supertype.to_string(),
                    })
                }
                Err(TypeLoadError::Linkage { missing, .. }) => {
                    return Err(TypeLoadError::Linkage {
                        name: ty.name.clone(),
                        missing,
                    })
                }
            };

            if let Err(TypeLoadError::Linkage { missing, .. }) = self.link(&resolved, linked) {
                return Err(TypeLoadError::Linkage {
                    name: ty.name.clone(),
                    missing,
                });
            }
        }

        Ok(())
    }
}

impl TypeLookup for TypeCatalog {
    fn load_type(&self, name: &str) -> Result<Arc<TypeDescriptor>, TypeLoadError> {
        let ty = self.find(name)?;
        self.link(&ty, &mut HashSet::new())?;
        log::trace!("loaded type {}", name);
        Ok(ty)
    }
}

/// Whether a value of `candidate` can be used where `expected` is required.
///
/// Walks superclasses and interfaces transitively. Supertypes that cannot be
/// loaded end that branch of the walk.
pub fn is_assignable(lookup: &dyn TypeLookup, expected: &str, candidate: &TypeDescriptor) -> bool {
    if candidate.name == expected || expected == well_known::OBJECT {
        return true;
    }

    let mut seen = HashSet::new();
    let mut queue: VecDeque<String> = candidate.supertype_names().map(String::from).collect();

    while let Some(name) = queue.pop_front() {
        if name == expected {
            return true;
        }
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Ok(ty) = lookup.load_type(&name) {
            queue.extend(ty.supertype_names().map(String::from));
        }
    }

    false
}

/// `ty` followed by its loadable superclasses, nearest first
pub fn superclass_chain(lookup: &dyn TypeLookup, ty: &Arc<TypeDescriptor>) -> Vec<Arc<TypeDescriptor>> {
    let mut chain = vec![Arc::clone(ty)];
    let mut seen: HashSet<String> = HashSet::from([ty.name.clone()]);
    let mut next = ty.superclass.clone();

    while let Some(name) = next.take() {
        if !seen.insert(name.clone()) {
            break;
        }
        match lookup.load_type(&name) {
            Ok(superclass) => {
                next = superclass.superclass.clone();
                chain.push(superclass);
            }
            Err(_) => break,
        }
    }

    chain
}
