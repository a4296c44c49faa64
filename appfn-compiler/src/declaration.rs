//! Declaration view model
//!
//! A pure-data snapshot of everything the engine reads from the host
//! compiler's declaration-discovery layer: names, visibility, the primary
//! constructor, properties, supertypes, annotations, doc text, and generic
//! type parameters. Fixtures in tests hand-build these values; a real driver
//! maps its symbol graph into them once and never hands the engine a live
//! symbol.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reference to a type as written at a use site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub qualified_name: String,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_arguments: Vec<TypeRef>,
    /// True when this reference names an unresolved generic type parameter
    /// of the enclosing declaration (e.g. `T`) rather than a real type.
    #[serde(default)]
    pub is_type_parameter: bool,
}

impl TypeRef {
    pub fn named(qualified_name: impl Into<String>) -> TypeRef {
        TypeRef {
            qualified_name: qualified_name.into(),
            is_nullable: false,
            type_arguments: Vec::new(),
            is_type_parameter: false,
        }
    }

    pub fn parameter(name: impl Into<String>) -> TypeRef {
        TypeRef {
            qualified_name: name.into(),
            is_nullable: false,
            type_arguments: Vec::new(),
            is_type_parameter: true,
        }
    }

    pub fn nullable(mut self) -> TypeRef {
        self.is_nullable = true;
        self
    }

    pub fn of(mut self, type_arguments: Vec<TypeRef>) -> TypeRef {
        self.type_arguments = type_arguments;
        self
    }

    /// Substitute bound type arguments into this reference. A nullable use
    /// site stays nullable even when the bound argument is not.
    pub fn substitute(&self, bindings: &IndexMap<String, TypeRef>) -> TypeRef {
        if self.is_type_parameter {
            if let Some(bound) = bindings.get(&self.qualified_name) {
                let mut resolved = bound.clone();
                resolved.is_nullable = resolved.is_nullable || self.is_nullable;
                return resolved;
            }
            return self.clone();
        }
        TypeRef {
            qualified_name: self.qualified_name.clone(),
            is_nullable: self.is_nullable,
            type_arguments: self
                .type_arguments
                .iter()
                .map(|argument| argument.substitute(bindings))
                .collect(),
            is_type_parameter: false,
        }
    }

    /// True when this reference, or any type argument under it, is still an
    /// unresolved generic type parameter.
    pub fn has_unresolved_parameter(&self) -> bool {
        self.is_type_parameter
            || self
                .type_arguments
                .iter()
                .any(TypeRef::has_unresolved_parameter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Internal,
    Protected,
    Private,
}

/// One annotation argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Str(String),
    IntList(Vec<i64>),
    StrList(Vec<String>),
}

/// One annotation as attached in source, with its key/value argument map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationView {
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: IndexMap<String, AnnotationValue>,
}

impl AnnotationView {
    pub fn new(qualified_name: impl Into<String>) -> AnnotationView {
        AnnotationView {
            qualified_name: qualified_name.into(),
            arguments: IndexMap::new(),
        }
    }

    pub fn with_argument(
        mut self,
        name: impl Into<String>,
        value: AnnotationValue,
    ) -> AnnotationView {
        self.arguments.insert(name.into(), value);
        self
    }

    pub fn bool_argument(&self, name: &str, default: bool) -> bool {
        match self.arguments.get(name) {
            Some(AnnotationValue::Bool(value)) => *value,
            _ => default,
        }
    }

    pub fn int_argument(&self, name: &str) -> Option<i64> {
        match self.arguments.get(name) {
            Some(AnnotationValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn string_argument(&self, name: &str) -> Option<&str> {
        match self.arguments.get(name) {
            Some(AnnotationValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn int_list_argument(&self, name: &str) -> Option<&[i64]> {
        match self.arguments.get(name) {
            Some(AnnotationValue::IntList(values)) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn string_list_argument(&self, name: &str) -> Option<&[String]> {
        match self.arguments.get(name) {
            Some(AnnotationValue::StrList(values)) => Some(values.as_slice()),
            _ => None,
        }
    }
}

/// One parameter of a constructor or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterView {
    pub name: String,
    pub type_ref: TypeRef,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationView>,
}

/// A declared property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyView {
    pub name: String,
    pub type_ref: TypeRef,
    #[serde(default = "default_readable")]
    pub is_readable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationView>,
}

fn default_readable() -> bool {
    true
}

/// The primary initializer of a class-like declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constructor {
    pub visibility: Visibility,
    pub parameters: Vec<ParameterView>,
}

/// A function-like declaration: an app function, a schema definition member,
/// or a conversion method on a proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub simple_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterView>,
    pub return_type: TypeRef,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// A class-like declaration handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub simple_name: String,
    pub qualified_name: String,
    #[serde(default)]
    pub package_name: String,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<Constructor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<TypeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Instance-scope functions (app functions, proxy conversions).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionDeclaration>,
    /// Companion/static-scope functions (proxy converse conversions).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companion_functions: Vec<FunctionDeclaration>,
}

impl Declaration {
    pub fn annotation(&self, qualified_name: &str) -> Option<&AnnotationView> {
        self.annotations
            .iter()
            .find(|a| a.qualified_name == qualified_name)
    }

    pub fn has_annotation(&self, qualified_name: &str) -> bool {
        self.annotation(qualified_name).is_some()
    }

    pub fn property(&self, name: &str) -> Option<&PropertyView> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Lookup seam between the engine and whatever discovered the declarations.
pub trait DeclarationStore {
    fn lookup(&self, qualified_name: &str) -> Option<&Declaration>;

    /// Find a proxy declaration standing in for `target_qualified_name`.
    fn proxy_for_target(&self, target_qualified_name: &str) -> Option<&Declaration>;
}

/// Declaration store backed by a plain map; the form used by tests and by
/// drivers that snapshot a compilation unit up front.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeclarations {
    by_name: IndexMap<String, Declaration>,
}

impl InMemoryDeclarations {
    pub fn new() -> InMemoryDeclarations {
        InMemoryDeclarations::default()
    }

    pub fn insert(&mut self, declaration: Declaration) {
        self.by_name
            .insert(declaration.qualified_name.clone(), declaration);
    }

    pub fn with(mut self, declaration: Declaration) -> InMemoryDeclarations {
        self.insert(declaration);
        self
    }
}

impl DeclarationStore for InMemoryDeclarations {
    fn lookup(&self, qualified_name: &str) -> Option<&Declaration> {
        self.by_name.get(qualified_name)
    }

    fn proxy_for_target(&self, target_qualified_name: &str) -> Option<&Declaration> {
        self.by_name.values().find(|declaration| {
            declaration
                .annotation(crate::annotations::SERIALIZABLE_PROXY)
                .and_then(|marker| marker.string_argument("targetType"))
                == Some(target_qualified_name)
        })
    }
}
