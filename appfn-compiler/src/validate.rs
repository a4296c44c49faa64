//! Structural validation of record declarations
//!
//! Enforces the shape contract on anything claiming to be a structured
//! record before the builder trusts its shape: one public, non-empty primary
//! constructor; every constructor parameter backed by a readable property of
//! the same name; every property type supported (generic properties are
//! deferred until a concrete instantiation binds them); supertype property
//! sets fully reproduced in the subtype.

use crate::annotations::RecordMarker;
use crate::classify::TypeClassifier;
use crate::declaration::{AnnotationView, Declaration, DeclarationStore, TypeRef, Visibility};
use crate::docs::extract_param_descriptions;
use crate::error::{ProcessingError, SourceLocation};
use crate::supertype::{reconcile, split_supertypes};

/// Intermediate property view produced by validation: one entry per primary
/// constructor parameter, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDeclaration {
    pub name: String,
    pub type_ref: TypeRef,
    pub is_required: bool,
    pub description: String,
    /// True while the property's type still names an unresolved generic
    /// type parameter; such properties are skipped until a concrete binding
    /// is supplied at a use site.
    pub is_generic: bool,
    pub annotations: Vec<AnnotationView>,
}

/// Validate a record declaration and produce its ordered property list.
pub fn validate_record(
    declaration: &Declaration,
    store: &dyn DeclarationStore,
    allow_interfaces: bool,
) -> Result<Vec<PropertyDeclaration>, ProcessingError> {
    let location = SourceLocation::Declaration(declaration.qualified_name.clone());

    let constructor = declaration.constructor.as_ref().ok_or_else(|| {
        ProcessingError::new(
            "Record must declare a primary constructor",
            location.clone(),
        )
    })?;
    if constructor.parameters.is_empty() {
        return Err(ProcessingError::new(
            "Primary constructor must take at least one parameter",
            location.clone(),
        ));
    }
    if constructor.visibility != Visibility::Public {
        return Err(ProcessingError::new(
            "Primary constructor must be public",
            location.clone(),
        ));
    }

    let descriptions = match RecordMarker::from_annotations(&declaration.annotations) {
        Some(marker) if marker.described_by_doc => {
            extract_param_descriptions(declaration.doc.as_deref().unwrap_or(""))
        }
        _ => Default::default(),
    };

    let classifier = TypeClassifier::new(store);
    let mut properties = Vec::with_capacity(constructor.parameters.len());
    for parameter in &constructor.parameters {
        let property = declaration.property(&parameter.name).ok_or_else(|| {
            ProcessingError::new(
                format!(
                    "Constructor parameter '{}' has no matching readable property",
                    parameter.name
                ),
                SourceLocation::Property {
                    declaration: declaration.qualified_name.clone(),
                    property: parameter.name.clone(),
                },
            )
        })?;
        if !property.is_readable {
            return Err(ProcessingError::new(
                format!("Property '{}' must be readable", parameter.name),
                SourceLocation::Property {
                    declaration: declaration.qualified_name.clone(),
                    property: parameter.name.clone(),
                },
            ));
        }

        let is_generic = parameter.type_ref.has_unresolved_parameter();
        if is_generic {
            tracing::warn!(
                "deferring validation of generic property {}.{}",
                declaration.qualified_name,
                parameter.name
            );
        } else if !classifier.is_supported_type(&parameter.type_ref, allow_interfaces) {
            let diagnostic = classifier.unsupported(&parameter.type_ref);
            return Err(ProcessingError::new(
                diagnostic.message,
                SourceLocation::Property {
                    declaration: declaration.qualified_name.clone(),
                    property: parameter.name.clone(),
                },
            ));
        }

        let mut annotations = parameter.annotations.clone();
        annotations.extend(property.annotations.iter().cloned());

        properties.push(PropertyDeclaration {
            name: parameter.name.clone(),
            type_ref: parameter.type_ref.clone(),
            is_required: !parameter.has_default,
            description: descriptions
                .get(&parameter.name)
                .cloned()
                .unwrap_or_default(),
            is_generic,
            annotations,
        });
    }

    if !declaration.supertypes.is_empty() {
        let split = split_supertypes(declaration, store)?;
        reconcile(declaration, &split, &properties, store, allow_interfaces)?;
    }

    Ok(properties)
}
