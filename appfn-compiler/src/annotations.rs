//! The fixed annotation vocabulary the engine interprets
//!
//! Marker names are matched by fully-qualified name. Each marker has a typed
//! extractor that reads its argument map and applies documented defaults.

use appfn_metadata::ValueConstraint;

use crate::declaration::AnnotationView;
use crate::error::{ProcessingError, SourceLocation};

/// Marks a function as an app function.
pub const APP_FUNCTION: &str = "appfn.annotations.AppFunction";
/// Marks a class as a serializable structured record.
pub const SERIALIZABLE_RECORD: &str = "appfn.annotations.SerializableRecord";
/// Marks an interface as a capability contract.
pub const SCHEMA_CAPABILITY: &str = "appfn.annotations.SchemaCapability";
/// Marks a record as a proxy standing in for an external type.
pub const SERIALIZABLE_PROXY: &str = "appfn.annotations.SerializableProxy";
/// Binds a function to a predefined schema (category, name, version).
pub const SCHEMA_DEFINITION: &str = "appfn.annotations.SchemaDefinition";
/// Restricts an int-typed property to an enumerated value set.
pub const INT_VALUE_CONSTRAINT: &str = "appfn.annotations.IntValueConstraint";
/// Restricts a string-typed property to an enumerated value set.
pub const STRING_VALUE_CONSTRAINT: &str = "appfn.annotations.StringValueConstraint";

/// The implicit invocation-context parameter type, elided from metadata.
pub const FUNCTION_CONTEXT: &str = "appfn.FunctionContext";

fn find<'a>(annotations: &'a [AnnotationView], qualified_name: &str) -> Option<&'a AnnotationView> {
    annotations
        .iter()
        .find(|a| a.qualified_name == qualified_name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMarker {
    pub is_enabled: bool,
    pub described_by_doc: bool,
}

impl FunctionMarker {
    pub fn from_annotations(annotations: &[AnnotationView]) -> Option<FunctionMarker> {
        find(annotations, APP_FUNCTION).map(|marker| FunctionMarker {
            is_enabled: marker.bool_argument("isEnabled", true),
            described_by_doc: marker.bool_argument("describedByDoc", false),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordMarker {
    pub described_by_doc: bool,
}

impl RecordMarker {
    pub fn from_annotations(annotations: &[AnnotationView]) -> Option<RecordMarker> {
        find(annotations, SERIALIZABLE_RECORD).map(|marker| RecordMarker {
            described_by_doc: marker.bool_argument("describedByDoc", false),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaMarker {
    pub category: String,
    pub name: String,
    pub version: u64,
}

impl SchemaMarker {
    /// Read the schema-definition marker, if present. Missing or mistyped
    /// arguments are hard failures: a schema binding is an identity.
    pub fn from_annotations(
        annotations: &[AnnotationView],
        location: &SourceLocation,
    ) -> Result<Option<SchemaMarker>, ProcessingError> {
        let marker = match find(annotations, SCHEMA_DEFINITION) {
            Some(marker) => marker,
            None => return Ok(None),
        };
        let category = marker.string_argument("category").ok_or_else(|| {
            ProcessingError::new(
                "Schema definition is missing its 'category' argument",
                location.clone(),
            )
        })?;
        let name = marker.string_argument("name").ok_or_else(|| {
            ProcessingError::new(
                "Schema definition is missing its 'name' argument",
                location.clone(),
            )
        })?;
        let version = marker.int_argument("version").ok_or_else(|| {
            ProcessingError::new(
                "Schema definition is missing its 'version' argument",
                location.clone(),
            )
        })?;
        if version < 0 {
            return Err(ProcessingError::new(
                format!("Schema version must be non-negative, got {}", version),
                location.clone(),
            ));
        }
        Ok(Some(SchemaMarker {
            category: category.to_string(),
            name: name.to_string(),
            version: version as u64,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyMarker {
    pub target_type: String,
}

impl ProxyMarker {
    pub fn from_annotations(
        annotations: &[AnnotationView],
        location: &SourceLocation,
    ) -> Result<Option<ProxyMarker>, ProcessingError> {
        let marker = match find(annotations, SERIALIZABLE_PROXY) {
            Some(marker) => marker,
            None => return Ok(None),
        };
        let target_type = marker.string_argument("targetType").ok_or_else(|| {
            ProcessingError::new(
                "Proxy marker is missing its 'targetType' argument",
                location.clone(),
            )
        })?;
        Ok(Some(ProxyMarker {
            target_type: target_type.to_string(),
        }))
    }
}

/// Read the value-constraint marker attached to a property or parameter, if
/// any. Carrying both the int and the string marker at once is a hard
/// failure.
pub fn value_constraint_from(
    annotations: &[AnnotationView],
    location: &SourceLocation,
) -> Result<Option<ValueConstraint>, ProcessingError> {
    let int_marker = find(annotations, INT_VALUE_CONSTRAINT);
    let string_marker = find(annotations, STRING_VALUE_CONSTRAINT);
    match (int_marker, string_marker) {
        (Some(_), Some(_)) => Err(ProcessingError::new(
            "Property carries both an int and a string value constraint",
            location.clone(),
        )),
        (Some(marker), None) => {
            let values = marker.int_list_argument("values").ok_or_else(|| {
                ProcessingError::new(
                    "Int value constraint is missing its 'values' argument",
                    location.clone(),
                )
            })?;
            Ok(Some(ValueConstraint::IntEnum(values.to_vec())))
        }
        (None, Some(marker)) => {
            let values = marker.string_list_argument("values").ok_or_else(|| {
                ProcessingError::new(
                    "String value constraint is missing its 'values' argument",
                    location.clone(),
                )
            })?;
            Ok(Some(ValueConstraint::StringEnum(values.to_vec())))
        }
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::AnnotationValue;

    fn location() -> SourceLocation {
        SourceLocation::Declaration("com.example.Note".to_string())
    }

    #[test]
    fn test_function_marker_defaults() {
        let annotations = vec![AnnotationView::new(APP_FUNCTION)];
        let marker = FunctionMarker::from_annotations(&annotations).expect("marker");
        assert!(marker.is_enabled);
        assert!(!marker.described_by_doc);
    }

    #[test]
    fn test_function_marker_arguments() {
        let annotations = vec![AnnotationView::new(APP_FUNCTION)
            .with_argument("isEnabled", AnnotationValue::Bool(false))
            .with_argument("describedByDoc", AnnotationValue::Bool(true))];
        let marker = FunctionMarker::from_annotations(&annotations).expect("marker");
        assert!(!marker.is_enabled);
        assert!(marker.described_by_doc);
    }

    #[test]
    fn test_schema_marker_requires_all_arguments() {
        let annotations = vec![AnnotationView::new(SCHEMA_DEFINITION)
            .with_argument("category", AnnotationValue::Str("notes".to_string()))
            .with_argument("name", AnnotationValue::Str("createNote".to_string()))];
        let result = SchemaMarker::from_annotations(&annotations, &location());
        assert!(result.is_err(), "missing version must fail");
    }

    #[test]
    fn test_schema_marker_complete() {
        let annotations = vec![AnnotationView::new(SCHEMA_DEFINITION)
            .with_argument("category", AnnotationValue::Str("notes".to_string()))
            .with_argument("name", AnnotationValue::Str("createNote".to_string()))
            .with_argument("version", AnnotationValue::Int(2))];
        let marker = SchemaMarker::from_annotations(&annotations, &location())
            .expect("parse")
            .expect("present");
        assert_eq!(marker.category, "notes");
        assert_eq!(marker.name, "createNote");
        assert_eq!(marker.version, 2);
    }

    #[test]
    fn test_conflicting_value_constraints_rejected() {
        let annotations = vec![
            AnnotationView::new(INT_VALUE_CONSTRAINT)
                .with_argument("values", AnnotationValue::IntList(vec![1, 2])),
            AnnotationView::new(STRING_VALUE_CONSTRAINT)
                .with_argument("values", AnnotationValue::StrList(vec!["a".to_string()])),
        ];
        assert!(value_constraint_from(&annotations, &location()).is_err());
    }

    #[test]
    fn test_int_value_constraint() {
        let annotations = vec![AnnotationView::new(INT_VALUE_CONSTRAINT)
            .with_argument("values", AnnotationValue::IntList(vec![1, 2, 3]))];
        let constraint = value_constraint_from(&annotations, &location())
            .expect("parse")
            .expect("present");
        assert_eq!(constraint, ValueConstraint::IntEnum(vec![1, 2, 3]));
    }
}
