//! Flat document form of the metadata model
//!
//! Every nested descriptor carries an integer `type` tag plus only the fields
//! relevant to that tag. This is the form embedded in generated code and in
//! aggregated metadata artifacts; [`DataTypeDocument::to_descriptor`] is its
//! lossless inverse.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::types::{
    AllOfDescriptor, ArrayDescriptor, FunctionMetadata, ObjectDescriptor, ParameterMetadata,
    PrimitiveDescriptor, ReferenceDescriptor, ResponseMetadata, ScalarKind, SchemaBinding,
    SharedTypeDictionary, TypeDescriptor, ValueConstraint, TYPE_TAG_ALL_OF, TYPE_TAG_ARRAY,
    TYPE_TAG_OBJECT, TYPE_TAG_REFERENCE,
};

/// One descriptor node in the flat document form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataTypeDocument {
    #[serde(rename = "type")]
    pub type_: u32,
    pub is_nullable: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<Box<DataTypeDocument>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, DataTypeDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<DataTypeDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int_enum_values: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_enum_values: Option<Vec<String>>,
}

impl DataTypeDocument {
    pub fn from_descriptor(descriptor: &TypeDescriptor) -> DataTypeDocument {
        match descriptor {
            TypeDescriptor::Primitive(p) => {
                let (int_enum_values, string_enum_values) = match &p.constraint {
                    Some(ValueConstraint::IntEnum(values)) => (Some(values.clone()), None),
                    Some(ValueConstraint::StringEnum(values)) => (None, Some(values.clone())),
                    None => (None, None),
                };
                DataTypeDocument {
                    type_: p.scalar.type_tag(),
                    is_nullable: p.is_nullable,
                    description: p.description.clone(),
                    int_enum_values,
                    string_enum_values,
                    ..Default::default()
                }
            }
            TypeDescriptor::Array(a) => DataTypeDocument {
                type_: TYPE_TAG_ARRAY,
                is_nullable: a.is_nullable,
                description: a.description.clone(),
                item_type: Some(Box::new(Self::from_descriptor(&a.item))),
                ..Default::default()
            },
            TypeDescriptor::Object(o) => DataTypeDocument {
                type_: TYPE_TAG_OBJECT,
                is_nullable: o.is_nullable,
                description: o.description.clone(),
                properties: o
                    .properties
                    .iter()
                    .map(|(name, prop)| (name.clone(), Self::from_descriptor(prop)))
                    .collect(),
                required: o.required.clone(),
                qualified_name: o.qualified_name.clone(),
                ..Default::default()
            },
            TypeDescriptor::Reference(r) => DataTypeDocument {
                type_: TYPE_TAG_REFERENCE,
                is_nullable: r.is_nullable,
                description: r.description.clone(),
                reference: Some(r.key.clone()),
                ..Default::default()
            },
            TypeDescriptor::AllOf(a) => DataTypeDocument {
                type_: TYPE_TAG_ALL_OF,
                is_nullable: a.is_nullable,
                description: a.description.clone(),
                qualified_name: a.qualified_name.clone(),
                all_of: a.branches.iter().map(Self::from_descriptor).collect(),
                ..Default::default()
            },
        }
    }

    pub fn to_descriptor(&self) -> Result<TypeDescriptor, DecodeError> {
        if let Some(scalar) = ScalarKind::from_type_tag(self.type_) {
            let constraint = match (&self.int_enum_values, &self.string_enum_values) {
                (Some(_), Some(_)) => return Err(DecodeError::ConflictingEnumValues),
                (Some(values), None) => Some(ValueConstraint::IntEnum(values.clone())),
                (None, Some(values)) => Some(ValueConstraint::StringEnum(values.clone())),
                (None, None) => None,
            };
            return Ok(TypeDescriptor::Primitive(PrimitiveDescriptor {
                scalar,
                is_nullable: self.is_nullable,
                description: self.description.clone(),
                constraint,
            }));
        }

        match self.type_ {
            TYPE_TAG_ARRAY => {
                let item = self.item_type.as_ref().ok_or(DecodeError::MissingItemType)?;
                Ok(TypeDescriptor::Array(ArrayDescriptor {
                    item: Box::new(item.to_descriptor()?),
                    is_nullable: self.is_nullable,
                    description: self.description.clone(),
                }))
            }
            TYPE_TAG_OBJECT => {
                let mut properties = IndexMap::new();
                for (name, prop) in &self.properties {
                    properties.insert(name.clone(), prop.to_descriptor()?);
                }
                Ok(TypeDescriptor::Object(ObjectDescriptor {
                    properties,
                    required: self.required.clone(),
                    qualified_name: self.qualified_name.clone(),
                    is_nullable: self.is_nullable,
                    description: self.description.clone(),
                }))
            }
            TYPE_TAG_REFERENCE => {
                let key = self.reference.clone().ok_or(DecodeError::MissingReference)?;
                Ok(TypeDescriptor::Reference(ReferenceDescriptor {
                    key,
                    is_nullable: self.is_nullable,
                    description: self.description.clone(),
                }))
            }
            TYPE_TAG_ALL_OF => {
                let branches = self
                    .all_of
                    .iter()
                    .map(|branch| branch.to_descriptor())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeDescriptor::AllOf(AllOfDescriptor {
                    branches,
                    qualified_name: self.qualified_name.clone(),
                    is_nullable: self.is_nullable,
                    description: self.description.clone(),
                }))
            }
            other => Err(DecodeError::UnknownTypeTag(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDocument {
    pub name: String,
    pub is_required: bool,
    pub data_type: DataTypeDocument,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    pub value_type: DataTypeDocument,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaBindingDocument {
    pub category: String,
    pub name: String,
    pub version: u64,
}

fn default_enabled() -> bool {
    true
}

/// The complete per-function document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMetadataDocument {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaBindingDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDocument>,
    pub response: ResponseDocument,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub types: IndexMap<String, DataTypeDocument>,
}

impl FunctionMetadataDocument {
    pub fn from_metadata(metadata: &FunctionMetadata) -> FunctionMetadataDocument {
        FunctionMetadataDocument {
            id: metadata.id.clone(),
            is_enabled: metadata.is_enabled,
            schema: metadata.schema.as_ref().map(|s| SchemaBindingDocument {
                category: s.category.clone(),
                name: s.name.clone(),
                version: s.version,
            }),
            parameters: metadata
                .parameters
                .iter()
                .map(|p| ParameterDocument {
                    name: p.name.clone(),
                    is_required: p.is_required,
                    data_type: DataTypeDocument::from_descriptor(&p.data_type),
                    description: p.description.clone(),
                })
                .collect(),
            response: ResponseDocument {
                value_type: DataTypeDocument::from_descriptor(&metadata.response.value_type),
                description: metadata.response.description.clone(),
            },
            types: metadata
                .types
                .iter()
                .map(|(key, descriptor)| (key.clone(), DataTypeDocument::from_descriptor(descriptor)))
                .collect(),
        }
    }

    pub fn to_metadata(&self) -> Result<FunctionMetadata, DecodeError> {
        let mut types = SharedTypeDictionary::new();
        for (key, doc) in &self.types {
            types.register(key.clone(), doc.to_descriptor()?);
        }
        Ok(FunctionMetadata {
            id: self.id.clone(),
            is_enabled: self.is_enabled,
            schema: self.schema.as_ref().map(|s| SchemaBinding {
                category: s.category.clone(),
                name: s.name.clone(),
                version: s.version,
            }),
            parameters: self
                .parameters
                .iter()
                .map(|p| {
                    Ok(ParameterMetadata {
                        name: p.name.clone(),
                        is_required: p.is_required,
                        data_type: p.data_type.to_descriptor()?,
                        description: p.description.clone(),
                    })
                })
                .collect::<Result<Vec<_>, DecodeError>>()?,
            response: ResponseMetadata {
                value_type: self.response.value_type.to_descriptor()?,
                description: self.response.description.clone(),
            },
            types,
        })
    }
}

/// Parse a function document from JSON text.
pub fn parse_document(content: &str) -> Result<FunctionMetadataDocument, DecodeError> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(nullable: bool) -> TypeDescriptor {
        TypeDescriptor::Primitive(PrimitiveDescriptor {
            scalar: ScalarKind::Int,
            is_nullable: nullable,
            description: String::new(),
            constraint: None,
        })
    }

    #[test]
    fn test_scalar_document_shape() {
        let doc = DataTypeDocument::from_descriptor(&int(true));
        assert_eq!(doc.type_, 7);
        assert!(doc.is_nullable);
        assert!(doc.item_type.is_none());

        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["type"], 7);
        assert_eq!(json["isNullable"], true);
        assert!(json.get("properties").is_none(), "empty fields are omitted");
    }

    #[test]
    fn test_array_document_requires_item() {
        let doc = DataTypeDocument {
            type_: TYPE_TAG_ARRAY,
            ..Default::default()
        };
        assert!(matches!(
            doc.to_descriptor(),
            Err(DecodeError::MissingItemType)
        ));
    }

    #[test]
    fn test_reference_document_requires_key() {
        let doc = DataTypeDocument {
            type_: TYPE_TAG_REFERENCE,
            ..Default::default()
        };
        assert!(matches!(
            doc.to_descriptor(),
            Err(DecodeError::MissingReference)
        ));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let doc = DataTypeDocument {
            type_: 9,
            ..Default::default()
        };
        assert!(matches!(
            doc.to_descriptor(),
            Err(DecodeError::UnknownTypeTag(9))
        ));
    }

    #[test]
    fn test_conflicting_enum_values_rejected() {
        let doc = DataTypeDocument {
            type_: 7,
            int_enum_values: Some(vec![1]),
            string_enum_values: Some(vec!["a".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            doc.to_descriptor(),
            Err(DecodeError::ConflictingEnumValues)
        ));
    }

    #[test]
    fn test_enum_constraint_round_trip() {
        let descriptor = TypeDescriptor::Primitive(PrimitiveDescriptor {
            scalar: ScalarKind::String,
            is_nullable: false,
            description: "sort order".to_string(),
            constraint: Some(ValueConstraint::StringEnum(vec![
                "asc".to_string(),
                "desc".to_string(),
            ])),
        });
        let doc = DataTypeDocument::from_descriptor(&descriptor);
        assert_eq!(doc.to_descriptor().expect("decode"), descriptor);
    }

    #[test]
    fn test_nested_object_round_trip() {
        let mut properties = IndexMap::new();
        properties.insert("count".to_string(), int(false));
        properties.insert(
            "tags".to_string(),
            TypeDescriptor::Array(ArrayDescriptor {
                item: Box::new(TypeDescriptor::Reference(ReferenceDescriptor {
                    key: "com.example.Tag".to_string(),
                    is_nullable: false,
                    description: String::new(),
                })),
                is_nullable: true,
                description: String::new(),
            }),
        );
        let descriptor = TypeDescriptor::Object(ObjectDescriptor {
            properties,
            required: vec!["count".to_string()],
            qualified_name: Some("com.example.Page".to_string()),
            is_nullable: true,
            description: String::new(),
        });

        let doc = DataTypeDocument::from_descriptor(&descriptor);
        let json = serde_json::to_string(&doc).expect("serialize");
        let parsed: DataTypeDocument = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.to_descriptor().expect("decode"), descriptor);
    }
}
