//! Core type definitions for the function metadata model
//!
//! Everything here is plain data: the compiler produces these values and the
//! downstream emitters consume them without reflection. `TypeDescriptor` is a
//! closed tagged union; `SharedTypeDictionary` is the deduplicated registry of
//! composite shapes that `Reference` descriptors point into.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Scalar kinds in the closed primitive set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Unit,
    Boolean,
    Bytes,
    Int,
    Long,
    Float,
    Double,
    String,
    PendingIntent,
}

/// Wire tag for an object descriptor.
pub const TYPE_TAG_OBJECT: u32 = 3;
/// Wire tag for an array descriptor.
pub const TYPE_TAG_ARRAY: u32 = 10;
/// Wire tag for a reference descriptor.
pub const TYPE_TAG_REFERENCE: u32 = 11;
/// Wire tag for an all-of descriptor.
pub const TYPE_TAG_ALL_OF: u32 = 12;

impl ScalarKind {
    /// Stable wire tag carried by both downstream encodings.
    pub fn type_tag(&self) -> u32 {
        match self {
            ScalarKind::Unit => 0,
            ScalarKind::Boolean => 1,
            ScalarKind::Bytes => 2,
            ScalarKind::Double => 4,
            ScalarKind::Float => 5,
            ScalarKind::Long => 6,
            ScalarKind::Int => 7,
            ScalarKind::String => 8,
            ScalarKind::PendingIntent => 13,
        }
    }

    /// Inverse of [`type_tag`](Self::type_tag). Returns `None` for tags that
    /// do not name a scalar (object/array/reference/all-of and unknown values).
    pub fn from_type_tag(tag: u32) -> Option<ScalarKind> {
        match tag {
            0 => Some(ScalarKind::Unit),
            1 => Some(ScalarKind::Boolean),
            2 => Some(ScalarKind::Bytes),
            4 => Some(ScalarKind::Double),
            5 => Some(ScalarKind::Float),
            6 => Some(ScalarKind::Long),
            7 => Some(ScalarKind::Int),
            8 => Some(ScalarKind::String),
            13 => Some(ScalarKind::PendingIntent),
            _ => None,
        }
    }
}

/// Value-constraint set attached to a primitive descriptor by the
/// enum-of-ints / enum-of-strings markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueConstraint {
    IntEnum(Vec<i64>),
    StringEnum(Vec<String>),
}

/// A single scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveDescriptor {
    pub scalar: ScalarKind,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ValueConstraint>,
}

/// An ordered collection. The item descriptor is constrained by the compiler
/// to be a `Primitive` or a `Reference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayDescriptor {
    pub item: Box<TypeDescriptor>,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A structured record shape with named, ordered properties.
///
/// The property map is never empty for a genuine record; only the synthetic
/// placeholder used for forward-declared schema responses may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub properties: IndexMap<String, TypeDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A weak link into the shared type dictionary. Every reference key has a
/// corresponding dictionary entry by the time resolution completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    pub key: String,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// "This value satisfies all of these shapes simultaneously." Used for
/// records that inherit data and/or capability supertypes. Branches are
/// `Object` or `Reference` descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllOfDescriptor {
    pub branches: Vec<TypeDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// The closed descriptor union produced by type resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDescriptor {
    Primitive(PrimitiveDescriptor),
    Array(ArrayDescriptor),
    Object(ObjectDescriptor),
    Reference(ReferenceDescriptor),
    AllOf(AllOfDescriptor),
}

impl TypeDescriptor {
    pub fn is_nullable(&self) -> bool {
        match self {
            TypeDescriptor::Primitive(p) => p.is_nullable,
            TypeDescriptor::Array(a) => a.is_nullable,
            TypeDescriptor::Object(o) => o.is_nullable,
            TypeDescriptor::Reference(r) => r.is_nullable,
            TypeDescriptor::AllOf(a) => a.is_nullable,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            TypeDescriptor::Primitive(p) => &p.description,
            TypeDescriptor::Array(a) => &a.description,
            TypeDescriptor::Object(o) => &o.description,
            TypeDescriptor::Reference(r) => &r.description,
            TypeDescriptor::AllOf(a) => &a.description,
        }
    }
}

/// Deduplicated registry of composite type shapes, keyed by stable type key.
///
/// Keys are registered at most once: the first registration wins and the
/// stored descriptor is never mutated afterwards. Iteration order is the
/// order in which shapes were first encountered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedTypeDictionary {
    entries: IndexMap<String, TypeDescriptor>,
}

impl SharedTypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Register a shape under `key`. Returns `false` (and leaves the existing
    /// entry untouched) if the key is already present.
    pub fn register(&mut self, key: impl Into<String>, descriptor: TypeDescriptor) -> bool {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, descriptor);
        true
    }

    pub fn get(&self, key: &str) -> Option<&TypeDescriptor> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TypeDescriptor)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Schema binding for functions that implement a predefined schema
/// definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBinding {
    pub category: String,
    pub name: String,
    pub version: u64,
}

/// One function parameter, in declaration order. The implicit invocation
/// context parameter is never represented here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    pub name: String,
    pub is_required: bool,
    pub data_type: TypeDescriptor,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// The response shape of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub value_type: TypeDescriptor,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Complete metadata for one annotated function or schema definition.
/// Created once per declaration; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Stable identity: `EnclosingType#member` for plain functions,
    /// `category/name/version` for schema definitions.
    pub id: String,
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaBinding>,
    pub parameters: Vec<ParameterMetadata>,
    pub response: ResponseMetadata,
    /// Shapes referenced by `Reference` descriptors anywhere in this
    /// function's parameter or response trees.
    pub types: SharedTypeDictionary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_tags_round_trip() {
        let kinds = [
            ScalarKind::Unit,
            ScalarKind::Boolean,
            ScalarKind::Bytes,
            ScalarKind::Int,
            ScalarKind::Long,
            ScalarKind::Float,
            ScalarKind::Double,
            ScalarKind::String,
            ScalarKind::PendingIntent,
        ];
        for kind in kinds {
            assert_eq!(ScalarKind::from_type_tag(kind.type_tag()), Some(kind));
        }
        assert_eq!(ScalarKind::from_type_tag(3), None, "3 is the object tag");
        assert_eq!(ScalarKind::from_type_tag(9), None);
        assert_eq!(ScalarKind::from_type_tag(99), None);
    }

    #[test]
    fn test_dictionary_first_registration_wins() {
        let mut dict = SharedTypeDictionary::new();
        let first = TypeDescriptor::Primitive(PrimitiveDescriptor {
            scalar: ScalarKind::Int,
            is_nullable: true,
            description: String::new(),
            constraint: None,
        });
        let second = TypeDescriptor::Primitive(PrimitiveDescriptor {
            scalar: ScalarKind::String,
            is_nullable: true,
            description: String::new(),
            constraint: None,
        });

        assert!(dict.register("com.example.A", first.clone()));
        assert!(!dict.register("com.example.A", second));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get("com.example.A"), Some(&first));
    }

    #[test]
    fn test_dictionary_preserves_insertion_order() {
        let mut dict = SharedTypeDictionary::new();
        for name in ["c.Z", "a.M", "b.A"] {
            dict.register(
                name,
                TypeDescriptor::Primitive(PrimitiveDescriptor {
                    scalar: ScalarKind::Unit,
                    is_nullable: true,
                    description: String::new(),
                    constraint: None,
                }),
            );
        }
        let keys: Vec<_> = dict.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["c.Z", "a.M", "b.A"]);
    }
}
