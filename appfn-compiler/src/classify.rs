//! Type classification
//!
//! Maps a raw type reference onto the closed 9-category lattice. Category
//! predicates are not mutually exclusive by naming alone, so they are tried
//! in a fixed priority order: scalar, primitive array, proxy, primitive
//! list, proxy list, serializable list, serializable record, capability
//! interface, capability list.

use appfn_metadata::ScalarKind;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::annotations::{SCHEMA_CAPABILITY, SERIALIZABLE_RECORD};
use crate::declaration::{DeclarationStore, TypeRef};
use crate::error::{suggest_closest, ProcessingError, SourceLocation};
use crate::proxy::ProxyRegistry;

/// The list type recognized for list categories.
pub const LIST_TYPE: &str = "kotlin.collections.List";

/// Fixed allow-list of scalar types.
static SCALAR_TYPES: Lazy<IndexMap<&'static str, ScalarKind>> = Lazy::new(|| {
    IndexMap::from([
        ("kotlin.Unit", ScalarKind::Unit),
        ("kotlin.Boolean", ScalarKind::Boolean),
        ("kotlin.Int", ScalarKind::Int),
        ("kotlin.Long", ScalarKind::Long),
        ("kotlin.Float", ScalarKind::Float),
        ("kotlin.Double", ScalarKind::Double),
        ("kotlin.String", ScalarKind::String),
        ("kotlin.ByteArray", ScalarKind::Bytes),
        ("android.app.PendingIntent", ScalarKind::PendingIntent),
    ])
});

/// Fixed allow-list of primitive array types, mapped to their item kind.
static ARRAY_TYPES: Lazy<IndexMap<&'static str, ScalarKind>> = Lazy::new(|| {
    IndexMap::from([
        ("kotlin.IntArray", ScalarKind::Int),
        ("kotlin.LongArray", ScalarKind::Long),
        ("kotlin.FloatArray", ScalarKind::Float),
        ("kotlin.DoubleArray", ScalarKind::Double),
        ("kotlin.BooleanArray", ScalarKind::Boolean),
    ])
});

/// The category a type reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    PrimitiveSingular(ScalarKind),
    PrimitiveArray(ScalarKind),
    PrimitiveList(ScalarKind),
    ProxySingular,
    ProxyList,
    SerializableSingular,
    SerializableList,
    InterfaceSingular,
    InterfaceList,
}

pub struct TypeClassifier<'a> {
    store: &'a dyn DeclarationStore,
    proxies: ProxyRegistry<'a>,
}

impl<'a> TypeClassifier<'a> {
    pub fn new(store: &'a dyn DeclarationStore) -> TypeClassifier<'a> {
        TypeClassifier {
            store,
            proxies: ProxyRegistry::new(store),
        }
    }

    /// Classify a type reference, failing with an attributed diagnostic when
    /// no category predicate matches. Nullability is a side channel read off
    /// the reference by callers; it never affects the category.
    pub fn classify(&self, type_ref: &TypeRef) -> Result<TypeCategory, ProcessingError> {
        if type_ref.is_type_parameter {
            return Err(self.unsupported(type_ref));
        }
        let name = type_ref.qualified_name.as_str();

        if type_ref.type_arguments.is_empty() {
            if let Some(&scalar) = SCALAR_TYPES.get(name) {
                return Ok(TypeCategory::PrimitiveSingular(scalar));
            }
            if let Some(&scalar) = ARRAY_TYPES.get(name) {
                return Ok(TypeCategory::PrimitiveArray(scalar));
            }
        }

        if let Some(element) = self.list_element(type_ref) {
            // A list: classify by its element, proxy before record as above.
            if element.type_arguments.is_empty() {
                if let Some(&scalar) = SCALAR_TYPES.get(element.qualified_name.as_str()) {
                    return Ok(TypeCategory::PrimitiveList(scalar));
                }
            }
            if self.proxies.is_proxy_shaped(element) {
                return Ok(TypeCategory::ProxyList);
            }
            if self.is_serializable(&element.qualified_name) {
                return Ok(TypeCategory::SerializableList);
            }
            if self.is_capability(&element.qualified_name) {
                return Ok(TypeCategory::InterfaceList);
            }
            return Err(self.unsupported(element));
        }

        if self.proxies.is_proxy_shaped(type_ref) {
            return Ok(TypeCategory::ProxySingular);
        }
        if self.is_serializable(name) {
            return Ok(TypeCategory::SerializableSingular);
        }
        if self.is_capability(name) {
            return Ok(TypeCategory::InterfaceSingular);
        }

        Err(self.unsupported(type_ref))
    }

    /// Permissive existence check used by validators. Interface categories
    /// only count as supported while processing schema definitions.
    pub fn is_supported_type(&self, type_ref: &TypeRef, allow_interfaces: bool) -> bool {
        match self.classify(type_ref) {
            Ok(TypeCategory::InterfaceSingular) | Ok(TypeCategory::InterfaceList) => {
                allow_interfaces
            }
            Ok(_) => true,
            Err(_) => false,
        }
    }

    /// Build the unsupported-type diagnostic, rendering the allow-list and a
    /// closest-candidate suggestion when one exists.
    pub fn unsupported(&self, type_ref: &TypeRef) -> ProcessingError {
        let scalars: Vec<&str> = SCALAR_TYPES.keys().copied().collect();
        let arrays: Vec<&str> = ARRAY_TYPES.keys().copied().collect();
        let mut message = format!(
            "Unsupported type '{}'. Supported types are: {}; primitive arrays {}; \
             List<...> of a supported element; serializable records; capability \
             interfaces; and proxy types",
            type_ref.qualified_name,
            scalars.join(", "),
            arrays.join(", "),
        );

        let mut candidates = scalars;
        candidates.extend(arrays);
        candidates.push(LIST_TYPE);
        if let Some(suggestion) = suggest_closest(&type_ref.qualified_name, &candidates) {
            message.push_str(&format!(". Did you mean '{}'?", suggestion));
        }

        ProcessingError::new(
            message,
            SourceLocation::TypeReference(type_ref.qualified_name.clone()),
        )
    }

    fn list_element<'t>(&self, type_ref: &'t TypeRef) -> Option<&'t TypeRef> {
        if type_ref.qualified_name == LIST_TYPE && type_ref.type_arguments.len() == 1 {
            Some(&type_ref.type_arguments[0])
        } else {
            None
        }
    }

    fn is_serializable(&self, qualified_name: &str) -> bool {
        self.store
            .lookup(qualified_name)
            .map(|d| d.has_annotation(SERIALIZABLE_RECORD))
            .unwrap_or(false)
    }

    fn is_capability(&self, qualified_name: &str) -> bool {
        self.store
            .lookup(qualified_name)
            .map(|d| d.has_annotation(SCHEMA_CAPABILITY))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::SERIALIZABLE_PROXY;
    use crate::declaration::{
        AnnotationValue, AnnotationView, Declaration, InMemoryDeclarations, Visibility,
    };

    fn bare_declaration(qualified_name: &str, annotations: Vec<AnnotationView>) -> Declaration {
        Declaration {
            simple_name: qualified_name.rsplit('.').next().unwrap().to_string(),
            qualified_name: qualified_name.to_string(),
            package_name: String::new(),
            visibility: Visibility::Public,
            constructor: None,
            properties: Vec::new(),
            supertypes: Vec::new(),
            annotations,
            type_parameters: Vec::new(),
            doc: None,
            functions: Vec::new(),
            companion_functions: Vec::new(),
        }
    }

    fn store_with_note() -> InMemoryDeclarations {
        InMemoryDeclarations::new().with(bare_declaration(
            "com.example.Note",
            vec![AnnotationView::new(SERIALIZABLE_RECORD)],
        ))
    }

    fn list_of(element: TypeRef) -> TypeRef {
        TypeRef::named(LIST_TYPE).of(vec![element])
    }

    #[test]
    fn test_scalar_classification() {
        let store = InMemoryDeclarations::new();
        let classifier = TypeClassifier::new(&store);
        assert_eq!(
            classifier.classify(&TypeRef::named("kotlin.Int")).unwrap(),
            TypeCategory::PrimitiveSingular(ScalarKind::Int)
        );
        assert_eq!(
            classifier
                .classify(&TypeRef::named("kotlin.ByteArray"))
                .unwrap(),
            TypeCategory::PrimitiveSingular(ScalarKind::Bytes),
            "ByteArray is the bytes scalar, not an array"
        );
        assert_eq!(
            classifier
                .classify(&TypeRef::named("android.app.PendingIntent"))
                .unwrap(),
            TypeCategory::PrimitiveSingular(ScalarKind::PendingIntent)
        );
    }

    #[test]
    fn test_primitive_array_classification() {
        let store = InMemoryDeclarations::new();
        let classifier = TypeClassifier::new(&store);
        assert_eq!(
            classifier
                .classify(&TypeRef::named("kotlin.IntArray"))
                .unwrap(),
            TypeCategory::PrimitiveArray(ScalarKind::Int)
        );
    }

    #[test]
    fn test_list_classifications() {
        let store = store_with_note();
        let classifier = TypeClassifier::new(&store);
        assert_eq!(
            classifier
                .classify(&list_of(TypeRef::named("kotlin.String")))
                .unwrap(),
            TypeCategory::PrimitiveList(ScalarKind::String)
        );
        assert_eq!(
            classifier
                .classify(&list_of(TypeRef::named("com.example.Note")))
                .unwrap(),
            TypeCategory::SerializableList
        );
        assert_eq!(
            classifier
                .classify(&list_of(TypeRef::named("java.time.Instant")))
                .unwrap(),
            TypeCategory::ProxyList
        );
    }

    #[test]
    fn test_serializable_and_capability() {
        let store = store_with_note().with(bare_declaration(
            "com.example.HasOwner",
            vec![AnnotationView::new(SCHEMA_CAPABILITY)],
        ));
        let classifier = TypeClassifier::new(&store);
        assert_eq!(
            classifier
                .classify(&TypeRef::named("com.example.Note"))
                .unwrap(),
            TypeCategory::SerializableSingular
        );
        assert_eq!(
            classifier
                .classify(&TypeRef::named("com.example.HasOwner"))
                .unwrap(),
            TypeCategory::InterfaceSingular
        );
        assert_eq!(
            classifier
                .classify(&list_of(TypeRef::named("com.example.HasOwner")))
                .unwrap(),
            TypeCategory::InterfaceList
        );
    }

    #[test]
    fn test_proxy_wins_over_serializable() {
        // Inconsistently annotated: both proxy and record. Proxy is tried
        // first, so it must win.
        let store = InMemoryDeclarations::new().with(bare_declaration(
            "com.example.Odd",
            vec![
                AnnotationView::new(SERIALIZABLE_PROXY).with_argument(
                    "targetType",
                    AnnotationValue::Str("java.time.Duration".to_string()),
                ),
                AnnotationView::new(SERIALIZABLE_RECORD),
            ],
        ));
        let classifier = TypeClassifier::new(&store);
        assert_eq!(
            classifier
                .classify(&TypeRef::named("com.example.Odd"))
                .unwrap(),
            TypeCategory::ProxySingular
        );
    }

    #[test]
    fn test_interface_support_gated() {
        let store = InMemoryDeclarations::new().with(bare_declaration(
            "com.example.HasOwner",
            vec![AnnotationView::new(SCHEMA_CAPABILITY)],
        ));
        let classifier = TypeClassifier::new(&store);
        let interface = TypeRef::named("com.example.HasOwner");
        assert!(classifier.is_supported_type(&interface, true));
        assert!(!classifier.is_supported_type(&interface, false));
        assert!(classifier.is_supported_type(&TypeRef::named("kotlin.Int"), false));
    }

    #[test]
    fn test_unsupported_type_diagnostic() {
        let store = InMemoryDeclarations::new();
        let classifier = TypeClassifier::new(&store);
        let error = classifier
            .classify(&TypeRef::named("kotlin.Itn"))
            .expect_err("must fail");
        assert!(error.message.contains("kotlin.Int"), "allow-list rendered");
        assert!(error.message.contains("Did you mean 'kotlin.Int'?"));
    }

    #[test]
    fn test_unparameterized_list_unsupported() {
        let store = InMemoryDeclarations::new();
        let classifier = TypeClassifier::new(&store);
        assert!(classifier.classify(&TypeRef::named(LIST_TYPE)).is_err());
    }

    #[test]
    fn test_type_parameter_unsupported() {
        let store = InMemoryDeclarations::new();
        let classifier = TypeClassifier::new(&store);
        assert!(classifier.classify(&TypeRef::parameter("T")).is_err());
    }
}
