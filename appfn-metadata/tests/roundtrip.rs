//! Wire round-trip coverage: every descriptor variant must survive
//! encode/decode through both the flat document form and the XML form.

use indexmap::IndexMap;

use appfn_metadata::document::{DataTypeDocument, FunctionMetadataDocument};
use appfn_metadata::types::{
    AllOfDescriptor, ArrayDescriptor, FunctionMetadata, ObjectDescriptor, ParameterMetadata,
    PrimitiveDescriptor, ReferenceDescriptor, ResponseMetadata, ScalarKind, SchemaBinding,
    SharedTypeDictionary, TypeDescriptor, ValueConstraint,
};
use appfn_metadata::xml::{
    parse_data_type_xml, parse_metadata_xml, write_data_type_xml, write_metadata_xml,
};

fn primitive(scalar: ScalarKind) -> TypeDescriptor {
    TypeDescriptor::Primitive(PrimitiveDescriptor {
        scalar,
        is_nullable: false,
        description: String::new(),
        constraint: None,
    })
}

fn reference(key: &str, nullable: bool) -> TypeDescriptor {
    TypeDescriptor::Reference(ReferenceDescriptor {
        key: key.to_string(),
        is_nullable: nullable,
        description: String::new(),
    })
}

fn representative_descriptors() -> Vec<TypeDescriptor> {
    let scalars = [
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
    let mut descriptors: Vec<TypeDescriptor> = scalars.into_iter().map(primitive).collect();

    descriptors.push(TypeDescriptor::Primitive(PrimitiveDescriptor {
        scalar: ScalarKind::Int,
        is_nullable: true,
        description: "priority bucket".to_string(),
        constraint: Some(ValueConstraint::IntEnum(vec![1, 2, 3])),
    }));
    descriptors.push(TypeDescriptor::Primitive(PrimitiveDescriptor {
        scalar: ScalarKind::String,
        is_nullable: false,
        description: String::new(),
        constraint: Some(ValueConstraint::StringEnum(vec![
            "asc".to_string(),
            "desc".to_string(),
        ])),
    }));

    // Array of primitive and array of reference.
    descriptors.push(TypeDescriptor::Array(ArrayDescriptor {
        item: Box::new(primitive(ScalarKind::Long)),
        is_nullable: false,
        description: "timestamps".to_string(),
    }));
    descriptors.push(TypeDescriptor::Array(ArrayDescriptor {
        item: Box::new(reference("com.example.Attachment", false)),
        is_nullable: true,
        description: String::new(),
    }));

    // Object with two properties and a required subset.
    let mut properties = IndexMap::new();
    properties.insert("title".to_string(), primitive(ScalarKind::String));
    properties.insert(
        "body".to_string(),
        TypeDescriptor::Primitive(PrimitiveDescriptor {
            scalar: ScalarKind::String,
            is_nullable: true,
            description: "free text".to_string(),
            constraint: None,
        }),
    );
    descriptors.push(TypeDescriptor::Object(ObjectDescriptor {
        properties,
        required: vec!["title".to_string()],
        qualified_name: Some("com.example.Note".to_string()),
        is_nullable: true,
        description: "a note".to_string(),
    }));

    // Empty placeholder object.
    descriptors.push(TypeDescriptor::Object(ObjectDescriptor {
        properties: IndexMap::new(),
        required: Vec::new(),
        qualified_name: None,
        is_nullable: true,
        description: String::new(),
    }));

    descriptors.push(reference("com.example.Note", true));

    // AllOf with a reference branch and an object branch.
    let mut own = IndexMap::new();
    own.insert("dueAt".to_string(), primitive(ScalarKind::Long));
    descriptors.push(TypeDescriptor::AllOf(AllOfDescriptor {
        branches: vec![
            reference("com.example.Note", false),
            TypeDescriptor::Object(ObjectDescriptor {
                properties: own,
                required: vec!["dueAt".to_string()],
                qualified_name: None,
                is_nullable: false,
                description: String::new(),
            }),
        ],
        qualified_name: Some("com.example.Reminder".to_string()),
        is_nullable: true,
        description: String::new(),
    }));

    descriptors
}

#[test]
fn test_document_round_trip_every_variant() {
    for descriptor in representative_descriptors() {
        let doc = DataTypeDocument::from_descriptor(&descriptor);
        let json = serde_json::to_string(&doc).expect("serialize document");
        let parsed: DataTypeDocument = serde_json::from_str(&json).expect("parse document");
        let decoded = parsed.to_descriptor().expect("decode document");
        assert_eq!(decoded, descriptor, "document round-trip for {:?}", descriptor);
    }
}

#[test]
fn test_xml_round_trip_every_variant() {
    for descriptor in representative_descriptors() {
        let text = write_data_type_xml(&descriptor);
        let decoded = parse_data_type_xml(&text).expect("decode XML");
        assert_eq!(decoded, descriptor, "XML round-trip for:\n{}", text);
    }
}

#[test]
fn test_description_with_markup_survives_xml() {
    let descriptor = TypeDescriptor::Primitive(PrimitiveDescriptor {
        scalar: ScalarKind::String,
        is_nullable: false,
        description: "query such as \"a < b & c\"".to_string(),
        constraint: None,
    });
    let text = write_data_type_xml(&descriptor);
    assert_eq!(parse_data_type_xml(&text).expect("decode"), descriptor);
}

fn sample_metadata() -> FunctionMetadata {
    let mut note_properties = IndexMap::new();
    note_properties.insert("title".to_string(), primitive(ScalarKind::String));
    note_properties.insert(
        "starred".to_string(),
        primitive(ScalarKind::Boolean),
    );

    let mut types = SharedTypeDictionary::new();
    types.register(
        "com.example.Note",
        TypeDescriptor::Object(ObjectDescriptor {
            properties: note_properties,
            required: vec!["title".to_string(), "starred".to_string()],
            qualified_name: Some("com.example.Note".to_string()),
            is_nullable: true,
            description: String::new(),
        }),
    );

    FunctionMetadata {
        id: "com.example.NoteFunctions#createNote".to_string(),
        is_enabled: true,
        schema: Some(SchemaBinding {
            category: "notes".to_string(),
            name: "createNote".to_string(),
            version: 2,
        }),
        parameters: vec![
            ParameterMetadata {
                name: "title".to_string(),
                is_required: true,
                data_type: primitive(ScalarKind::String),
                description: "the note title".to_string(),
            },
            ParameterMetadata {
                name: "attachments".to_string(),
                is_required: false,
                data_type: TypeDescriptor::Array(ArrayDescriptor {
                    item: Box::new(reference("com.example.Note", false)),
                    is_nullable: true,
                    description: String::new(),
                }),
                description: String::new(),
            },
        ],
        response: ResponseMetadata {
            value_type: reference("com.example.Note", false),
            description: "the created note".to_string(),
        },
        types,
    }
}

#[test]
fn test_function_document_round_trip() {
    let metadata = sample_metadata();
    let doc = FunctionMetadataDocument::from_metadata(&metadata);
    let json = serde_json::to_string_pretty(&doc).expect("serialize");
    let parsed: FunctionMetadataDocument = serde_json::from_str(&json).expect("parse");
    assert_eq!(parsed.to_metadata().expect("decode"), metadata);
}

#[test]
fn test_function_xml_round_trip() {
    let metadata = sample_metadata();
    let text = write_metadata_xml(&metadata);
    let decoded = parse_metadata_xml(&text).expect("decode");
    assert_eq!(decoded, metadata);
}

#[test]
fn test_dictionary_order_survives_both_encodings() {
    let mut types = SharedTypeDictionary::new();
    for key in ["z.Last", "a.First", "m.Middle"] {
        types.register(
            key,
            TypeDescriptor::Object(ObjectDescriptor {
                properties: IndexMap::new(),
                required: Vec::new(),
                qualified_name: Some(key.to_string()),
                is_nullable: true,
                description: String::new(),
            }),
        );
    }
    let metadata = FunctionMetadata {
        id: "com.example.Fns#noop".to_string(),
        is_enabled: false,
        schema: None,
        parameters: Vec::new(),
        response: ResponseMetadata {
            value_type: primitive(ScalarKind::Unit),
            description: String::new(),
        },
        types,
    };

    let through_document = FunctionMetadataDocument::from_metadata(&metadata)
        .to_metadata()
        .expect("document decode");
    let through_xml = parse_metadata_xml(&write_metadata_xml(&metadata)).expect("xml decode");

    let expected: Vec<_> = metadata.types.keys().cloned().collect();
    let document_keys: Vec<_> = through_document.types.keys().cloned().collect();
    let xml_keys: Vec<_> = through_xml.types.keys().cloned().collect();
    assert_eq!(document_keys, expected);
    assert_eq!(xml_keys, expected);
}
