//! XML element tree form of the metadata model
//!
//! Mirrors the flat document form field-for-field, with every field carried
//! as a child element. The writer and reader are a plain tree-to-text
//! transcription; no XML library is involved.

pub mod reader;
pub mod writer;

use indexmap::IndexMap;

use crate::error::DecodeError;
use crate::types::{
    AllOfDescriptor, ArrayDescriptor, FunctionMetadata, ObjectDescriptor, ParameterMetadata,
    PrimitiveDescriptor, ReferenceDescriptor, ResponseMetadata, ScalarKind, SchemaBinding,
    SharedTypeDictionary, TypeDescriptor, ValueConstraint, TYPE_TAG_ALL_OF, TYPE_TAG_ARRAY,
    TYPE_TAG_OBJECT, TYPE_TAG_REFERENCE,
};

/// One XML element. An element carries either text content or child
/// elements, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> XmlElement {
        XmlElement {
            name: name.into(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> XmlElement {
        XmlElement {
            name: name.into(),
            text: text.into(),
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn require(&self, name: &str) -> Result<&XmlElement, DecodeError> {
        self.child(name)
            .ok_or_else(|| DecodeError::MissingElement(name.to_string()))
    }

    fn bool_child(&self, name: &str) -> Result<bool, DecodeError> {
        let element = self.require(name)?;
        match element.text.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(DecodeError::MalformedValue {
                element: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn text_child(&self, name: &str) -> String {
        self.child(name).map(|c| c.text.clone()).unwrap_or_default()
    }
}

fn number_element(name: &str, value: impl ToString) -> XmlElement {
    XmlElement::with_text(name, value.to_string())
}

fn bool_element(name: &str, value: bool) -> XmlElement {
    XmlElement::with_text(name, if value { "true" } else { "false" })
}

fn parse_number<T: std::str::FromStr>(element: &XmlElement) -> Result<T, DecodeError> {
    element
        .text
        .parse::<T>()
        .map_err(|_| DecodeError::MalformedValue {
            element: element.name.clone(),
            value: element.text.clone(),
        })
}

/// Transcribe one descriptor into a `<dataType>` element.
pub fn descriptor_to_element(descriptor: &TypeDescriptor) -> XmlElement {
    let mut element = XmlElement::new("dataType");
    match descriptor {
        TypeDescriptor::Primitive(p) => {
            element.push(number_element("type", p.scalar.type_tag()));
            element.push(bool_element("isNullable", p.is_nullable));
            if !p.description.is_empty() {
                element.push(XmlElement::with_text("description", &p.description));
            }
            match &p.constraint {
                Some(ValueConstraint::IntEnum(values)) => {
                    let mut list = XmlElement::new("intEnumValues");
                    for value in values {
                        list.push(number_element("value", value));
                    }
                    element.push(list);
                }
                Some(ValueConstraint::StringEnum(values)) => {
                    let mut list = XmlElement::new("stringEnumValues");
                    for value in values {
                        list.push(XmlElement::with_text("value", value));
                    }
                    element.push(list);
                }
                None => {}
            }
        }
        TypeDescriptor::Array(a) => {
            element.push(number_element("type", TYPE_TAG_ARRAY));
            element.push(bool_element("isNullable", a.is_nullable));
            if !a.description.is_empty() {
                element.push(XmlElement::with_text("description", &a.description));
            }
            let mut item = XmlElement::new("itemType");
            item.push(descriptor_to_element(&a.item));
            element.push(item);
        }
        TypeDescriptor::Object(o) => {
            element.push(number_element("type", TYPE_TAG_OBJECT));
            element.push(bool_element("isNullable", o.is_nullable));
            if !o.description.is_empty() {
                element.push(XmlElement::with_text("description", &o.description));
            }
            if !o.properties.is_empty() {
                let mut properties = XmlElement::new("properties");
                for (name, prop) in &o.properties {
                    let mut property = XmlElement::new("property");
                    property.push(XmlElement::with_text("name", name));
                    property.push(descriptor_to_element(prop));
                    properties.push(property);
                }
                element.push(properties);
            }
            if !o.required.is_empty() {
                let mut required = XmlElement::new("required");
                for name in &o.required {
                    required.push(XmlElement::with_text("name", name));
                }
                element.push(required);
            }
            if let Some(qualified_name) = &o.qualified_name {
                element.push(XmlElement::with_text("qualifiedName", qualified_name));
            }
        }
        TypeDescriptor::Reference(r) => {
            element.push(number_element("type", TYPE_TAG_REFERENCE));
            element.push(bool_element("isNullable", r.is_nullable));
            if !r.description.is_empty() {
                element.push(XmlElement::with_text("description", &r.description));
            }
            element.push(XmlElement::with_text("reference", &r.key));
        }
        TypeDescriptor::AllOf(a) => {
            element.push(number_element("type", TYPE_TAG_ALL_OF));
            element.push(bool_element("isNullable", a.is_nullable));
            if !a.description.is_empty() {
                element.push(XmlElement::with_text("description", &a.description));
            }
            let mut branches = XmlElement::new("allOf");
            for branch in &a.branches {
                branches.push(descriptor_to_element(branch));
            }
            element.push(branches);
            if let Some(qualified_name) = &a.qualified_name {
                element.push(XmlElement::with_text("qualifiedName", qualified_name));
            }
        }
    }
    element
}

/// Decode a `<dataType>` element back into a descriptor.
pub fn element_to_descriptor(element: &XmlElement) -> Result<TypeDescriptor, DecodeError> {
    if element.name != "dataType" {
        return Err(DecodeError::UnexpectedElement(element.name.clone()));
    }
    let tag: u32 = parse_number(element.require("type")?)?;
    let is_nullable = element.bool_child("isNullable")?;
    let description = element.text_child("description");

    if let Some(scalar) = ScalarKind::from_type_tag(tag) {
        let int_values = element.child("intEnumValues");
        let string_values = element.child("stringEnumValues");
        let constraint = match (int_values, string_values) {
            (Some(_), Some(_)) => return Err(DecodeError::ConflictingEnumValues),
            (Some(list), None) => Some(ValueConstraint::IntEnum(
                list.children_named("value")
                    .map(parse_number)
                    .collect::<Result<Vec<i64>, _>>()?,
            )),
            (None, Some(list)) => Some(ValueConstraint::StringEnum(
                list.children_named("value").map(|v| v.text.clone()).collect(),
            )),
            (None, None) => None,
        };
        return Ok(TypeDescriptor::Primitive(PrimitiveDescriptor {
            scalar,
            is_nullable,
            description,
            constraint,
        }));
    }

    match tag {
        TYPE_TAG_ARRAY => {
            let item = element
                .require("itemType")?
                .child("dataType")
                .ok_or(DecodeError::MissingItemType)?;
            Ok(TypeDescriptor::Array(ArrayDescriptor {
                item: Box::new(element_to_descriptor(item)?),
                is_nullable,
                description,
            }))
        }
        TYPE_TAG_OBJECT => {
            let mut properties = IndexMap::new();
            if let Some(list) = element.child("properties") {
                for property in list.children_named("property") {
                    let name = property.require("name")?.text.clone();
                    let data_type = element_to_descriptor(property.require("dataType")?)?;
                    properties.insert(name, data_type);
                }
            }
            let required = element
                .child("required")
                .map(|r| r.children_named("name").map(|n| n.text.clone()).collect())
                .unwrap_or_default();
            let qualified_name = element.child("qualifiedName").map(|q| q.text.clone());
            Ok(TypeDescriptor::Object(ObjectDescriptor {
                properties,
                required,
                qualified_name,
                is_nullable,
                description,
            }))
        }
        TYPE_TAG_REFERENCE => {
            let key = element
                .child("reference")
                .map(|r| r.text.clone())
                .ok_or(DecodeError::MissingReference)?;
            Ok(TypeDescriptor::Reference(ReferenceDescriptor {
                key,
                is_nullable,
                description,
            }))
        }
        TYPE_TAG_ALL_OF => {
            let branches = element
                .require("allOf")?
                .children_named("dataType")
                .map(element_to_descriptor)
                .collect::<Result<Vec<_>, _>>()?;
            let qualified_name = element.child("qualifiedName").map(|q| q.text.clone());
            Ok(TypeDescriptor::AllOf(AllOfDescriptor {
                branches,
                qualified_name,
                is_nullable,
                description,
            }))
        }
        other => Err(DecodeError::UnknownTypeTag(other)),
    }
}

/// Transcribe complete function metadata into a `<function>` element.
pub fn metadata_to_element(metadata: &FunctionMetadata) -> XmlElement {
    let mut element = XmlElement::new("function");
    element.push(XmlElement::with_text("id", &metadata.id));
    element.push(bool_element("isEnabled", metadata.is_enabled));

    if let Some(schema) = &metadata.schema {
        let mut schema_element = XmlElement::new("schema");
        schema_element.push(XmlElement::with_text("category", &schema.category));
        schema_element.push(XmlElement::with_text("name", &schema.name));
        schema_element.push(number_element("version", schema.version));
        element.push(schema_element);
    }

    if !metadata.parameters.is_empty() {
        let mut parameters = XmlElement::new("parameters");
        for parameter in &metadata.parameters {
            let mut parameter_element = XmlElement::new("parameter");
            parameter_element.push(XmlElement::with_text("name", &parameter.name));
            parameter_element.push(bool_element("isRequired", parameter.is_required));
            if !parameter.description.is_empty() {
                parameter_element.push(XmlElement::with_text("description", &parameter.description));
            }
            parameter_element.push(descriptor_to_element(&parameter.data_type));
            parameters.push(parameter_element);
        }
        element.push(parameters);
    }

    let mut response = XmlElement::new("response");
    if !metadata.response.description.is_empty() {
        response.push(XmlElement::with_text(
            "description",
            &metadata.response.description,
        ));
    }
    let mut value_type = XmlElement::new("valueType");
    value_type.push(descriptor_to_element(&metadata.response.value_type));
    response.push(value_type);
    element.push(response);

    if !metadata.types.is_empty() {
        let mut types = XmlElement::new("types");
        for (key, descriptor) in metadata.types.iter() {
            let mut entry = XmlElement::new("entry");
            entry.push(XmlElement::with_text("key", key));
            entry.push(descriptor_to_element(descriptor));
            types.push(entry);
        }
        element.push(types);
    }

    element
}

/// Decode a `<function>` element back into metadata.
pub fn element_to_metadata(element: &XmlElement) -> Result<FunctionMetadata, DecodeError> {
    if element.name != "function" {
        return Err(DecodeError::UnexpectedElement(element.name.clone()));
    }

    let schema = match element.child("schema") {
        Some(schema_element) => Some(SchemaBinding {
            category: schema_element.require("category")?.text.clone(),
            name: schema_element.require("name")?.text.clone(),
            version: parse_number(schema_element.require("version")?)?,
        }),
        None => None,
    };

    let mut parameters = Vec::new();
    if let Some(list) = element.child("parameters") {
        for parameter in list.children_named("parameter") {
            parameters.push(ParameterMetadata {
                name: parameter.require("name")?.text.clone(),
                is_required: parameter.bool_child("isRequired")?,
                data_type: element_to_descriptor(parameter.require("dataType")?)?,
                description: parameter.text_child("description"),
            });
        }
    }

    let response_element = element.require("response")?;
    let response = ResponseMetadata {
        value_type: element_to_descriptor(
            response_element
                .require("valueType")?
                .child("dataType")
                .ok_or_else(|| DecodeError::MissingElement("dataType".to_string()))?,
        )?,
        description: response_element.text_child("description"),
    };

    let mut types = SharedTypeDictionary::new();
    if let Some(list) = element.child("types") {
        for entry in list.children_named("entry") {
            let key = entry.require("key")?.text.clone();
            let descriptor = element_to_descriptor(entry.require("dataType")?)?;
            types.register(key, descriptor);
        }
    }

    Ok(FunctionMetadata {
        id: element.require("id")?.text.clone(),
        is_enabled: element.bool_child("isEnabled")?,
        schema,
        parameters,
        response,
        types,
    })
}

/// Render one descriptor as an XML document string.
pub fn write_data_type_xml(descriptor: &TypeDescriptor) -> String {
    writer::write_document(&descriptor_to_element(descriptor))
}

/// Parse a descriptor from XML text produced by [`write_data_type_xml`].
pub fn parse_data_type_xml(content: &str) -> Result<TypeDescriptor, DecodeError> {
    element_to_descriptor(&reader::parse_document(content)?)
}

/// Render complete function metadata as an XML document string.
pub fn write_metadata_xml(metadata: &FunctionMetadata) -> String {
    writer::write_document(&metadata_to_element(metadata))
}

/// Parse function metadata from XML text produced by [`write_metadata_xml`].
pub fn parse_metadata_xml(content: &str) -> Result<FunctionMetadata, DecodeError> {
    element_to_metadata(&reader::parse_document(content)?)
}
