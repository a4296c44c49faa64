//! Metadata construction
//!
//! The central recursive descent: resolves every parameter, response, and
//! property type reference into a `TypeDescriptor`, expanding composite
//! types into the shared dictionary exactly once per stable key. The
//! dictionary and the seen-set are owned by one top-level construction call
//! and threaded through every recursion explicitly; a failure anywhere
//! aborts the whole pass with no partial result.

use std::collections::HashSet;

use appfn_metadata::{
    AllOfDescriptor, ArrayDescriptor, FunctionMetadata, ObjectDescriptor, ParameterMetadata,
    PrimitiveDescriptor, ReferenceDescriptor, ResponseMetadata, ScalarKind, SchemaBinding,
    SharedTypeDictionary, TypeDescriptor, ValueConstraint,
};
use indexmap::IndexMap;

use crate::annotations::{
    value_constraint_from, FunctionMarker, RecordMarker, SchemaMarker, FUNCTION_CONTEXT,
};
use crate::classify::{TypeCategory, TypeClassifier};
use crate::declaration::{
    Declaration, DeclarationStore, FunctionDeclaration, ParameterView, TypeRef,
};
use crate::docs::{extract_param_descriptions, extract_response_description, sanitize};
use crate::error::{ProcessingError, SourceLocation};
use crate::options::CompilerOptions;
use crate::proxy::{ProxyRegistry, ProxyResolution};
use crate::supertype::{reconcile, split_supertypes};
use crate::validate::{validate_record, PropertyDeclaration};

/// Stable dictionary key for a (possibly parameterized) composite type.
/// Distinct instantiations of a generic record occupy distinct entries, and
/// argument nullability is part of the instantiation.
pub fn type_key(qualified_name: &str, arguments: &[TypeRef]) -> String {
    if arguments.is_empty() {
        return qualified_name.to_string();
    }
    let rendered: Vec<String> = arguments.iter().map(render_argument).collect();
    format!("{}<{}>", qualified_name, rendered.join(", "))
}

fn render_argument(argument: &TypeRef) -> String {
    let mut rendered = type_key(&argument.qualified_name, &argument.type_arguments);
    if argument.is_nullable {
        rendered.push('?');
    }
    rendered
}

pub struct MetadataBuilder<'a> {
    store: &'a dyn DeclarationStore,
    classifier: TypeClassifier<'a>,
    proxies: ProxyRegistry<'a>,
    options: CompilerOptions,
}

impl<'a> MetadataBuilder<'a> {
    pub fn new(store: &'a dyn DeclarationStore) -> MetadataBuilder<'a> {
        Self::with_options(store, CompilerOptions::default())
    }

    pub fn with_options(
        store: &'a dyn DeclarationStore,
        options: CompilerOptions,
    ) -> MetadataBuilder<'a> {
        MetadataBuilder {
            store,
            classifier: TypeClassifier::new(store),
            proxies: ProxyRegistry::new(store),
            options,
        }
    }

    /// Assemble complete metadata for one annotated function declaration.
    pub fn build_function(
        &self,
        enclosing: &Declaration,
        function: &FunctionDeclaration,
    ) -> Result<FunctionMetadata, ProcessingError> {
        let location = SourceLocation::Function {
            declaration: enclosing.qualified_name.clone(),
            function: function.simple_name.clone(),
        };
        let marker = FunctionMarker::from_annotations(&function.annotations).ok_or_else(|| {
            ProcessingError::new(
                "Function does not carry the app-function marker",
                location.clone(),
            )
        })?;
        let schema = SchemaMarker::from_annotations(&function.annotations, &location)?;

        // Interface-typed values are only legal inside schema definitions.
        let allow_interfaces = schema.is_some();
        let id = match &schema {
            Some(schema) => format!("{}/{}/{}", schema.category, schema.name, schema.version),
            None => format!("{}#{}", enclosing.qualified_name, function.simple_name),
        };

        let (descriptions, response_description) =
            if marker.described_by_doc && self.options.include_descriptions {
                let doc = function.doc.as_deref().unwrap_or("");
                (
                    extract_param_descriptions(doc),
                    extract_response_description(doc),
                )
            } else {
                (IndexMap::new(), String::new())
            };

        let function_name = format!("{}#{}", enclosing.qualified_name, function.simple_name);
        let mut dictionary = SharedTypeDictionary::new();
        let mut seen = HashSet::new();

        let parameters = self.build_parameter_list(
            &function_name,
            &function.parameters,
            &descriptions,
            &mut dictionary,
            &mut seen,
            allow_interfaces,
        )?;
        let value_type = self.build_response_type(
            &function.return_type,
            &response_description,
            &mut dictionary,
            &mut seen,
            allow_interfaces,
        )?;

        tracing::debug!(
            "built metadata for {} ({} parameters, {} shared types)",
            id,
            parameters.len(),
            dictionary.len()
        );

        Ok(FunctionMetadata {
            id,
            is_enabled: marker.is_enabled,
            schema: schema.map(|schema| SchemaBinding {
                category: schema.category,
                name: schema.name,
                version: schema.version,
            }),
            parameters,
            response: ResponseMetadata {
                value_type,
                description: response_description,
            },
            types: dictionary,
        })
    }

    /// Resolve an ordered parameter list. The leading invocation-context
    /// parameter is elided; it is never represented in metadata.
    pub fn build_parameter_list(
        &self,
        function_name: &str,
        parameters: &[ParameterView],
        descriptions: &IndexMap<String, String>,
        dictionary: &mut SharedTypeDictionary,
        seen: &mut HashSet<String>,
        allow_interfaces: bool,
    ) -> Result<Vec<ParameterMetadata>, ProcessingError> {
        let mut resolved = Vec::with_capacity(parameters.len());
        for (index, parameter) in parameters.iter().enumerate() {
            if index == 0 && parameter.type_ref.qualified_name == FUNCTION_CONTEXT {
                continue;
            }
            let location = SourceLocation::Parameter {
                function: function_name.to_string(),
                parameter: parameter.name.clone(),
            };
            if parameter.type_ref.has_unresolved_parameter() {
                return Err(ProcessingError::new(
                    "Parameter type names an unresolved type parameter",
                    location,
                ));
            }
            let constraint = value_constraint_from(&parameter.annotations, &location)?;
            let description = descriptions
                .get(&parameter.name)
                .cloned()
                .unwrap_or_default();
            let data_type = self.resolve(
                &parameter.type_ref,
                &description,
                constraint,
                dictionary,
                seen,
                allow_interfaces,
            )?;
            resolved.push(ParameterMetadata {
                name: parameter.name.clone(),
                is_required: !parameter.has_default,
                data_type,
                description,
            });
        }
        Ok(resolved)
    }

    /// Resolve a function's response type.
    pub fn build_response_type(
        &self,
        return_type: &TypeRef,
        description: &str,
        dictionary: &mut SharedTypeDictionary,
        seen: &mut HashSet<String>,
        allow_interfaces: bool,
    ) -> Result<TypeDescriptor, ProcessingError> {
        if return_type.has_unresolved_parameter() {
            return Err(ProcessingError::new(
                "Response type names an unresolved type parameter",
                SourceLocation::TypeReference(return_type.qualified_name.clone()),
            ));
        }
        self.resolve(
            return_type,
            description,
            None,
            dictionary,
            seen,
            allow_interfaces,
        )
    }

    fn resolve(
        &self,
        type_ref: &TypeRef,
        description: &str,
        constraint: Option<ValueConstraint>,
        dictionary: &mut SharedTypeDictionary,
        seen: &mut HashSet<String>,
        allow_interfaces: bool,
    ) -> Result<TypeDescriptor, ProcessingError> {
        let category = self.classifier.classify(type_ref)?;

        if !allow_interfaces
            && matches!(
                category,
                TypeCategory::InterfaceSingular | TypeCategory::InterfaceList
            )
        {
            return Err(ProcessingError::new(
                format!(
                    "Capability interface {} may only be used by schema definitions",
                    type_ref.qualified_name
                ),
                SourceLocation::TypeReference(type_ref.qualified_name.clone()),
            ));
        }

        match category {
            TypeCategory::PrimitiveSingular(scalar) => {
                let constraint = check_constraint(constraint, scalar, type_ref)?;
                Ok(TypeDescriptor::Primitive(PrimitiveDescriptor {
                    scalar,
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                    constraint,
                }))
            }
            TypeCategory::PrimitiveArray(scalar) => {
                let constraint = check_constraint(constraint, scalar, type_ref)?;
                Ok(TypeDescriptor::Array(ArrayDescriptor {
                    item: Box::new(TypeDescriptor::Primitive(PrimitiveDescriptor {
                        scalar,
                        is_nullable: false,
                        description: String::new(),
                        constraint,
                    })),
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
            TypeCategory::PrimitiveList(scalar) => {
                let element = &type_ref.type_arguments[0];
                let constraint = check_constraint(constraint, scalar, type_ref)?;
                Ok(TypeDescriptor::Array(ArrayDescriptor {
                    item: Box::new(TypeDescriptor::Primitive(PrimitiveDescriptor {
                        scalar,
                        is_nullable: element.is_nullable,
                        description: String::new(),
                        constraint,
                    })),
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
            TypeCategory::SerializableSingular => {
                reject_constraint(&constraint, type_ref)?;
                let key = self.register_composite(type_ref, dictionary, seen, allow_interfaces)?;
                Ok(TypeDescriptor::Reference(ReferenceDescriptor {
                    key,
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
            TypeCategory::SerializableList => {
                reject_constraint(&constraint, type_ref)?;
                let element = &type_ref.type_arguments[0];
                let key = self.register_composite(element, dictionary, seen, allow_interfaces)?;
                Ok(TypeDescriptor::Array(ArrayDescriptor {
                    item: Box::new(TypeDescriptor::Reference(ReferenceDescriptor {
                        key,
                        is_nullable: element.is_nullable,
                        description: String::new(),
                    })),
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
            TypeCategory::InterfaceSingular => {
                reject_constraint(&constraint, type_ref)?;
                let key = self.register_interface(type_ref, dictionary, seen, allow_interfaces)?;
                Ok(TypeDescriptor::Reference(ReferenceDescriptor {
                    key,
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
            TypeCategory::InterfaceList => {
                reject_constraint(&constraint, type_ref)?;
                let element = &type_ref.type_arguments[0];
                let key = self.register_interface(element, dictionary, seen, allow_interfaces)?;
                Ok(TypeDescriptor::Array(ArrayDescriptor {
                    item: Box::new(TypeDescriptor::Reference(ReferenceDescriptor {
                        key,
                        is_nullable: element.is_nullable,
                        description: String::new(),
                    })),
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
            TypeCategory::ProxySingular => {
                reject_constraint(&constraint, type_ref)?;
                let resolution = self.proxies.resolve_proxy_for(type_ref)?;
                let key = self.register_proxy(&resolution, dictionary, seen, allow_interfaces)?;
                Ok(TypeDescriptor::Reference(ReferenceDescriptor {
                    key,
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
            TypeCategory::ProxyList => {
                reject_constraint(&constraint, type_ref)?;
                let element = &type_ref.type_arguments[0];
                let resolution = self.proxies.resolve_proxy_for(element)?;
                let key = self.register_proxy(&resolution, dictionary, seen, allow_interfaces)?;
                Ok(TypeDescriptor::Array(ArrayDescriptor {
                    item: Box::new(TypeDescriptor::Reference(ReferenceDescriptor {
                        key,
                        is_nullable: element.is_nullable,
                        description: String::new(),
                    })),
                    is_nullable: type_ref.is_nullable,
                    description: description.to_string(),
                }))
            }
        }
    }

    /// Register a record shape in the dictionary, expanding it exactly once.
    /// The key is marked seen before any property is resolved so that
    /// self-referential and mutually-referential record graphs terminate.
    fn register_composite(
        &self,
        type_ref: &TypeRef,
        dictionary: &mut SharedTypeDictionary,
        seen: &mut HashSet<String>,
        allow_interfaces: bool,
    ) -> Result<String, ProcessingError> {
        let declaration = self
            .store
            .lookup(&type_ref.qualified_name)
            .ok_or_else(|| self.classifier.unsupported(type_ref))?;
        let bindings = bind_type_arguments(declaration, type_ref)?;
        let key = type_key(&declaration.qualified_name, &type_ref.type_arguments);

        if seen.contains(&key) {
            return Ok(key);
        }
        seen.insert(key.clone());
        tracing::debug!("registering composite type {}", key);

        let properties = validate_record(declaration, self.store, allow_interfaces)?;
        let description = match RecordMarker::from_annotations(&declaration.annotations) {
            Some(marker) if marker.described_by_doc && self.options.include_descriptions => {
                sanitize(declaration.doc.as_deref().unwrap_or(""))
            }
            _ => String::new(),
        };

        if declaration.supertypes.is_empty() {
            let object = self.object_from_properties(
                &properties,
                &bindings,
                &declaration.qualified_name,
                Some(key.clone()),
                true,
                description,
                dictionary,
                seen,
                allow_interfaces,
            )?;
            dictionary.register(key.clone(), object);
            return Ok(key);
        }

        let split = split_supertypes(declaration, self.store)?;
        let reconciled = reconcile(declaration, &split, &properties, self.store, allow_interfaces)?;

        let mut branches = Vec::new();
        for data_supertype in &reconciled.data {
            let super_ref = data_supertype.type_ref.substitute(&bindings);
            let super_key =
                self.register_composite(&super_ref, dictionary, seen, allow_interfaces)?;
            branches.push(TypeDescriptor::Reference(ReferenceDescriptor {
                key: super_key,
                is_nullable: false,
                description: String::new(),
            }));
        }
        for capability in &reconciled.capabilities {
            let branch = self.object_from_properties(
                &capability.properties,
                &bindings,
                &declaration.qualified_name,
                Some(capability.type_ref.qualified_name.clone()),
                false,
                String::new(),
                dictionary,
                seen,
                allow_interfaces,
            )?;
            branches.push(branch);
        }
        if !reconciled.own.is_empty() {
            let branch = self.object_from_properties(
                &reconciled.own,
                &bindings,
                &declaration.qualified_name,
                None,
                false,
                String::new(),
                dictionary,
                seen,
                allow_interfaces,
            )?;
            branches.push(branch);
        }

        dictionary.register(
            key.clone(),
            TypeDescriptor::AllOf(AllOfDescriptor {
                branches,
                qualified_name: Some(key.clone()),
                is_nullable: true,
                description,
            }),
        );
        Ok(key)
    }

    /// Register a capability interface's property contract as an object
    /// shape. An interface with no properties yet registers the empty
    /// placeholder used by forward-declared schema responses.
    fn register_interface(
        &self,
        type_ref: &TypeRef,
        dictionary: &mut SharedTypeDictionary,
        seen: &mut HashSet<String>,
        allow_interfaces: bool,
    ) -> Result<String, ProcessingError> {
        let declaration = self
            .store
            .lookup(&type_ref.qualified_name)
            .ok_or_else(|| self.classifier.unsupported(type_ref))?;
        let bindings = bind_type_arguments(declaration, type_ref)?;
        let key = type_key(&declaration.qualified_name, &type_ref.type_arguments);

        if seen.contains(&key) {
            return Ok(key);
        }
        seen.insert(key.clone());
        tracing::debug!("registering capability interface {}", key);

        let descriptions = if self.options.include_descriptions {
            extract_param_descriptions(declaration.doc.as_deref().unwrap_or(""))
        } else {
            IndexMap::new()
        };
        let properties: Vec<PropertyDeclaration> = declaration
            .properties
            .iter()
            .map(|property| PropertyDeclaration {
                name: property.name.clone(),
                type_ref: property.type_ref.clone(),
                is_required: true,
                description: descriptions.get(&property.name).cloned().unwrap_or_default(),
                is_generic: property.type_ref.has_unresolved_parameter(),
                annotations: property.annotations.clone(),
            })
            .collect();

        let description = if self.options.include_descriptions {
            sanitize(declaration.doc.as_deref().unwrap_or(""))
        } else {
            String::new()
        };
        let object = self.object_from_properties(
            &properties,
            &bindings,
            &declaration.qualified_name,
            Some(key.clone()),
            true,
            description,
            dictionary,
            seen,
            allow_interfaces,
        )?;
        dictionary.register(key.clone(), object);
        Ok(key)
    }

    /// Register a proxy's record shape under the proxy's own qualified name.
    fn register_proxy(
        &self,
        resolution: &ProxyResolution<'_>,
        dictionary: &mut SharedTypeDictionary,
        seen: &mut HashSet<String>,
        allow_interfaces: bool,
    ) -> Result<String, ProcessingError> {
        let declaration = resolution.declaration;
        let key = declaration.qualified_name.clone();

        if seen.contains(&key) {
            return Ok(key);
        }
        seen.insert(key.clone());
        tracing::debug!(
            "registering proxy {} for target {}",
            key,
            resolution.target
        );

        let properties = validate_record(declaration, self.store, allow_interfaces)?;
        let object = self.object_from_properties(
            &properties,
            &IndexMap::new(),
            &declaration.qualified_name,
            Some(key.clone()),
            true,
            String::new(),
            dictionary,
            seen,
            allow_interfaces,
        )?;
        dictionary.register(key.clone(), object);
        Ok(key)
    }

    #[allow(clippy::too_many_arguments)]
    fn object_from_properties(
        &self,
        properties: &[PropertyDeclaration],
        bindings: &IndexMap<String, TypeRef>,
        owner: &str,
        qualified_name: Option<String>,
        is_nullable: bool,
        description: String,
        dictionary: &mut SharedTypeDictionary,
        seen: &mut HashSet<String>,
        allow_interfaces: bool,
    ) -> Result<TypeDescriptor, ProcessingError> {
        let mut resolved = IndexMap::new();
        let mut required = Vec::new();
        for property in properties {
            let location = SourceLocation::Property {
                declaration: owner.to_string(),
                property: property.name.clone(),
            };
            let substituted = property.type_ref.substitute(bindings);
            if substituted.has_unresolved_parameter() {
                return Err(ProcessingError::new(
                    format!(
                        "Property type '{}' is an unresolved type parameter",
                        substituted.qualified_name
                    ),
                    location,
                ));
            }
            let constraint = value_constraint_from(&property.annotations, &location)?;
            let property_description = if self.options.include_descriptions {
                property.description.clone()
            } else {
                String::new()
            };
            let descriptor = self.resolve(
                &substituted,
                &property_description,
                constraint,
                dictionary,
                seen,
                allow_interfaces,
            )?;
            resolved.insert(property.name.clone(), descriptor);
            if property.is_required {
                required.push(property.name.clone());
            }
        }
        Ok(TypeDescriptor::Object(ObjectDescriptor {
            properties: resolved,
            required,
            qualified_name,
            is_nullable,
            description,
        }))
    }
}

fn bind_type_arguments(
    declaration: &Declaration,
    type_ref: &TypeRef,
) -> Result<IndexMap<String, TypeRef>, ProcessingError> {
    if type_ref.type_arguments.len() != declaration.type_parameters.len() {
        return Err(ProcessingError::new(
            format!(
                "Type {} declares {} type parameter(s) but {} argument(s) were supplied",
                declaration.qualified_name,
                declaration.type_parameters.len(),
                type_ref.type_arguments.len()
            ),
            SourceLocation::TypeReference(type_ref.qualified_name.clone()),
        ));
    }
    Ok(declaration
        .type_parameters
        .iter()
        .cloned()
        .zip(type_ref.type_arguments.iter().cloned())
        .collect())
}

fn check_constraint(
    constraint: Option<ValueConstraint>,
    scalar: ScalarKind,
    type_ref: &TypeRef,
) -> Result<Option<ValueConstraint>, ProcessingError> {
    match &constraint {
        Some(ValueConstraint::IntEnum(_)) if scalar != ScalarKind::Int => {
            Err(ProcessingError::new(
                "Int value constraints only apply to int-typed values",
                SourceLocation::TypeReference(type_ref.qualified_name.clone()),
            ))
        }
        Some(ValueConstraint::StringEnum(_)) if scalar != ScalarKind::String => {
            Err(ProcessingError::new(
                "String value constraints only apply to string-typed values",
                SourceLocation::TypeReference(type_ref.qualified_name.clone()),
            ))
        }
        _ => Ok(constraint),
    }
}

fn reject_constraint(
    constraint: &Option<ValueConstraint>,
    type_ref: &TypeRef,
) -> Result<(), ProcessingError> {
    if constraint.is_some() {
        return Err(ProcessingError::new(
            "Value constraints only apply to int and string values",
            SourceLocation::TypeReference(type_ref.qualified_name.clone()),
        ));
    }
    Ok(())
}
