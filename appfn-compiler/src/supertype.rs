//! Supertype resolution and property reconciliation
//!
//! Splits a record's declared supertypes into data supertypes (records with
//! structural identity of their own) and capability supertypes (pure
//! property contracts, possibly reached transitively through plain
//! interfaces). The two kinds are mutually exclusive for any one type. The
//! reconciliation pass then accounts for every supertype property against
//! the subtype's constructor parameters.

use indexmap::IndexSet;

use crate::annotations::{SCHEMA_CAPABILITY, SERIALIZABLE_RECORD};
use crate::declaration::{Declaration, DeclarationStore, TypeRef};
use crate::docs::extract_param_descriptions;
use crate::error::{ProcessingError, SourceLocation};
use crate::validate::{validate_record, PropertyDeclaration};

/// Declared supertypes, split by kind.
#[derive(Debug, Clone, Default)]
pub struct SupertypeSplit {
    pub data: Vec<TypeRef>,
    pub capabilities: Vec<TypeRef>,
}

impl SupertypeSplit {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.capabilities.is_empty()
    }
}

fn lookup<'a>(
    store: &'a dyn DeclarationStore,
    type_ref: &TypeRef,
    subtype: &Declaration,
) -> Result<&'a Declaration, ProcessingError> {
    store.lookup(&type_ref.qualified_name).ok_or_else(|| {
        ProcessingError::new(
            format!("Unknown supertype {}", type_ref.qualified_name),
            SourceLocation::Declaration(subtype.qualified_name.clone()),
        )
    })
}

/// Split the immediate supertypes of `declaration` into data and capability
/// kinds, searching capability contracts transitively through plain
/// interfaces but never past a record boundary.
pub fn split_supertypes(
    declaration: &Declaration,
    store: &dyn DeclarationStore,
) -> Result<SupertypeSplit, ProcessingError> {
    let mut split = SupertypeSplit::default();
    let mut seen_data: IndexSet<String> = IndexSet::new();
    let mut seen_capabilities: IndexSet<String> = IndexSet::new();

    for supertype in &declaration.supertypes {
        let super_decl = lookup(store, supertype, declaration)?;
        let is_record = super_decl.has_annotation(SERIALIZABLE_RECORD);
        let is_capability = super_decl.has_annotation(SCHEMA_CAPABILITY);

        if is_record && is_capability {
            return Err(ProcessingError::new(
                format!(
                    "Supertype {} is annotated as both a serializable record and a capability",
                    super_decl.qualified_name
                ),
                SourceLocation::Declaration(declaration.qualified_name.clone()),
            ));
        }
        if is_record {
            if seen_data.insert(super_decl.qualified_name.clone()) {
                split.data.push(supertype.clone());
            }
            continue;
        }
        if is_capability {
            if seen_capabilities.insert(super_decl.qualified_name.clone()) {
                split.capabilities.push(supertype.clone());
            }
            continue;
        }

        let found = collect_capabilities(
            super_decl,
            store,
            declaration,
            &mut split.capabilities,
            &mut seen_capabilities,
        )?;
        if found == 0 {
            return Err(ProcessingError::new(
                format!(
                    "Supertype {} is neither a serializable record nor a capability",
                    super_decl.qualified_name
                ),
                SourceLocation::Declaration(declaration.qualified_name.clone()),
            ));
        }
    }

    for data_name in &seen_data {
        if seen_capabilities.contains(data_name) {
            return Err(ProcessingError::new(
                format!(
                    "Supertype {} is reachable as both a data supertype and a capability",
                    data_name
                ),
                SourceLocation::Declaration(declaration.qualified_name.clone()),
            ));
        }
    }

    Ok(split)
}

fn collect_capabilities(
    interface_decl: &Declaration,
    store: &dyn DeclarationStore,
    subtype: &Declaration,
    capabilities: &mut Vec<TypeRef>,
    seen: &mut IndexSet<String>,
) -> Result<usize, ProcessingError> {
    let mut found = 0;
    for supertype in &interface_decl.supertypes {
        let super_decl = lookup(store, supertype, subtype)?;
        if super_decl.has_annotation(SERIALIZABLE_RECORD) {
            // Data boundary: capabilities past a record belong to that
            // record's own resolution, not to this subtype.
            continue;
        }
        if super_decl.has_annotation(SCHEMA_CAPABILITY) {
            found += 1;
            if seen.insert(super_decl.qualified_name.clone()) {
                capabilities.push(supertype.clone());
            }
        }
        found += collect_capabilities(super_decl, store, subtype, capabilities, seen)?;
    }
    Ok(found)
}

/// One data supertype with its validated constructor property list.
#[derive(Debug, Clone)]
pub struct DataSupertype {
    pub type_ref: TypeRef,
    pub properties: Vec<PropertyDeclaration>,
}

/// One capability supertype with its declared property contract.
#[derive(Debug, Clone)]
pub struct CapabilitySupertype {
    pub type_ref: TypeRef,
    pub properties: Vec<PropertyDeclaration>,
}

/// The outcome of property reconciliation: each supertype with the
/// properties it claims, plus the subtype-owned remainder in constructor
/// order.
#[derive(Debug, Clone)]
pub struct ReconciledSupertypes {
    pub data: Vec<DataSupertype>,
    pub capabilities: Vec<CapabilitySupertype>,
    pub own: Vec<PropertyDeclaration>,
}

/// Account for every supertype property against the subtype's constructor
/// parameters. Every data-supertype constructor parameter and every
/// capability property must appear among the subtype's parameters; whatever
/// remains unclaimed belongs to the subtype directly.
pub fn reconcile(
    declaration: &Declaration,
    split: &SupertypeSplit,
    own_properties: &[PropertyDeclaration],
    store: &dyn DeclarationStore,
    allow_interfaces: bool,
) -> Result<ReconciledSupertypes, ProcessingError> {
    let mut unclaimed: IndexSet<String> =
        own_properties.iter().map(|p| p.name.clone()).collect();

    let mut data = Vec::with_capacity(split.data.len());
    for type_ref in &split.data {
        let super_decl = lookup(store, type_ref, declaration)?;
        let properties = validate_record(super_decl, store, allow_interfaces)?;
        for property in &properties {
            if !unclaimed.shift_remove(&property.name) {
                return Err(ProcessingError::new(
                    format!(
                        "Constructor is missing parameter '{}' required by supertype {}",
                        property.name, super_decl.qualified_name
                    ),
                    SourceLocation::Declaration(declaration.qualified_name.clone()),
                ));
            }
        }
        data.push(DataSupertype {
            type_ref: type_ref.clone(),
            properties,
        });
    }

    let mut capabilities = Vec::with_capacity(split.capabilities.len());
    for type_ref in &split.capabilities {
        let super_decl = lookup(store, type_ref, declaration)?;
        let descriptions =
            extract_param_descriptions(super_decl.doc.as_deref().unwrap_or(""));
        let mut properties = Vec::with_capacity(super_decl.properties.len());
        for property in &super_decl.properties {
            if !unclaimed.shift_remove(&property.name) {
                return Err(ProcessingError::new(
                    format!(
                        "Constructor is missing property '{}' required by capability {}",
                        property.name, super_decl.qualified_name
                    ),
                    SourceLocation::Declaration(declaration.qualified_name.clone()),
                ));
            }
            properties.push(PropertyDeclaration {
                name: property.name.clone(),
                type_ref: property.type_ref.clone(),
                is_required: true,
                description: descriptions.get(&property.name).cloned().unwrap_or_default(),
                is_generic: property.type_ref.has_unresolved_parameter(),
                annotations: property.annotations.clone(),
            });
        }
        capabilities.push(CapabilitySupertype {
            type_ref: type_ref.clone(),
            properties,
        });
    }

    let own = own_properties
        .iter()
        .filter(|p| unclaimed.contains(&p.name))
        .cloned()
        .collect();

    Ok(ReconciledSupertypes {
        data,
        capabilities,
        own,
    })
}
