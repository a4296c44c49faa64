//! Proxy resolution
//!
//! A proxy is a record standing in for an external type the engine cannot
//! inspect, bridged by a matched pair of conversion methods. Four well-known
//! targets ship with built-in proxy shapes; user proxies are declared with
//! the proxy marker and validated here before their shape is trusted.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::annotations::{ProxyMarker, SERIALIZABLE_PROXY};
use crate::declaration::{
    Constructor, Declaration, DeclarationStore, ParameterView, PropertyView, TypeRef, Visibility,
};
use crate::error::{ProcessingError, SourceLocation};

fn builtin_record(
    qualified_name: &str,
    simple_name: &str,
    fields: &[(&str, &str)],
) -> Declaration {
    let parameters = fields
        .iter()
        .map(|(name, type_name)| ParameterView {
            name: (*name).to_string(),
            type_ref: TypeRef::named(*type_name),
            has_default: false,
            annotations: Vec::new(),
        })
        .collect();
    let properties = fields
        .iter()
        .map(|(name, type_name)| PropertyView {
            name: (*name).to_string(),
            type_ref: TypeRef::named(*type_name),
            is_readable: true,
            annotations: Vec::new(),
        })
        .collect();
    Declaration {
        simple_name: simple_name.to_string(),
        qualified_name: qualified_name.to_string(),
        package_name: "appfn.types".to_string(),
        visibility: Visibility::Public,
        constructor: Some(Constructor {
            visibility: Visibility::Public,
            parameters,
        }),
        properties,
        supertypes: Vec::new(),
        annotations: Vec::new(),
        type_parameters: Vec::new(),
        doc: None,
        functions: Vec::new(),
        companion_functions: Vec::new(),
    }
}

/// Built-in proxy shapes, keyed by the target type they stand in for.
static BUILT_IN_PROXIES: Lazy<IndexMap<&'static str, Declaration>> = Lazy::new(|| {
    let mut proxies = IndexMap::new();
    proxies.insert(
        "java.time.LocalDateTime",
        builtin_record(
            "appfn.types.LocalDateTime",
            "LocalDateTime",
            &[
                ("year", "kotlin.Int"),
                ("month", "kotlin.Int"),
                ("dayOfMonth", "kotlin.Int"),
                ("hour", "kotlin.Int"),
                ("minute", "kotlin.Int"),
                ("second", "kotlin.Int"),
                ("nanoOfSecond", "kotlin.Int"),
            ],
        ),
    );
    proxies.insert(
        "java.time.Instant",
        builtin_record(
            "appfn.types.Instant",
            "Instant",
            &[
                ("epochSecond", "kotlin.Long"),
                ("nanoAdjustment", "kotlin.Int"),
            ],
        ),
    );
    proxies.insert(
        "java.time.ZoneId",
        builtin_record("appfn.types.ZoneId", "ZoneId", &[("id", "kotlin.String")]),
    );
    proxies.insert(
        "android.net.Uri",
        builtin_record(
            "appfn.types.Uri",
            "Uri",
            &[("uriString", "kotlin.String")],
        ),
    );
    proxies
});

/// True when `qualified_name` is an external type with a built-in proxy.
pub fn is_well_known_target(qualified_name: &str) -> bool {
    BUILT_IN_PROXIES.contains_key(qualified_name)
}

/// A resolved proxy: the record shape to register plus the identity of the
/// external type it stands in for.
#[derive(Debug, Clone)]
pub struct ProxyResolution<'a> {
    pub declaration: &'a Declaration,
    pub target: String,
}

pub struct ProxyRegistry<'a> {
    store: &'a dyn DeclarationStore,
}

impl<'a> ProxyRegistry<'a> {
    pub fn new(store: &'a dyn DeclarationStore) -> ProxyRegistry<'a> {
        ProxyRegistry { store }
    }

    /// True when a type reference resolves to a proxy: a well-known target,
    /// a declaration carrying the proxy marker, or the target of a declared
    /// proxy.
    pub fn is_proxy_shaped(&self, type_ref: &TypeRef) -> bool {
        let name = type_ref.qualified_name.as_str();
        if is_well_known_target(name) {
            return true;
        }
        if let Some(declaration) = self.store.lookup(name) {
            if declaration.has_annotation(SERIALIZABLE_PROXY) {
                return true;
            }
        }
        self.store.proxy_for_target(name).is_some()
    }

    /// Answer "what does this type's proxy look like structurally". User
    /// proxies have their conversion-method pair validated before the shape
    /// is handed out.
    pub fn resolve_proxy_for(
        &self,
        type_ref: &TypeRef,
    ) -> Result<ProxyResolution<'a>, ProcessingError> {
        let name = type_ref.qualified_name.as_str();

        if let Some(declaration) = BUILT_IN_PROXIES.get(name) {
            tracing::debug!("resolved built-in proxy for {}", name);
            return Ok(ProxyResolution {
                declaration,
                target: name.to_string(),
            });
        }

        if let Some(declaration) = self.store.lookup(name) {
            let location = SourceLocation::Declaration(declaration.qualified_name.clone());
            if let Some(marker) = ProxyMarker::from_annotations(&declaration.annotations, &location)?
            {
                self.validate_conversions(declaration, &marker.target_type)?;
                return Ok(ProxyResolution {
                    declaration,
                    target: marker.target_type,
                });
            }
        }

        if let Some(declaration) = self.store.proxy_for_target(name) {
            self.validate_conversions(declaration, name)?;
            return Ok(ProxyResolution {
                declaration,
                target: name.to_string(),
            });
        }

        Err(ProcessingError::new(
            format!("No proxy declaration found for type {}", name),
            SourceLocation::TypeReference(name.to_string()),
        ))
    }

    /// The proxy contract: exactly one zero-argument instance method
    /// producing the target type, and exactly one companion-scope method
    /// consuming the target type and producing the proxy type.
    fn validate_conversions(
        &self,
        declaration: &Declaration,
        target: &str,
    ) -> Result<(), ProcessingError> {
        let location = SourceLocation::Declaration(declaration.qualified_name.clone());

        let producing = declaration
            .functions
            .iter()
            .filter(|f| f.return_type.qualified_name == target && f.parameters.is_empty())
            .count();
        if producing != 1 {
            return Err(ProcessingError::new(
                format!(
                    "Proxy must declare exactly one zero-argument method returning {}; found {}",
                    target, producing
                ),
                location,
            ));
        }

        let converse = declaration
            .companion_functions
            .iter()
            .filter(|f| {
                f.parameters.len() == 1
                    && f.parameters[0].type_ref.qualified_name == target
                    && f.return_type.qualified_name == declaration.qualified_name
            })
            .count();
        if converse != 1 {
            return Err(ProcessingError::new(
                format!(
                    "Proxy must declare exactly one companion method taking {} and returning {}; found {}",
                    target, declaration.qualified_name, converse
                ),
                location,
            ));
        }

        tracing::debug!(
            "validated proxy {} for target {}",
            declaration.qualified_name,
            target
        );
        Ok(())
    }
}
