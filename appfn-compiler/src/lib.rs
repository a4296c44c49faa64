//! Annotation-driven metadata resolution for AppFn functions
//!
//! This crate walks annotated declarations (app functions, serializable
//! records, capability interfaces, proxies, and schema definitions) and
//! derives the typed metadata model from `appfn-metadata`: parameter
//! descriptors, a response descriptor, and a deduplicated shared type
//! dictionary. A driver snapshots its compilation unit into
//! [`declaration::Declaration`] values, hands them to
//! [`builder::MetadataBuilder`], and treats any [`error::ProcessingError`]
//! as a compile-time diagnostic for the offending declaration.

pub mod annotations;
pub mod builder;
pub mod classify;
pub mod declaration;
pub mod docs;
pub mod error;
pub mod options;
pub mod proxy;
pub mod supertype;
pub mod validate;

pub use builder::{type_key, MetadataBuilder};
pub use classify::{TypeCategory, TypeClassifier};
pub use declaration::*;
pub use error::{ProcessingError, SourceLocation};
pub use options::CompilerOptions;
