//! Typed function-metadata model for AppFn
//!
//! This crate provides the metadata model produced by the AppFn compiler
//! (the `TypeDescriptor` union, per-function metadata records, and the
//! shared type dictionary) together with the two wire encodings consumed at
//! runtime: a flat integer-tagged document form and an XML element tree.

pub mod document;
pub mod error;
pub mod types;
pub mod xml;

pub use document::*;
pub use error::*;
pub use types::*;
