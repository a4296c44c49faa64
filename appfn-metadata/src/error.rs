//! Error types for wire decoding

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unknown data type tag: {0}")]
    UnknownTypeTag(u32),

    #[error("Array type is missing its item type")]
    MissingItemType,

    #[error("Reference type is missing its target key")]
    MissingReference,

    #[error("Data type carries both int and string enum values")]
    ConflictingEnumValues,

    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Missing XML element: <{0}>")]
    MissingElement(String),

    #[error("Unexpected XML element: <{0}>")]
    UnexpectedElement(String),

    #[error("Malformed value in <{element}>: {value}")]
    MalformedValue { element: String, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
