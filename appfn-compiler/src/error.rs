//! The single error kind raised by the metadata engine
//!
//! Every failure is fail-fast and attributed: the driver catches
//! `ProcessingError` at the top level, logs it with its source location, and
//! aborts generation for the compilation unit. There is no
//! warning-and-continue path.

use std::fmt;

use strsim::levenshtein;
use thiserror::Error;

/// Where in the processed source a failure is attributed.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceLocation {
    Declaration(String),
    Function {
        declaration: String,
        function: String,
    },
    Parameter {
        function: String,
        parameter: String,
    },
    Property {
        declaration: String,
        property: String,
    },
    TypeReference(String),
    OptionKey(String),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Declaration(name) => write!(f, "declaration {}", name),
            SourceLocation::Function {
                declaration,
                function,
            } => write!(f, "function {}#{}", declaration, function),
            SourceLocation::Parameter {
                function,
                parameter,
            } => write!(f, "parameter '{}' of {}", parameter, function),
            SourceLocation::Property {
                declaration,
                property,
            } => write!(f, "property '{}' of {}", property, declaration),
            SourceLocation::TypeReference(name) => write!(f, "type reference {}", name),
            SourceLocation::OptionKey(key) => write!(f, "option '{}'", key),
        }
    }
}

/// A compile-time user-facing diagnostic, never a runtime condition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} [{location}]")]
pub struct ProcessingError {
    pub message: String,
    pub location: SourceLocation,
}

impl ProcessingError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> ProcessingError {
        ProcessingError {
            message: message.into(),
            location,
        }
    }
}

/// Suggest the closest candidate for a misspelled name, if any candidate is
/// within edit distance 3. Adapted for single-suggestion diagnostics.
pub fn suggest_closest(name: &str, candidates: &[&str]) -> Option<String> {
    let mut best: Option<(usize, &str)> = None;
    for &candidate in candidates {
        if candidate == name {
            continue;
        }
        let distance = levenshtein(name, candidate);
        if distance <= 3 && best.map(|(d, _)| distance < d).unwrap_or(true) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, candidate)| candidate.to_string())
}
