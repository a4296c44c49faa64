//! Compiler option parsing
//!
//! Options arrive as raw string key/value pairs from the build system.
//! Boolean values are strict: anything other than `true`/`false` (ASCII
//! case-insensitive) is a hard failure.

use crate::error::{ProcessingError, SourceLocation};

/// When false, extracted doc descriptions are dropped from all produced
/// metadata.
pub const INCLUDE_DESCRIPTIONS: &str = "appfn.includeDescriptions";

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOptions {
    pub include_descriptions: bool,
}

impl Default for CompilerOptions {
    fn default() -> CompilerOptions {
        CompilerOptions {
            include_descriptions: true,
        }
    }
}

impl CompilerOptions {
    /// Parse options from raw pairs. Unknown keys are ignored; they belong
    /// to other processors sharing the same option map.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<CompilerOptions, ProcessingError> {
        let mut options = CompilerOptions::default();
        for (key, value) in pairs {
            if key == INCLUDE_DESCRIPTIONS {
                options.include_descriptions = parse_bool(key, value)?;
            }
        }
        Ok(options)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ProcessingError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ProcessingError::new(
            format!("Expected 'true' or 'false', got '{}'", value),
            SourceLocation::OptionKey(key.to_string()),
        ))
    }
}
