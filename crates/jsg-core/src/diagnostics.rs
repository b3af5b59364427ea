use std::fmt;

/// Failed to build type declarations for a generation target.
pub const TYPE_DECLARATION_ERROR: &str = "JSG1000";
/// The emitter failed while producing artifact text.
pub const CODE_GENERATION_ERROR: &str = "JSG1001";
/// An inline schema source is not valid JSON.
pub const INVALID_SOURCE_ERROR: &str = "JSG1002";

/// A build problem surfaced to the host. Severity is always error: a
/// diagnostic means a source was dropped or a target produced no artifacts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    /// Stable code, one of the `JSG1xxx` constants.
    pub code: &'static str,
    pub message: String,
    /// The offending schema locator or source key, where one applies.
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn type_declaration(location: impl Into<String>, error: impl fmt::Display) -> Self {
        let location = location.into();
        Self {
            code: TYPE_DECLARATION_ERROR,
            message: format!("error adding type declarations for '{location}': {error}"),
            location: Some(location),
        }
    }

    pub fn code_generation(error: impl fmt::Display) -> Self {
        Self {
            code: CODE_GENERATION_ERROR,
            message: format!("error generating model code: {error}"),
            location: None,
        }
    }

    pub fn invalid_source(key: impl Into<String>, error: impl fmt::Display) -> Self {
        let key = key.into();
        Self {
            code: INVALID_SOURCE_ERROR,
            message: format!("inline schema source '{key}' is not valid JSON: {error}"),
            location: Some(key),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
