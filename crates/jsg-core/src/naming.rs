use heck::{ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase, ToSnakeCase};
use serde_json::Value;

use crate::graph::TypeDeclaration;

/// Name a declaration after its `$anchor`.
pub const WELL_KNOWN_ANCHOR: &str = "well-known-anchor";
/// Name a declaration after its `title` annotation.
pub const DOCUMENTATION_TITLE: &str = "documentation-title";
/// Name a declaration after the last segment of its locator.
pub const POINTER_SEGMENT: &str = "pointer-segment";

/// Heuristics switched off unless the host configures otherwise. Titles are
/// prose more often than identifiers, so they lose by default.
pub const DEFAULT_DISABLED_NAMING_HEURISTICS: &[&str] = &[DOCUMENTATION_TITLE];

/// A name with its casing variants pre-computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedName {
    pub original: String,
    pub pascal_case: String,
    pub camel_case: String,
    pub snake_case: String,
    pub screaming_snake: String,
}

impl std::fmt::Display for NormalizedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Create a [`NormalizedName`] from an arbitrary string.
pub fn normalize_name(name: &str) -> NormalizedName {
    let sanitized = sanitize_identifier(name);
    NormalizedName {
        original: name.to_string(),
        pascal_case: sanitized.to_pascal_case(),
        camel_case: sanitized.to_lower_camel_case(),
        snake_case: sanitized.to_snake_case(),
        screaming_snake: sanitized.to_shouty_snake_case(),
    }
}

/// Strip characters that cannot appear in an identifier and guard against
/// leading digits and empty input.
fn sanitize_identifier(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return "value".to_string();
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("n{cleaned}")
    } else {
        cleaned.to_string()
    }
}

/// Derive a declared name for a graph node, trying each heuristic in order
/// and skipping any named in `disabled`. The locator-segment heuristic is
/// the backstop and cannot be disabled into nothing: a node always gets a
/// name.
pub fn declared_name(declaration: &TypeDeclaration, disabled: &[String]) -> NormalizedName {
    let enabled = |heuristic: &str| !disabled.iter().any(|d| d == heuristic);

    if enabled(WELL_KNOWN_ANCHOR) {
        if let Some(anchor) = declaration.schema.get("$anchor").and_then(Value::as_str) {
            return normalize_name(anchor);
        }
    }
    if enabled(DOCUMENTATION_TITLE) {
        if let Some(title) = declaration.schema.get("title").and_then(Value::as_str) {
            return normalize_name(title);
        }
    }
    normalize_name(&locator_segment(declaration))
}

/// The trailing meaningful segment of a node's locator: the last fragment
/// token (with a numeric index folded into its parent keyword), or the
/// document's file stem for a root node.
fn locator_segment(declaration: &TypeDeclaration) -> String {
    if let Some(fragment) = declaration.location.fragment() {
        let tokens: Vec<&str> = fragment.split('/').filter(|t| !t.is_empty()).collect();
        if let Some(last) = tokens.last() {
            if last.chars().all(|c| c.is_ascii_digit()) && tokens.len() > 1 {
                return format!("{}{}", tokens[tokens.len() - 2], last);
            }
            return (*last).to_string();
        }
    }
    let uri = declaration.location.uri();
    let stem = uri.rsplit('/').next().unwrap_or(uri);
    stem.split('.').next().unwrap_or(stem).to_string()
}

/// When optional-name heuristics are enabled, a property named with an
/// `optional` affix is treated as optional and the affix is stripped for
/// the generated member. Returns the stripped remainder, or `None` when the
/// name carries no such affix.
pub fn optional_name_split(name: &str) -> Option<String> {
    let snake = name.to_snake_case();
    let stripped = snake
        .strip_prefix("optional_")
        .or_else(|| snake.strip_suffix("_optional"))?;
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_string())
}
