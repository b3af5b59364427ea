use indexmap::IndexMap;

use crate::naming::DEFAULT_DISABLED_NAMING_HEURISTICS;
use crate::vocabulary::Dialect;

/// Build-wide generation options, resolved once per build from the host's
/// flat key/value configuration and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Dialect assumed for documents that declare none.
    pub fallback_dialect: Dialect,
    /// Model an optional property as a nullable value rather than an
    /// absent-capable wrapper.
    pub optional_as_nullable: bool,
    /// Let naming heuristics infer optional semantics from names.
    pub use_optional_name_heuristics: bool,
    /// Treat `format` as a hard assertion rather than an annotation.
    pub always_assert_format: bool,
    /// Naming heuristics switched off for this build.
    pub disabled_naming_heuristics: Vec<String>,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            fallback_dialect: Dialect::LATEST,
            optional_as_nullable: true,
            use_optional_name_heuristics: true,
            always_assert_format: true,
            disabled_naming_heuristics: DEFAULT_DISABLED_NAMING_HEURISTICS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

pub const FALLBACK_DIALECT: &str = "fallback_dialect";
pub const OPTIONAL_AS_NULLABLE: &str = "optional_as_nullable";
pub const USE_OPTIONAL_NAME_HEURISTICS: &str = "use_optional_name_heuristics";
pub const ALWAYS_ASSERT_FORMAT: &str = "always_assert_format";
pub const DISABLED_NAMING_HEURISTICS: &str = "disabled_naming_heuristics";

/// Resolve host configuration into [`GlobalOptions`]. Total: unset keys take
/// their documented defaults, unknown dialect names fall back, and anything
/// other than `true`/`True` reads as false for boolean options.
pub fn resolve_options(config: &IndexMap<String, String>) -> GlobalOptions {
    let defaults = GlobalOptions::default();

    let fallback_dialect = config
        .get(FALLBACK_DIALECT)
        .and_then(|name| Dialect::from_option_name(name))
        .unwrap_or(defaults.fallback_dialect);

    let disabled_naming_heuristics = match config.get(DISABLED_NAMING_HEURISTICS) {
        Some(list) => list
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => defaults.disabled_naming_heuristics,
    };

    GlobalOptions {
        fallback_dialect,
        optional_as_nullable: boolean_option(config, OPTIONAL_AS_NULLABLE)
            .unwrap_or(defaults.optional_as_nullable),
        use_optional_name_heuristics: boolean_option(config, USE_OPTIONAL_NAME_HEURISTICS)
            .unwrap_or(defaults.use_optional_name_heuristics),
        always_assert_format: boolean_option(config, ALWAYS_ASSERT_FORMAT)
            .unwrap_or(defaults.always_assert_format),
        disabled_naming_heuristics,
    }
}

fn boolean_option(config: &IndexMap<String, String>, key: &str) -> Option<bool> {
    config
        .get(key)
        .map(|value| value == "true" || value == "True")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unset_options_use_defaults() {
        let options = resolve_options(&IndexMap::new());
        assert_eq!(options, GlobalOptions::default());
        assert_eq!(options.fallback_dialect, Dialect::Draft202012);
        assert!(options.optional_as_nullable);
        assert_eq!(options.disabled_naming_heuristics, vec!["documentation-title"]);
    }

    #[test]
    fn fallback_dialect_from_name() {
        let options = resolve_options(&config(&[(FALLBACK_DIALECT, "Draft7")]));
        assert_eq!(options.fallback_dialect, Dialect::Draft7);
    }

    #[test]
    fn unknown_dialect_name_falls_back() {
        let options = resolve_options(&config(&[(FALLBACK_DIALECT, "draft5")]));
        assert_eq!(options.fallback_dialect, Dialect::LATEST);
    }

    #[test]
    fn boolean_options_parse_strictly() {
        let options = resolve_options(&config(&[
            (ALWAYS_ASSERT_FORMAT, "True"),
            (OPTIONAL_AS_NULLABLE, "false"),
            // Malformed values read as false, not as an error.
            (USE_OPTIONAL_NAME_HEURISTICS, "yes"),
        ]));
        assert!(options.always_assert_format);
        assert!(!options.optional_as_nullable);
        assert!(!options.use_optional_name_heuristics);
    }

    #[test]
    fn disabled_heuristics_split_and_trim() {
        let options = resolve_options(&config(&[(
            DISABLED_NAMING_HEURISTICS,
            "documentation-title; pointer-segment ;;",
        )]));
        assert_eq!(
            options.disabled_naming_heuristics,
            vec!["documentation-title", "pointer-segment"]
        );
    }

    #[test]
    fn empty_disable_list_clears_default_exclusions() {
        let options = resolve_options(&config(&[(DISABLED_NAMING_HEURISTICS, "")]));
        assert!(options.disabled_naming_heuristics.is_empty());
    }
}
