use indexmap::IndexMap;
use serde_json::Value;

use crate::reference::JsonReference;

/// A supported JSON Schema dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Draft4,
    Draft6,
    Draft7,
    Draft201909,
    Draft202012,
    OpenApi30,
}

impl Dialect {
    /// The newest supported dialect, used as the default fallback.
    pub const LATEST: Dialect = Dialect::Draft202012;

    /// Canonical meta-schema locator for this dialect.
    pub fn meta_schema_uri(&self) -> &'static str {
        match self {
            Dialect::Draft4 => "http://json-schema.org/draft-04/schema",
            Dialect::Draft6 => "http://json-schema.org/draft-06/schema",
            Dialect::Draft7 => "http://json-schema.org/draft-07/schema",
            Dialect::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            Dialect::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
            Dialect::OpenApi30 => "https://spec.openapis.org/oas/3.0/schema",
        }
    }

    /// Parse a configured dialect name. Accepts the documented names
    /// case-insensitively, ignoring `-`, `_`, and `.` separators
    /// (`draft7`, `Draft7`, `draft2020-12`, `Draft202012`, `openapi3.0`).
    pub fn from_option_name(name: &str) -> Option<Self> {
        let folded = name
            .chars()
            .filter(|c| !matches!(*c, '-' | '_' | '.'))
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "draft4" => Some(Dialect::Draft4),
            "draft6" => Some(Dialect::Draft6),
            "draft7" => Some(Dialect::Draft7),
            "draft201909" => Some(Dialect::Draft201909),
            "draft202012" => Some(Dialect::Draft202012),
            "openapi30" => Some(Dialect::OpenApi30),
            _ => None,
        }
    }
}

/// How a keyword carries subschemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    /// Value is a reference string (`$ref` and friends).
    Reference,
    /// Value is one subschema.
    Schema,
    /// Value is an array of subschemas.
    SchemaList,
    /// Value is an object of named subschemas.
    SchemaMap,
    /// Value is one subschema or an array of them (pre-2020-12 `items`).
    SchemaOrList,
}

type KeywordTable = &'static [(&'static str, KeywordKind)];

const DRAFT4_KEYWORDS: KeywordTable = &[
    ("$ref", KeywordKind::Reference),
    ("allOf", KeywordKind::SchemaList),
    ("anyOf", KeywordKind::SchemaList),
    ("oneOf", KeywordKind::SchemaList),
    ("not", KeywordKind::Schema),
    ("items", KeywordKind::SchemaOrList),
    ("additionalItems", KeywordKind::Schema),
    ("properties", KeywordKind::SchemaMap),
    ("patternProperties", KeywordKind::SchemaMap),
    ("additionalProperties", KeywordKind::Schema),
];

const DRAFT6_KEYWORDS: KeywordTable = &[
    ("$ref", KeywordKind::Reference),
    ("allOf", KeywordKind::SchemaList),
    ("anyOf", KeywordKind::SchemaList),
    ("oneOf", KeywordKind::SchemaList),
    ("not", KeywordKind::Schema),
    ("items", KeywordKind::SchemaOrList),
    ("additionalItems", KeywordKind::Schema),
    ("contains", KeywordKind::Schema),
    ("properties", KeywordKind::SchemaMap),
    ("patternProperties", KeywordKind::SchemaMap),
    ("additionalProperties", KeywordKind::Schema),
    ("propertyNames", KeywordKind::Schema),
];

const DRAFT7_KEYWORDS: KeywordTable = &[
    ("$ref", KeywordKind::Reference),
    ("allOf", KeywordKind::SchemaList),
    ("anyOf", KeywordKind::SchemaList),
    ("oneOf", KeywordKind::SchemaList),
    ("not", KeywordKind::Schema),
    ("if", KeywordKind::Schema),
    ("then", KeywordKind::Schema),
    ("else", KeywordKind::Schema),
    ("items", KeywordKind::SchemaOrList),
    ("additionalItems", KeywordKind::Schema),
    ("contains", KeywordKind::Schema),
    ("properties", KeywordKind::SchemaMap),
    ("patternProperties", KeywordKind::SchemaMap),
    ("additionalProperties", KeywordKind::Schema),
    ("propertyNames", KeywordKind::Schema),
];

const DRAFT201909_KEYWORDS: KeywordTable = &[
    ("$ref", KeywordKind::Reference),
    ("$recursiveRef", KeywordKind::Reference),
    ("allOf", KeywordKind::SchemaList),
    ("anyOf", KeywordKind::SchemaList),
    ("oneOf", KeywordKind::SchemaList),
    ("not", KeywordKind::Schema),
    ("if", KeywordKind::Schema),
    ("then", KeywordKind::Schema),
    ("else", KeywordKind::Schema),
    ("items", KeywordKind::SchemaOrList),
    ("additionalItems", KeywordKind::Schema),
    ("contains", KeywordKind::Schema),
    ("properties", KeywordKind::SchemaMap),
    ("patternProperties", KeywordKind::SchemaMap),
    ("additionalProperties", KeywordKind::Schema),
    ("propertyNames", KeywordKind::Schema),
    ("unevaluatedItems", KeywordKind::Schema),
    ("unevaluatedProperties", KeywordKind::Schema),
    ("dependentSchemas", KeywordKind::SchemaMap),
];

const DRAFT202012_KEYWORDS: KeywordTable = &[
    ("$ref", KeywordKind::Reference),
    ("$dynamicRef", KeywordKind::Reference),
    ("allOf", KeywordKind::SchemaList),
    ("anyOf", KeywordKind::SchemaList),
    ("oneOf", KeywordKind::SchemaList),
    ("not", KeywordKind::Schema),
    ("if", KeywordKind::Schema),
    ("then", KeywordKind::Schema),
    ("else", KeywordKind::Schema),
    ("prefixItems", KeywordKind::SchemaList),
    ("items", KeywordKind::Schema),
    ("contains", KeywordKind::Schema),
    ("properties", KeywordKind::SchemaMap),
    ("patternProperties", KeywordKind::SchemaMap),
    ("additionalProperties", KeywordKind::Schema),
    ("propertyNames", KeywordKind::Schema),
    ("unevaluatedItems", KeywordKind::Schema),
    ("unevaluatedProperties", KeywordKind::Schema),
    ("dependentSchemas", KeywordKind::SchemaMap),
];

const OPENAPI30_KEYWORDS: KeywordTable = &[
    ("$ref", KeywordKind::Reference),
    ("allOf", KeywordKind::SchemaList),
    ("anyOf", KeywordKind::SchemaList),
    ("oneOf", KeywordKind::SchemaList),
    ("not", KeywordKind::Schema),
    ("items", KeywordKind::Schema),
    ("properties", KeywordKind::SchemaMap),
    ("additionalProperties", KeywordKind::Schema),
];

/// A dialect's keyword-handling table, optionally layered with custom
/// extension keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    dialect: Dialect,
    keywords: Vec<(String, KeywordKind)>,
}

impl Vocabulary {
    pub fn for_dialect(dialect: Dialect) -> Self {
        let table = match dialect {
            Dialect::Draft4 => DRAFT4_KEYWORDS,
            Dialect::Draft6 => DRAFT6_KEYWORDS,
            Dialect::Draft7 => DRAFT7_KEYWORDS,
            Dialect::Draft201909 => DRAFT201909_KEYWORDS,
            Dialect::Draft202012 => DRAFT202012_KEYWORDS,
            Dialect::OpenApi30 => OPENAPI30_KEYWORDS,
        };
        Self {
            dialect,
            keywords: table
                .iter()
                .map(|(k, kind)| (k.to_string(), *kind))
                .collect(),
        }
    }

    /// Layer additional keyword handlers over the base dialect. A keyword
    /// already present in the base keeps the base's kind.
    pub fn with_extension(mut self, keywords: &[(&str, KeywordKind)]) -> Self {
        for (keyword, kind) in keywords {
            if !self.keywords.iter().any(|(k, _)| k == keyword) {
                self.keywords.push((keyword.to_string(), *kind));
            }
        }
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Subschema-carrying keywords in declaration order.
    pub fn applicators(&self) -> impl Iterator<Item = (&str, KeywordKind)> {
        self.keywords.iter().map(|(k, kind)| (k.as_str(), *kind))
    }
}

/// Maps a document's self-declared dialect (its meta-schema locator) to the
/// vocabulary governing it. Populated once at process initialization and
/// read-only afterwards, so one registry is safely shared across builds.
#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    by_meta_schema: IndexMap<String, Vocabulary>,
}

impl VocabularyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every supported dialect registered under its
    /// canonical meta-schema locator.
    pub fn with_default_dialects() -> Self {
        let mut registry = Self::new();
        for dialect in [
            Dialect::Draft4,
            Dialect::Draft6,
            Dialect::Draft7,
            Dialect::Draft201909,
            Dialect::Draft202012,
            Dialect::OpenApi30,
        ] {
            registry.register(dialect.meta_schema_uri(), Vocabulary::for_dialect(dialect));
        }
        registry
    }

    pub fn register(&mut self, meta_schema_uri: &str, vocabulary: Vocabulary) {
        let key = JsonReference::new(meta_schema_uri).as_str().to_string();
        self.by_meta_schema.insert(key, vocabulary);
    }

    /// Determine the vocabulary governing `document` from its self-declared
    /// `$schema`. Pure in the document content and the registered table: a
    /// missing or unrecognized declaration falls back to `fallback`.
    pub fn analyse(&self, document: &Value, fallback: Dialect) -> Vocabulary {
        let declared = document
            .get("$schema")
            .and_then(Value::as_str)
            .map(|s| JsonReference::new(s));

        if let Some(reference) = declared {
            if let Some(vocabulary) = self.by_meta_schema.get(reference.as_str()) {
                return vocabulary.clone();
            }
            log::debug!(
                "unrecognized dialect '{reference}', falling back to {fallback:?}"
            );
        }

        self.by_meta_schema
            .get(fallback.meta_schema_uri())
            .cloned()
            .unwrap_or_else(|| Vocabulary::for_dialect(fallback))
    }
}
