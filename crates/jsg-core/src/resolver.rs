use std::sync::OnceLock;

use indexmap::IndexMap;
use serde_json::Value;

use crate::diagnostics::Diagnostic;
use crate::reference::JsonReference;
use crate::vocabulary::Dialect;

/// Resolves a locator to a parsed schema document. Fragments are the
/// caller's concern: resolution is by the document part of the reference.
pub trait DocumentResolver {
    fn resolve(&self, reference: &JsonReference) -> Option<&Value>;
}

/// An in-memory document table keyed by canonical locator.
#[derive(Debug, Clone, Default)]
pub struct PrepopulatedDocumentResolver {
    documents: IndexMap<String, Value>,
}

impl PrepopulatedDocumentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `document` under `key`. A later registration for the same
    /// key replaces the earlier one.
    pub fn add_document(&mut self, key: &str, document: Value) {
        let key = JsonReference::new(key).uri().to_string();
        self.documents.insert(key, document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentResolver for PrepopulatedDocumentResolver {
    fn resolve(&self, reference: &JsonReference) -> Option<&Value> {
        self.documents.get(reference.uri())
    }
}

/// The fixed meta-schema layer: one document per supported dialect,
/// registered under its canonical locator. Built once per process and
/// never mutated by a build.
pub fn meta_schema_resolver() -> &'static PrepopulatedDocumentResolver {
    static META: OnceLock<PrepopulatedDocumentResolver> = OnceLock::new();
    META.get_or_init(|| {
        let sources: [(Dialect, &str); 6] = [
            (Dialect::Draft4, include_str!("../metaschema/draft-04.json")),
            (Dialect::Draft6, include_str!("../metaschema/draft-06.json")),
            (Dialect::Draft7, include_str!("../metaschema/draft-07.json")),
            (
                Dialect::Draft201909,
                include_str!("../metaschema/draft2019-09.json"),
            ),
            (
                Dialect::Draft202012,
                include_str!("../metaschema/draft2020-12.json"),
            ),
            (
                Dialect::OpenApi30,
                include_str!("../metaschema/openapi-3.0.json"),
            ),
        ];
        let mut resolver = PrepopulatedDocumentResolver::new();
        for (dialect, text) in sources {
            let document =
                serde_json::from_str(text).expect("embedded meta-schema is valid JSON");
            resolver.add_document(dialect.meta_schema_uri(), document);
        }
        resolver
    })
}

/// Ordered resolver layers: the inline layer is queried before the shared
/// meta-schema layer, so an inline document shadows a same-locator
/// meta-schema. Immutable once built; rebuilt only when the inline source
/// set changes.
#[derive(Debug, Clone)]
pub struct CompoundDocumentResolver {
    inline: PrepopulatedDocumentResolver,
    meta: &'static PrepopulatedDocumentResolver,
}

impl CompoundDocumentResolver {
    pub fn new(inline: PrepopulatedDocumentResolver) -> Self {
        Self {
            inline,
            meta: meta_schema_resolver(),
        }
    }

    pub fn empty() -> Self {
        Self::new(PrepopulatedDocumentResolver::new())
    }
}

impl DocumentResolver for CompoundDocumentResolver {
    fn resolve(&self, reference: &JsonReference) -> Option<&Value> {
        self.inline
            .resolve(reference)
            .or_else(|| self.meta.resolve(reference))
    }
}

/// One host-supplied schema source: a declared locator key plus raw JSON
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct InlineSource {
    pub key: String,
    pub text: String,
}

impl InlineSource {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Parse every inline source and stack the result over the meta-schema
/// layer. A source that fails to parse is excluded and recorded as a
/// diagnostic naming its key; it never fails the build.
pub fn build_document_resolver(
    sources: &[InlineSource],
) -> (CompoundDocumentResolver, Vec<Diagnostic>) {
    let mut inline = PrepopulatedDocumentResolver::new();
    let mut diagnostics = Vec::new();
    for source in sources {
        match serde_json::from_str(&source.text) {
            Ok(document) => inline.add_document(&source.key, document),
            Err(error) => diagnostics.push(Diagnostic::invalid_source(&source.key, error)),
        }
    }
    log::debug!(
        "document resolver rebuilt: {} inline sources, {} excluded",
        inline.len(),
        diagnostics.len()
    );
    (CompoundDocumentResolver::new(inline), diagnostics)
}
