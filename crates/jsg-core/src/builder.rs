use indexmap::IndexMap;
use serde_json::Value;

use crate::error::BuildError;
use crate::graph::{Edge, Shape, TypeGraph, TypeId};
use crate::reference::{resolve_fragment, JsonReference};
use crate::resolver::{CompoundDocumentResolver, DocumentResolver, PrepopulatedDocumentResolver};
use crate::vocabulary::{Dialect, KeywordKind, Vocabulary, VocabularyRegistry};
use crate::CancellationToken;

/// Builds a deduplicated graph of type declarations by recursive
/// reference-following, memoized by canonical location.
///
/// One builder instance serves every generation target of a build, so two
/// targets reaching the same location share one node. A failed (or
/// cancelled) target rolls back everything it added; locations published by
/// earlier targets are untouched.
pub struct TypeBuilder<'a> {
    resolver: &'a CompoundDocumentResolver,
    registry: &'a VocabularyRegistry,
    /// Rebased roots registered as standalone documents for this build.
    overlay: PrepopulatedDocumentResolver,
    graph: TypeGraph,
    index: IndexMap<String, TypeId>,
}

impl<'a> TypeBuilder<'a> {
    pub fn new(resolver: &'a CompoundDocumentResolver, registry: &'a VocabularyRegistry) -> Self {
        Self {
            resolver,
            registry,
            overlay: PrepopulatedDocumentResolver::new(),
            graph: TypeGraph::new(),
            index: IndexMap::new(),
        }
    }

    /// Resolve `root` and every declaration reachable from it, returning the
    /// root's node. Re-entrant references collapse to the in-progress node,
    /// so cyclic schemas terminate. When `rebase_to_root` is set and `root`
    /// addresses a subschema, that subschema is first re-registered as a
    /// document root of its own, so its relative references resolve against
    /// the new root rather than the original document.
    pub fn add_type_declarations(
        &mut self,
        root: &JsonReference,
        fallback: Dialect,
        rebase_to_root: bool,
        cancel: &CancellationToken,
    ) -> Result<TypeId, BuildError> {
        let node_mark = self.graph.len();

        let result = self
            .rebase_root(root, rebase_to_root)
            .and_then(|location| self.declare(&location, fallback, cancel));

        if result.is_err() {
            // Nothing from a failed target may stay published.
            self.index.retain(|_, id| *id < node_mark);
            self.graph.truncate(node_mark);
        }
        result
    }

    /// The graph shared by every target built so far.
    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn into_graph(self) -> TypeGraph {
        self.graph
    }

    /// The node already built for a canonical location, if any.
    pub fn lookup(&self, location: &JsonReference) -> Option<TypeId> {
        self.index.get(location.as_str()).copied()
    }

    fn rebase_root(
        &mut self,
        root: &JsonReference,
        rebase_to_root: bool,
    ) -> Result<JsonReference, BuildError> {
        let Some(fragment) = root.fragment() else {
            return Ok(root.clone());
        };
        if !rebase_to_root {
            return Ok(root.clone());
        }

        let rebased = root.rebased_root();
        let subschema = {
            let document = self
                .document(root)
                .ok_or_else(|| BuildError::UnresolvedDocument(root.uri().to_string()))?;
            resolve_fragment(document, fragment)
                .ok_or_else(|| BuildError::FragmentNotFound {
                    document: root.uri().to_string(),
                    fragment: fragment.to_string(),
                })?
                .clone()
        };
        log::debug!("rebased '{root}' as document root '{rebased}'");
        self.overlay.add_document(rebased.as_str(), subschema);
        Ok(rebased)
    }

    fn document(&self, reference: &JsonReference) -> Option<&Value> {
        self.overlay
            .resolve(reference)
            .or_else(|| self.resolver.resolve(reference))
    }

    fn declare(
        &mut self,
        location: &JsonReference,
        fallback: Dialect,
        cancel: &CancellationToken,
    ) -> Result<TypeId, BuildError> {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled);
        }
        if let Some(id) = self.index.get(location.as_str()) {
            return Ok(*id);
        }

        let (vocabulary, schema, base) = {
            let document = self
                .document(location)
                .ok_or_else(|| BuildError::UnresolvedDocument(location.uri().to_string()))?;
            let vocabulary = self.registry.analyse(document, fallback);
            let fragment = location.fragment().unwrap_or("");
            let schema = resolve_fragment(document, fragment)
                .ok_or_else(|| BuildError::FragmentNotFound {
                    document: location.uri().to_string(),
                    fragment: fragment.to_string(),
                })?
                .clone();
            let base = reference_base(location, document, &schema, vocabulary.dialect());
            (vocabulary, schema, base)
        };

        log::trace!("declaring '{location}' ({:?})", vocabulary.dialect());
        let id = self.graph.reserve(location.clone(), vocabulary.dialect());
        self.index.insert(location.as_str().to_string(), id);

        let edges = self.declare_children(location, &schema, &base, &vocabulary, fallback, cancel)?;
        let shape = Shape::of(&schema);
        self.graph.seal(id, schema, shape, edges);
        Ok(id)
    }

    fn declare_children(
        &mut self,
        location: &JsonReference,
        schema: &Value,
        base: &JsonReference,
        vocabulary: &Vocabulary,
        fallback: Dialect,
        cancel: &CancellationToken,
    ) -> Result<Vec<Edge>, BuildError> {
        let Some(map) = schema.as_object() else {
            return Ok(Vec::new());
        };

        let mut edges = Vec::new();
        for (keyword, kind) in vocabulary.applicators() {
            let Some(value) = map.get(keyword) else {
                continue;
            };
            match kind {
                KeywordKind::Reference => {
                    let Some(target) = value.as_str() else {
                        continue;
                    };
                    let child = if let Some(fragment) = target.strip_prefix('#') {
                        location.without_fragment().with_fragment(fragment)
                    } else {
                        base.join(target)
                    };
                    edges.push(Edge {
                        keyword: keyword.to_string(),
                        label: None,
                        target: self.declare(&child, fallback, cancel)?,
                    });
                }
                KeywordKind::Schema => {
                    let child = location.append_pointer(keyword);
                    edges.push(Edge {
                        keyword: keyword.to_string(),
                        label: None,
                        target: self.declare(&child, fallback, cancel)?,
                    });
                }
                KeywordKind::SchemaList => {
                    if let Some(items) = value.as_array() {
                        self.declare_list(location, keyword, items.len(), fallback, cancel, &mut edges)?;
                    }
                }
                KeywordKind::SchemaMap => {
                    if let Some(entries) = value.as_object() {
                        let branch = location.append_pointer(keyword);
                        for name in entries.keys() {
                            let child = branch.append_pointer(name);
                            edges.push(Edge {
                                keyword: keyword.to_string(),
                                label: Some(name.clone()),
                                target: self.declare(&child, fallback, cancel)?,
                            });
                        }
                    }
                }
                KeywordKind::SchemaOrList => match value {
                    Value::Array(items) => {
                        self.declare_list(location, keyword, items.len(), fallback, cancel, &mut edges)?;
                    }
                    _ => {
                        let child = location.append_pointer(keyword);
                        edges.push(Edge {
                            keyword: keyword.to_string(),
                            label: None,
                            target: self.declare(&child, fallback, cancel)?,
                        });
                    }
                },
            }
        }
        Ok(edges)
    }

    fn declare_list(
        &mut self,
        location: &JsonReference,
        keyword: &str,
        len: usize,
        fallback: Dialect,
        cancel: &CancellationToken,
        edges: &mut Vec<Edge>,
    ) -> Result<(), BuildError> {
        let branch = location.append_pointer(keyword);
        for index in 0..len {
            let child = branch.append_pointer(&index.to_string());
            edges.push(Edge {
                keyword: keyword.to_string(),
                label: Some(index.to_string()),
                target: self.declare(&child, fallback, cancel)?,
            });
        }
        Ok(())
    }
}

/// The base against which non-fragment relative references resolve: the
/// document's locator, adjusted by a declared `$id` (or draft-4 style `id`)
/// at the document root and, for subschemas, at the subschema itself.
fn reference_base(
    location: &JsonReference,
    document: &Value,
    schema: &Value,
    dialect: Dialect,
) -> JsonReference {
    let mut base = location.without_fragment();
    if let Some(id) = declared_id(document, dialect) {
        base = base.join(id);
    }
    if location.fragment().is_some() {
        if let Some(id) = declared_id(schema, dialect) {
            base = base.join(id);
        }
    }
    base
}

fn declared_id(value: &Value, dialect: Dialect) -> Option<&str> {
    let keyword = match dialect {
        Dialect::Draft4 | Dialect::OpenApi30 => "id",
        _ => "$id",
    };
    value.get(keyword).and_then(Value::as_str)
}
