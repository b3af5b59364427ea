use serde_json::Value;

use crate::reference::JsonReference;
use crate::vocabulary::Dialect;

/// Index of a declaration in its build's [`TypeGraph`]. Within one build,
/// equal ids mean the same node: declarations are deduplicated by canonical
/// location, never by content.
pub type TypeId = usize;

/// A composition link from a declaration to a child declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// The keyword that produced the link (`$ref`, `properties`, `items`, ...).
    pub keyword: String,
    /// Property name or list index under the keyword, where one applies.
    pub label: Option<String>,
    pub target: TypeId,
}

/// The broad classification of a schema's shape, used by emitters to pick
/// a declaration form. Keyword-level semantics stay with the vocabulary;
/// this only reflects what the schema content states about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Accepts anything (`true` or `{}`).
    Any,
    /// Accepts nothing (`false`).
    Never,
    /// A lone `$ref` wrapper with no semantics of its own.
    Reference,
    /// Combines subschemas (`allOf`/`anyOf`/`oneOf`/conditionals, or a
    /// `$ref` with sibling keywords).
    Composite,
    /// A closed value set (`enum` or `const`).
    Enum,
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// Multiple primitive types (`"type": [...]`).
    Union(Vec<Shape>),
}

impl Shape {
    pub fn of(schema: &Value) -> Shape {
        let map = match schema {
            Value::Bool(true) => return Shape::Any,
            Value::Bool(false) => return Shape::Never,
            Value::Object(map) => map,
            _ => return Shape::Any,
        };

        if map.contains_key("$ref") {
            let annotation_only = map.keys().all(|k| {
                matches!(k.as_str(), "$ref" | "$comment" | "title" | "description")
            });
            return if annotation_only {
                Shape::Reference
            } else {
                Shape::Composite
            };
        }
        if map.contains_key("enum") || map.contains_key("const") {
            return Shape::Enum;
        }
        if ["allOf", "anyOf", "oneOf", "not", "if"]
            .iter()
            .any(|k| map.contains_key(*k))
        {
            return Shape::Composite;
        }

        match map.get("type") {
            Some(Value::String(name)) => Self::of_type_name(name),
            Some(Value::Array(names)) => {
                let shapes: Vec<Shape> = names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(Self::of_type_name)
                    .collect();
                match shapes.len() {
                    0 => Shape::Any,
                    1 => shapes.into_iter().next().unwrap_or(Shape::Any),
                    _ => Shape::Union(shapes),
                }
            }
            _ => {
                if map.contains_key("properties")
                    || map.contains_key("required")
                    || map.contains_key("additionalProperties")
                {
                    Shape::Object
                } else if map.contains_key("items") || map.contains_key("prefixItems") {
                    Shape::Array
                } else {
                    Shape::Any
                }
            }
        }
    }

    fn of_type_name(name: &str) -> Shape {
        match name {
            "object" => Shape::Object,
            "array" => Shape::Array,
            "string" => Shape::String,
            "number" => Shape::Number,
            "integer" => Shape::Integer,
            "boolean" => Shape::Boolean,
            "null" => Shape::Null,
            _ => Shape::Any,
        }
    }
}

/// One schema location's resolved declaration: the schema content, the
/// dialect governing it, and composition links into the rest of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub location: JsonReference,
    pub schema: Value,
    pub dialect: Dialect,
    pub shape: Shape,
    pub edges: Vec<Edge>,
}

impl TypeDeclaration {
    /// The first edge for `keyword`, if any.
    pub fn edge(&self, keyword: &str) -> Option<TypeId> {
        self.edges
            .iter()
            .find(|e| e.keyword == keyword)
            .map(|e| e.target)
    }

    /// `(property name, child)` pairs from the `properties` keyword.
    pub fn properties(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.edges.iter().filter_map(|e| match e.keyword.as_str() {
            "properties" => e.label.as_deref().map(|l| (l, e.target)),
            _ => None,
        })
    }

    /// Property names the schema declares as required.
    pub fn required(&self) -> Vec<&str> {
        self.schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Arena of type declarations for one build pass. All generation targets of
/// a build share one graph, so overlapping subgraphs collapse to shared
/// nodes.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    nodes: Vec<TypeDeclaration>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TypeId) -> &TypeDeclaration {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDeclaration)> {
        self.nodes.iter().enumerate()
    }

    /// Follow `$ref`-only wrapper nodes to the declaration that carries the
    /// semantics. Cycle-guarded: a reference loop reduces to its entry node.
    pub fn reduced(&self, id: TypeId) -> TypeId {
        let mut current = id;
        let mut visited = vec![id];
        while self.nodes[current].shape == Shape::Reference {
            let Some(next) = ["$ref", "$dynamicRef", "$recursiveRef"]
                .iter()
                .find_map(|k| self.nodes[current].edge(k))
            else {
                break;
            };
            if visited.contains(&next) {
                break;
            }
            visited.push(next);
            current = next;
        }
        current
    }

    /// Reserve a slot for a declaration under construction. Re-entrant
    /// references to the same location observe the reserved id, which is
    /// what collapses cycles.
    pub(crate) fn reserve(&mut self, location: JsonReference, dialect: Dialect) -> TypeId {
        let id = self.nodes.len();
        self.nodes.push(TypeDeclaration {
            location,
            schema: Value::Null,
            dialect,
            shape: Shape::Any,
            edges: Vec::new(),
        });
        id
    }

    /// Fill a reserved slot with its finished declaration.
    pub(crate) fn seal(&mut self, id: TypeId, schema: Value, shape: Shape, edges: Vec<Edge>) {
        let node = &mut self.nodes[id];
        node.schema = schema;
        node.shape = shape;
        node.edges = edges;
    }

    /// Discard every node from `len` onward. Used to roll back a failed
    /// target without touching nodes earlier targets already published.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }
}
