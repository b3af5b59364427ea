use std::collections::HashSet;

use jsg_core::NamedRoot;
use jsg_core::graph::{Shape, TypeDeclaration, TypeGraph, TypeId};
use jsg_core::naming::{declared_name, normalize_name, optional_name_split};
use jsg_core::options::GlobalOptions;
use serde::Serialize;
use serde_json::Value;

use crate::type_mapper;

/// One renderable declaration for the template: a struct, a string enum, or
/// a type alias.
#[derive(Debug, Serialize)]
pub(crate) struct Item {
    pub kind: &'static str,
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<Field>,
    pub variants: Vec<Variant>,
    pub target: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Field {
    pub name: String,
    pub ty: String,
    pub attrs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Variant {
    pub name: String,
    pub value: String,
    pub rename: bool,
}

/// Walk the reduced graph from a named root and produce every item the
/// generated file needs, root first.
pub(crate) fn collect(graph: &TypeGraph, root: &NamedRoot, options: &GlobalOptions) -> Vec<Item> {
    let mut collector = Collector {
        graph,
        options,
        names: Vec::new(),
        taken: HashSet::new(),
        in_progress: HashSet::new(),
        items: Vec::new(),
    };
    collector.declare_item(root.root, Some(root.type_name.clone()));
    // Items finish in post-order; flip so the root leads the file.
    collector.items.reverse();
    collector.items
}

struct Collector<'g> {
    graph: &'g TypeGraph,
    options: &'g GlobalOptions,
    /// Node → item name, in discovery order.
    names: Vec<(TypeId, String)>,
    taken: HashSet<String>,
    in_progress: HashSet<TypeId>,
    items: Vec<Item>,
}

impl<'g> Collector<'g> {
    fn declare_item(&mut self, id: TypeId, requested: Option<String>) -> String {
        let graph = self.graph;
        let id = graph.reduced(id);
        if let Some((_, name)) = self.names.iter().find(|(known, _)| *known == id) {
            return name.clone();
        }

        let node = graph.get(id);
        let base = requested.unwrap_or_else(|| {
            declared_name(node, &self.options.disabled_naming_heuristics).pascal_case
        });
        let name = self.unique_name(base);
        self.names.push((id, name.clone()));
        self.in_progress.insert(id);

        let description = node
            .schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let item = if node.shape == Shape::Object {
            self.struct_item(&name, description, id)
        } else if let Some(values) = string_enum_values(node) {
            enum_item(&name, description, values)
        } else {
            let target = self.inline_type(id);
            Item {
                kind: "alias",
                name: name.clone(),
                description,
                fields: Vec::new(),
                variants: Vec::new(),
                target,
            }
        };

        self.in_progress.remove(&id);
        self.items.push(item);
        name
    }

    fn struct_item(&mut self, name: &str, description: Option<String>, id: TypeId) -> Item {
        let graph = self.graph;
        let node = graph.get(id);
        let required: Vec<String> = node.required().iter().map(|r| r.to_string()).collect();

        let mut fields = Vec::new();
        for (property, child) in node.properties() {
            let mut is_required = required.iter().any(|r| r == property);
            let mut member = property.to_string();
            if self.options.use_optional_name_heuristics {
                if let Some(stripped) = optional_name_split(property) {
                    is_required = false;
                    member = stripped;
                }
            }

            let base = self.inline_type(graph.reduced(child));
            let field_name = normalize_name(&member).snake_case;

            let mut attrs = Vec::new();
            if field_name != property {
                attrs.push(format!("#[serde(rename = \"{property}\")]"));
            }
            let ty = if is_required {
                base
            } else {
                if self.options.optional_as_nullable {
                    attrs.push("#[serde(default)]".to_string());
                } else {
                    attrs.push(
                        "#[serde(default, skip_serializing_if = \"Option::is_none\")]".to_string(),
                    );
                }
                format!("Option<{base}>")
            };
            fields.push(Field {
                name: field_name,
                ty,
                attrs,
            });
        }

        Item {
            kind: "struct",
            name: name.to_string(),
            description,
            fields,
            variants: Vec::new(),
            target: String::new(),
        }
    }

    /// The Rust type used where this node appears in field position. Objects
    /// and string enums become named items; a reference back into an item
    /// still under construction is boxed to keep the struct finite.
    fn inline_type(&mut self, id: TypeId) -> String {
        let graph = self.graph;
        let node = graph.get(id);

        if let Some(primitive) =
            type_mapper::primitive(&node.shape, &node.schema, self.options.always_assert_format)
        {
            return primitive;
        }

        match &node.shape {
            Shape::Object => {
                let name = self.declare_item(id, None);
                if self.in_progress.contains(&id) {
                    format!("Box<{name}>")
                } else {
                    name
                }
            }
            Shape::Enum if string_enum_values(node).is_some() => self.declare_item(id, None),
            Shape::Array => {
                let element = node
                    .edge("items")
                    .map(|items| self.inline_type(graph.reduced(items)));
                match element {
                    Some(element) => format!("Vec<{element}>"),
                    None => "Vec<serde_json::Value>".to_string(),
                }
            }
            Shape::Union(shapes) => self.union_type(node, shapes),
            _ => "serde_json::Value".to_string(),
        }
    }

    fn union_type(&mut self, node: &'g TypeDeclaration, shapes: &[Shape]) -> String {
        let non_null: Vec<&Shape> = shapes.iter().filter(|s| **s != Shape::Null).collect();
        let has_null = shapes.contains(&Shape::Null);
        match non_null.as_slice() {
            [only] => {
                let inner = type_mapper::primitive(
                    only,
                    &node.schema,
                    self.options.always_assert_format,
                )
                .unwrap_or_else(|| "serde_json::Value".to_string());
                if has_null {
                    format!("Option<{inner}>")
                } else {
                    inner
                }
            }
            _ => "serde_json::Value".to_string(),
        }
    }

    fn unique_name(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{base}{counter}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

fn string_enum_values(node: &TypeDeclaration) -> Option<Vec<String>> {
    if let Some(values) = node.schema.get("enum").and_then(Value::as_array) {
        let strings: Vec<String> = values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if strings.len() == values.len() && !strings.is_empty() {
            return Some(strings);
        }
        return None;
    }
    node.schema
        .get("const")
        .and_then(Value::as_str)
        .map(|s| vec![s.to_string()])
}

fn enum_item(name: &str, description: Option<String>, values: Vec<String>) -> Item {
    let variants = values
        .into_iter()
        .map(|value| {
            let rust_name = normalize_name(&value).pascal_case;
            Variant {
                rename: rust_name != value,
                name: rust_name,
                value,
            }
        })
        .collect();
    Item {
        kind: "enum",
        name: name.to_string(),
        description,
        fields: Vec::new(),
        variants,
        target: String::new(),
    }
}
