use jsg_core::CancellationToken;
use jsg_core::builder::TypeBuilder;
use jsg_core::options::GlobalOptions;
use jsg_core::reference::JsonReference;
use jsg_core::resolver::{InlineSource, build_document_resolver};
use jsg_core::vocabulary::VocabularyRegistry;
use jsg_core::{Emitter, NamedRoot};
use jsg_rust_models::RustModelsEmitter;

const PERSON: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "$id": "https://example.com/schemas/person.json",
  "type": "object",
  "properties": {
    "name": { "type": "string" },
    "email": { "type": "string", "format": "email" },
    "address": { "$ref": "address.json" },
    "friends": { "type": "array", "items": { "$ref": "#" } }
  },
  "required": ["name"]
}"##;

const ADDRESS: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "$id": "https://example.com/schemas/address.json",
  "type": "object",
  "properties": {
    "street": { "type": "string" },
    "country": { "$ref": "#/$defs/country" }
  },
  "required": ["street"],
  "$defs": {
    "country": { "enum": ["us", "ca", "gb"] }
  }
}"##;

fn emit(
    sources: &[(&str, &str)],
    root_uri: &str,
    type_name: &str,
    options: &GlobalOptions,
) -> String {
    let sources: Vec<InlineSource> = sources
        .iter()
        .map(|(key, text)| InlineSource::new(*key, *text))
        .collect();
    let (resolver, diagnostics) = build_document_resolver(&sources);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let registry = VocabularyRegistry::with_default_dialects();
    let mut builder = TypeBuilder::new(&resolver, &registry);
    let root = builder
        .add_type_declarations(
            &JsonReference::new(root_uri),
            options.fallback_dialect,
            false,
            &CancellationToken::new(),
        )
        .expect("schema should build");

    let graph = builder.into_graph();
    let reduced = graph.reduced(root);
    let named = NamedRoot {
        root: reduced,
        type_name: type_name.to_string(),
        module: "models".to_string(),
        location: graph.get(reduced).location.clone(),
    };

    let artifacts = RustModelsEmitter
        .emit(&graph, &named, options)
        .expect("emission should succeed");
    assert_eq!(artifacts.len(), 1);
    assert_eq!(
        artifacts[0].name,
        format!("models/{}.rs", jsg_core::naming::normalize_name(type_name).snake_case)
    );
    artifacts[0].content.clone()
}

#[test]
fn emits_structs_enums_and_cycles() {
    let sources = [
        ("https://example.com/schemas/person.json", PERSON),
        ("https://example.com/schemas/address.json", ADDRESS),
    ];
    let content = emit(
        &sources,
        "https://example.com/schemas/person.json",
        "Person",
        &GlobalOptions::default(),
    );

    assert!(content.contains("pub struct Person {"));
    assert!(content.contains("    pub name: String,"));
    assert!(content.contains("    pub email: Option<String>,"));
    assert!(content.contains("    pub address: Option<Address>,"));
    // Self-reference stays finite through a box.
    assert!(content.contains("    pub friends: Option<Vec<Box<Person>>>,"));

    assert!(content.contains("pub struct Address {"));
    assert!(content.contains("pub enum Country {"));
    assert!(content.contains("#[serde(rename = \"us\")]"));
    assert!(content.contains("    Us,"));
}

#[test]
fn optional_policy_selects_representation() {
    let schema = r#"{"type": "object", "properties": {"note": {"type": "string"}}}"#;
    let sources = [("doc.json", schema)];

    let nullable = emit(&sources, "doc.json", "Doc", &GlobalOptions::default());
    assert!(nullable.contains("#[serde(default)]"));
    assert!(nullable.contains("pub note: Option<String>,"));

    let wrapper_options = GlobalOptions {
        optional_as_nullable: false,
        ..GlobalOptions::default()
    };
    let wrapped = emit(&sources, "doc.json", "Doc", &wrapper_options);
    assert!(wrapped.contains("#[serde(default, skip_serializing_if = \"Option::is_none\")]"));
    assert!(wrapped.contains("pub note: Option<String>,"));
}

#[test]
fn optional_name_heuristics_strip_the_affix() {
    let schema = r#"{
      "type": "object",
      "properties": {"optionalNote": {"type": "string"}},
      "required": ["optionalNote"]
    }"#;
    let sources = [("doc.json", schema)];

    let inferred = emit(&sources, "doc.json", "Doc", &GlobalOptions::default());
    assert!(inferred.contains("#[serde(rename = \"optionalNote\")]"));
    // The affix marks the property optional even though `required` says
    // otherwise, and the member drops it.
    assert!(inferred.contains("pub note: Option<String>,"));

    let literal_options = GlobalOptions {
        use_optional_name_heuristics: false,
        ..GlobalOptions::default()
    };
    let literal = emit(&sources, "doc.json", "Doc", &literal_options);
    assert!(literal.contains("pub optional_note: String,"));
}

#[test]
fn format_assertion_policy_switches_types() {
    let schema = r#"{
      "type": "object",
      "properties": {"at": {"type": "string", "format": "date-time"}},
      "required": ["at"]
    }"#;
    let sources = [("doc.json", schema)];

    let asserted = emit(&sources, "doc.json", "Doc", &GlobalOptions::default());
    assert!(asserted.contains("pub at: chrono::DateTime<chrono::Utc>,"));

    let annotated_options = GlobalOptions {
        always_assert_format: false,
        ..GlobalOptions::default()
    };
    let annotated = emit(&sources, "doc.json", "Doc", &annotated_options);
    assert!(annotated.contains("pub at: String,"));
}

#[test]
fn non_object_root_becomes_an_alias() {
    let schema = r#"{"type": "array", "items": {"type": "string"}}"#;
    let content = emit(&[("names.json", schema)], "names.json", "Names", &GlobalOptions::default());
    assert!(content.contains("pub type Names = Vec<String>;"));
}

#[test]
fn renders_a_complete_file() {
    let schema = r#"{
      "type": "object",
      "properties": {"id": {"type": "integer"}},
      "required": ["id"]
    }"#;
    let content = emit(&[("thing.json", schema)], "thing.json", "Thing", &GlobalOptions::default());
    insta::assert_snapshot!(content.trim_end(), @r###"
    // Generated by jsg from thing.json. Do not edit.

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Thing {
        pub id: i64,
    }
    "###);
}
