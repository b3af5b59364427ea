use std::cell::Cell;
use std::collections::BTreeSet;

use indexmap::IndexMap;

use jsg_core::diagnostics::{CODE_GENERATION_ERROR, INVALID_SOURCE_ERROR, TYPE_DECLARATION_ERROR};
use jsg_core::error::{BuildError, EmitError};
use jsg_core::graph::TypeGraph;
use jsg_core::options::{FALLBACK_DIALECT, GlobalOptions};
use jsg_core::pipeline::{BuildInput, GenerationSpecification, Pipeline};
use jsg_core::resolver::InlineSource;
use jsg_core::{CancellationToken, Emitter, GeneratedArtifact, NamedRoot};

const PERSON: &str = include_str!("fixtures/person.json");
const ADDRESS: &str = include_str!("fixtures/address.json");
const ORDER: &str = include_str!("fixtures/order.json");
const TREE: &str = include_str!("fixtures/tree.json");

const PERSON_URI: &str = "https://example.com/schemas/person.json";
const ADDRESS_URI: &str = "https://example.com/schemas/address.json";
const ORDER_URI: &str = "https://example.com/schemas/order.json";

/// Emits one artifact per root listing every reachable location, and counts
/// invocations so tests can observe which targets were recomputed.
struct TestEmitter {
    calls: Cell<usize>,
    fail_for: Option<&'static str>,
}

impl TestEmitter {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
            fail_for: None,
        }
    }

    fn failing_for(type_name: &'static str) -> Self {
        Self {
            calls: Cell::new(0),
            fail_for: Some(type_name),
        }
    }
}

impl Emitter for TestEmitter {
    fn emit(
        &self,
        graph: &TypeGraph,
        root: &NamedRoot,
        _options: &GlobalOptions,
    ) -> Result<Vec<GeneratedArtifact>, EmitError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_for == Some(root.type_name.as_str()) {
            return Err(EmitError::new("simulated emitter failure"));
        }

        let mut seen = BTreeSet::new();
        let mut stack = vec![root.root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            stack.extend(graph.get(id).edges.iter().map(|e| e.target));
        }
        let mut locations: Vec<String> = seen
            .iter()
            .map(|id| graph.get(*id).location.to_string())
            .collect();
        locations.sort();

        Ok(vec![GeneratedArtifact {
            name: format!("{}/{}.rs", root.module, root.type_name),
            content: format!("// {}\n{}\n", root.type_name, locations.join("\n")),
        }])
    }
}

fn spec(type_name: &str, location: &str) -> GenerationSpecification {
    GenerationSpecification {
        type_name: type_name.to_string(),
        module: "models".to_string(),
        location: location.to_string(),
        rebase_to_root: false,
    }
}

fn sources(pairs: &[(&str, &str)]) -> Vec<InlineSource> {
    pairs
        .iter()
        .map(|(key, text)| InlineSource::new(*key, *text))
        .collect()
}

#[test]
fn repeated_runs_are_byte_identical_and_cached() {
    let input = BuildInput {
        sources: sources(&[
            (PERSON_URI, PERSON),
            (ADDRESS_URI, ADDRESS),
            (ORDER_URI, ORDER),
        ]),
        config: IndexMap::new(),
        specifications: vec![spec("Person", PERSON_URI), spec("Order", ORDER_URI)],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let emitter = TestEmitter::new();
    let cancel = CancellationToken::new();

    let first = pipeline.run(&input, &emitter, &cancel).unwrap();
    assert_eq!(first.artifacts.len(), 2);
    assert!(first.diagnostics.is_empty());
    assert_eq!(emitter.calls.get(), 2);

    let second = pipeline.run(&input, &emitter, &cancel).unwrap();
    assert_eq!(first, second);
    // Both targets came from cache; the emitter never ran again.
    assert_eq!(emitter.calls.get(), 2);
}

#[test]
fn empty_input_yields_empty_output() {
    let mut pipeline = Pipeline::with_default_dialects();
    let output = pipeline
        .run(&BuildInput::default(), &TestEmitter::new(), &CancellationToken::new())
        .unwrap();
    assert!(output.artifacts.is_empty());
    assert!(output.diagnostics.is_empty());
}

#[test]
fn empty_specification_set_reports_nothing() {
    // Even a malformed source stays silent while nothing asks to generate.
    let input = BuildInput {
        sources: sources(&[("broken.json", "{ nope")]),
        ..Default::default()
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let output = pipeline
        .run(&input, &TestEmitter::new(), &CancellationToken::new())
        .unwrap();
    assert!(output.artifacts.is_empty());
    assert!(output.diagnostics.is_empty());
}

#[test]
fn inline_source_shadows_meta_schema_layer() {
    let meta_uri = "http://json-schema.org/draft-07/schema";
    let input = BuildInput {
        sources: sources(&[(meta_uri, r#"{"type": "string"}"#)]),
        config: IndexMap::new(),
        specifications: vec![spec("Shadowed", meta_uri)],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let output = pipeline
        .run(&input, &TestEmitter::new(), &CancellationToken::new())
        .unwrap();

    assert!(output.diagnostics.is_empty());
    // The inline leaf won: a single reachable location, not the
    // meta-schema's reference web.
    assert_eq!(
        output.artifacts[0].content,
        format!("// Shadowed\n{meta_uri}\n")
    );
}

#[test]
fn fallback_dialect_comes_from_configuration() {
    let conditional = r#"{"if": {"type": "string"}, "then": {"type": "number"}}"#;
    let mut draft7_config = IndexMap::new();
    draft7_config.insert(FALLBACK_DIALECT.to_string(), "Draft7".to_string());

    let mut input = BuildInput {
        sources: sources(&[("cond.json", conditional)]),
        config: draft7_config,
        specifications: vec![spec("Cond", "cond.json")],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let output = pipeline
        .run(&input, &TestEmitter::new(), &CancellationToken::new())
        .unwrap();
    assert_eq!(
        output.artifacts[0].content,
        "// Cond\ncond.json\ncond.json#/if\ncond.json#/then\n"
    );

    // Draft 4 has no conditional applicators: same document, different
    // configured fallback, different decomposition.
    input
        .config
        .insert(FALLBACK_DIALECT.to_string(), "Draft4".to_string());
    let output = pipeline
        .run(&input, &TestEmitter::new(), &CancellationToken::new())
        .unwrap();
    assert_eq!(output.artifacts[0].content, "// Cond\ncond.json\n");
}

#[test]
fn unresolvable_target_is_isolated_from_siblings() {
    let input = BuildInput {
        sources: sources(&[("tree.json", TREE)]),
        config: IndexMap::new(),
        specifications: vec![spec("Tree", "tree.json"), spec("Ghost", "missing.json")],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let output = pipeline
        .run(&input, &TestEmitter::new(), &CancellationToken::new())
        .unwrap();

    assert_eq!(output.artifacts.len(), 1);
    assert_eq!(output.artifacts[0].name, "models/Tree.rs");
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].code, TYPE_DECLARATION_ERROR);
    assert_eq!(output.diagnostics[0].location.as_deref(), Some("missing.json"));
}

#[test]
fn malformed_source_surfaces_once_targets_exist() {
    let input = BuildInput {
        sources: sources(&[("tree.json", TREE), ("broken.json", "{ nope")]),
        config: IndexMap::new(),
        specifications: vec![spec("Tree", "tree.json")],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let output = pipeline
        .run(&input, &TestEmitter::new(), &CancellationToken::new())
        .unwrap();

    assert_eq!(output.artifacts.len(), 1);
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].code, INVALID_SOURCE_ERROR);
    assert_eq!(output.diagnostics[0].location.as_deref(), Some("broken.json"));
}

#[test]
fn source_change_rebuilds_but_keeps_unrelated_artifacts_identical() {
    let a = r#"{"type": "object", "properties": {"x": {"type": "string"}}}"#;
    let b = r#"{"type": "object", "properties": {"y": {"type": "integer"}}}"#;
    let b_changed = r#"{"type": "object", "properties": {"y": {"type": "number"}}}"#;

    let mut input = BuildInput {
        sources: sources(&[("a.json", a), ("b.json", b)]),
        config: IndexMap::new(),
        specifications: vec![spec("A", "a.json"), spec("B", "b.json")],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let emitter = TestEmitter::new();
    let cancel = CancellationToken::new();

    let first = pipeline.run(&input, &emitter, &cancel).unwrap();
    assert_eq!(emitter.calls.get(), 2);

    input.sources = sources(&[("a.json", a), ("b.json", b_changed)]);
    let second = pipeline.run(&input, &emitter, &cancel).unwrap();
    // A source-set change invalidates the whole type-builder pass.
    assert_eq!(emitter.calls.get(), 4);
    // But A's reachable subgraph is untouched, so its artifact is
    // byte-identical.
    assert_eq!(first.artifacts[0], second.artifacts[0]);
}

#[test]
fn adding_a_specification_reuses_cached_targets() {
    let input_one = BuildInput {
        sources: sources(&[
            (PERSON_URI, PERSON),
            (ADDRESS_URI, ADDRESS),
            (ORDER_URI, ORDER),
        ]),
        config: IndexMap::new(),
        specifications: vec![spec("Person", PERSON_URI)],
    };
    let mut input_two = input_one.clone();
    input_two.specifications.push(spec("Order", ORDER_URI));

    let mut pipeline = Pipeline::with_default_dialects();
    let emitter = TestEmitter::new();
    let cancel = CancellationToken::new();

    let first = pipeline.run(&input_one, &emitter, &cancel).unwrap();
    assert_eq!(emitter.calls.get(), 1);

    let second = pipeline.run(&input_two, &emitter, &cancel).unwrap();
    // Only the new specification was built and emitted.
    assert_eq!(emitter.calls.get(), 2);
    assert_eq!(second.artifacts.len(), 2);
    assert_eq!(first.artifacts[0], second.artifacts[0]);

    // Dropping the extra specification costs nothing either.
    let third = pipeline.run(&input_one, &emitter, &cancel).unwrap();
    assert_eq!(emitter.calls.get(), 2);
    assert_eq!(third, first);
}

#[test]
fn configuration_change_invalidates_targets() {
    let mut input = BuildInput {
        sources: sources(&[("tree.json", TREE)]),
        config: IndexMap::new(),
        specifications: vec![spec("Tree", "tree.json")],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let emitter = TestEmitter::new();
    let cancel = CancellationToken::new();

    pipeline.run(&input, &emitter, &cancel).unwrap();
    assert_eq!(emitter.calls.get(), 1);

    input
        .config
        .insert("always_assert_format".to_string(), "false".to_string());
    pipeline.run(&input, &emitter, &cancel).unwrap();
    assert_eq!(emitter.calls.get(), 2);
}

#[test]
fn emitter_failure_is_isolated_to_its_target() {
    let input = BuildInput {
        sources: sources(&[
            (PERSON_URI, PERSON),
            (ADDRESS_URI, ADDRESS),
            (ORDER_URI, ORDER),
        ]),
        config: IndexMap::new(),
        specifications: vec![spec("Person", PERSON_URI), spec("Order", ORDER_URI)],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let emitter = TestEmitter::failing_for("Order");
    let output = pipeline
        .run(&input, &emitter, &CancellationToken::new())
        .unwrap();

    assert_eq!(output.artifacts.len(), 1);
    assert_eq!(output.artifacts[0].name, "models/Person.rs");
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].code, CODE_GENERATION_ERROR);
}

#[test]
fn cancellation_terminates_without_diagnostics() {
    let input = BuildInput {
        sources: sources(&[("tree.json", TREE)]),
        config: IndexMap::new(),
        specifications: vec![spec("Tree", "tree.json")],
    };
    let mut pipeline = Pipeline::with_default_dialects();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = pipeline
        .run(&input, &TestEmitter::new(), &cancel)
        .unwrap_err();
    assert!(matches!(error, BuildError::Cancelled));
}
