use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::builder::TypeBuilder;
use crate::diagnostics::Diagnostic;
use crate::error::BuildError;
use crate::options::{GlobalOptions, resolve_options};
use crate::reference::JsonReference;
use crate::resolver::{CompoundDocumentResolver, InlineSource, build_document_resolver};
use crate::vocabulary::VocabularyRegistry;
use crate::{CancellationToken, Emitter, GeneratedArtifact, NamedRoot};

/// One requested output target: a declared type name and module bound to a
/// schema locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GenerationSpecification {
    pub type_name: String,
    pub module: String,
    pub location: String,
    pub rebase_to_root: bool,
}

/// Everything a build pass consumes. Pure value: two equal inputs produce
/// byte-identical outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInput {
    pub sources: Vec<InlineSource>,
    pub config: IndexMap<String, String>,
    pub specifications: Vec<GenerationSpecification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub artifacts: Vec<GeneratedArtifact>,
    pub diagnostics: Vec<Diagnostic>,
}

struct OptionsStage {
    config: IndexMap<String, String>,
    options: GlobalOptions,
}

struct ResolverStage {
    sources: Vec<InlineSource>,
    resolver: CompoundDocumentResolver,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TargetKey {
    specification: GenerationSpecification,
    resolver_rev: u64,
    options_rev: u64,
}

#[derive(Debug, Clone)]
struct TargetResult {
    artifacts: Vec<GeneratedArtifact>,
    diagnostics: Vec<Diagnostic>,
}

/// The cache-aware dataflow tying resolver, options, type building, and
/// emission together.
///
/// Every stage's result is cached keyed by the value identity of its
/// inputs: global options by the configuration map, the document resolver
/// by the full inline-source set, and each generation target by its
/// specification plus the revisions of the two upstream stages. A config
/// change therefore re-runs options and all targets but not the resolver; a
/// source change re-runs the resolver and all targets but not options; and
/// adding or removing one specification touches only that specification's
/// results.
pub struct Pipeline {
    registry: Arc<VocabularyRegistry>,
    options_stage: Option<OptionsStage>,
    options_rev: u64,
    resolver_stage: Option<ResolverStage>,
    resolver_rev: u64,
    targets: HashMap<TargetKey, TargetResult>,
}

impl Pipeline {
    pub fn new(registry: Arc<VocabularyRegistry>) -> Self {
        Self {
            registry,
            options_stage: None,
            options_rev: 0,
            resolver_stage: None,
            resolver_rev: 0,
            targets: HashMap::new(),
        }
    }

    /// A pipeline over the default dialect registry.
    pub fn with_default_dialects() -> Self {
        Self::new(Arc::new(VocabularyRegistry::with_default_dialects()))
    }

    /// Run one build pass, recomputing only the stages whose inputs changed
    /// since the previous pass. The only error is cancellation; every other
    /// failure is isolated to its target and surfaced as a diagnostic.
    pub fn run(
        &mut self,
        input: &BuildInput,
        emitter: &dyn Emitter,
        cancel: &CancellationToken,
    ) -> Result<BuildOutput, BuildError> {
        self.refresh_options(&input.config);
        self.refresh_resolver(&input.sources);

        let resolver_rev = self.resolver_rev;
        let options_rev = self.options_rev;
        self.targets
            .retain(|key, _| key.resolver_rev == resolver_rev && key.options_rev == options_rev);

        if input.specifications.is_empty() {
            return Ok(BuildOutput::default());
        }

        let (Some(options_stage), Some(resolver_stage)) =
            (self.options_stage.as_ref(), self.resolver_stage.as_ref())
        else {
            return Ok(BuildOutput::default());
        };
        let options = &options_stage.options;
        let resolver = &resolver_stage.resolver;
        let registry = &self.registry;
        let targets = &mut self.targets;

        let key_of = |specification: &GenerationSpecification| TargetKey {
            specification: specification.clone(),
            resolver_rev,
            options_rev,
        };

        let mut seen = HashSet::new();
        let misses: Vec<&GenerationSpecification> = input
            .specifications
            .iter()
            .filter(|spec| seen.insert((*spec).clone()) && !targets.contains_key(&key_of(spec)))
            .collect();

        if !misses.is_empty() {
            log::debug!(
                "building {} of {} generation targets (rest cached)",
                misses.len(),
                input.specifications.len()
            );
            // One builder for every miss, so deduplication spans targets.
            let mut builder = TypeBuilder::new(resolver, registry);
            let mut declared = Vec::with_capacity(misses.len());
            for spec in misses {
                if cancel.is_cancelled() {
                    return Err(BuildError::Cancelled);
                }
                let root = JsonReference::new(&spec.location);
                let result = builder.add_type_declarations(
                    &root,
                    options.fallback_dialect,
                    spec.rebase_to_root,
                    cancel,
                );
                if matches!(result, Err(BuildError::Cancelled)) {
                    return Err(BuildError::Cancelled);
                }
                declared.push((spec.clone(), result));
            }

            let graph = builder.graph();
            for (spec, result) in declared {
                let entry = match result {
                    Ok(root) => {
                        let reduced = graph.reduced(root);
                        let named = NamedRoot {
                            root: reduced,
                            type_name: spec.type_name.clone(),
                            module: spec.module.clone(),
                            location: graph.get(reduced).location.clone(),
                        };
                        match emitter.emit(graph, &named, options) {
                            Ok(artifacts) => TargetResult {
                                artifacts,
                                diagnostics: Vec::new(),
                            },
                            Err(error) => TargetResult {
                                artifacts: Vec::new(),
                                diagnostics: vec![Diagnostic::code_generation(error)],
                            },
                        }
                    }
                    Err(error) => TargetResult {
                        artifacts: Vec::new(),
                        diagnostics: vec![Diagnostic::type_declaration(&spec.location, error)],
                    },
                };
                targets.insert(key_of(&spec), entry);
            }
        }

        let mut output = BuildOutput {
            artifacts: Vec::new(),
            diagnostics: resolver_stage.diagnostics.clone(),
        };
        for spec in &input.specifications {
            if let Some(entry) = targets.get(&key_of(spec)) {
                output.artifacts.extend(entry.artifacts.iter().cloned());
                output.diagnostics.extend(entry.diagnostics.iter().cloned());
            }
        }
        Ok(output)
    }

    fn refresh_options(&mut self, config: &IndexMap<String, String>) {
        if self
            .options_stage
            .as_ref()
            .is_some_and(|stage| &stage.config == config)
        {
            return;
        }
        self.options_rev += 1;
        log::debug!("global options resolved (rev {})", self.options_rev);
        self.options_stage = Some(OptionsStage {
            config: config.clone(),
            options: resolve_options(config),
        });
    }

    fn refresh_resolver(&mut self, sources: &[InlineSource]) {
        if self
            .resolver_stage
            .as_ref()
            .is_some_and(|stage| stage.sources == sources)
        {
            return;
        }
        self.resolver_rev += 1;
        let (resolver, diagnostics) = build_document_resolver(sources);
        self.resolver_stage = Some(ResolverStage {
            sources: sources.to_vec(),
            resolver,
            diagnostics,
        });
    }
}
