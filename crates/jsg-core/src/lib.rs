pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod naming;
pub mod options;
pub mod pipeline;
pub mod reference;
pub mod resolver;
pub mod vocabulary;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use error::EmitError;
use graph::{TypeGraph, TypeId};
use options::GlobalOptions;
use reference::JsonReference;

/// A generated file with name and content.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GeneratedArtifact {
    pub name: String,
    pub content: String,
}

/// One resolved generation target handed to an emitter: the reduced root
/// node plus the declared name and target module.
#[derive(Debug, Clone)]
pub struct NamedRoot {
    pub root: TypeId,
    pub type_name: String,
    pub module: String,
    /// Canonical location of the reduced root.
    pub location: JsonReference,
}

/// Turns one resolved root (and the graph it lives in) into named
/// artifacts. Emitter failures become build diagnostics; they never abort
/// sibling targets.
pub trait Emitter {
    fn emit(
        &self,
        graph: &TypeGraph,
        root: &NamedRoot,
        options: &GlobalOptions,
    ) -> Result<Vec<GeneratedArtifact>, EmitError>;
}

/// Cooperative cancellation flag, checked at every reference-following step.
/// Cancelling abandons the pass; partially-built state is never published.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
