//! Renders resolved type graphs as Rust model declarations.

mod collector;
mod type_mapper;

use jsg_core::error::EmitError;
use jsg_core::graph::TypeGraph;
use jsg_core::naming::normalize_name;
use jsg_core::options::GlobalOptions;
use jsg_core::{Emitter, GeneratedArtifact, NamedRoot};
use minijinja::{Environment, context};

/// Emits one `.rs` file per named root: a struct/enum/alias for the root
/// plus every object and string-enum node reachable from it.
pub struct RustModelsEmitter;

impl RustModelsEmitter {
    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("models.rs.j2", include_str!("../templates/models.rs.j2"))
            .expect("template should be valid");
        env
    }
}

impl Emitter for RustModelsEmitter {
    fn emit(
        &self,
        graph: &TypeGraph,
        root: &NamedRoot,
        options: &GlobalOptions,
    ) -> Result<Vec<GeneratedArtifact>, EmitError> {
        let items = collector::collect(graph, root, options);
        log::debug!("emitting {} items for {}", items.len(), root.type_name);

        let env = Self::environment();
        let template = env
            .get_template("models.rs.j2")
            .map_err(|e| EmitError::new(e.to_string()))?;
        let content = template
            .render(context! {
                location => root.location.to_string(),
                items => items,
            })
            .map_err(|e| EmitError::new(e.to_string()))?;

        let file = normalize_name(&root.type_name).snake_case;
        let name = if root.module.is_empty() {
            format!("{file}.rs")
        } else {
            format!("{}/{file}.rs", root.module)
        };
        Ok(vec![GeneratedArtifact { name, content }])
    }
}
