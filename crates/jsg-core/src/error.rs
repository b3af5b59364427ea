use thiserror::Error;

/// Failures while building a type-declaration graph for one target.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unresolved schema reference: {0}")]
    UnresolvedDocument(String),

    #[error("fragment '{fragment}' not found in {document}")]
    FragmentNotFound { document: String, fragment: String },

    #[error("build cancelled")]
    Cancelled,
}

/// Failure raised by an emitter while producing artifact text.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EmitError {
    pub message: String,
}

impl EmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
