use std::path::PathBuf;

/// Failure modes of a validation run, in pipeline order.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open shader file '{}'", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize graphics context: {0}")]
    ContextInit(String),

    #[error("shader compilation failed: {0}")]
    Compile(String),

    #[error("shader program linking failed: {0}")]
    Link(String),
}
