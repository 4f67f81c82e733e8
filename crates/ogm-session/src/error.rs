use ogm_compiler::CompileError;
use ogm_core::Lifecycle;
use thiserror::Error;

/// Failure reported by a request executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Network trouble, timeouts, deadlocks: retrying may succeed.
    #[error("Transient execution failure: {0}")]
    Transient(String),

    /// The store refused the writes: constraint violations, missing
    /// entities, malformed statements.
    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl ExecutionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors from [`Session::save`](crate::Session::save).
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("{type_name} is not an instance of a persistable class")]
    NotPersistable { type_name: String },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Listener failed on {lifecycle} for {subject}: {source}")]
    Listener {
        lifecycle: Lifecycle,
        subject: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SaveError {
    /// Whether retrying the same save may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Execution(e) if e.is_transient())
    }
}

pub type Result<T> = std::result::Result<T, SaveError>;
