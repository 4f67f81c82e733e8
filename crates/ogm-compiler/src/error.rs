use ogm_core::Identity;
use thiserror::Error;

/// Errors from mapping, compiling, and committing object graphs.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{type_name} is not an instance of a persistable class")]
    NotPersistable { type_name: String },

    #[error("{type_name} has no identity; only saved objects can be attached")]
    Unsaved { type_name: String },

    #[error("Relationship entity {type_name} is incomplete: {reason}")]
    IncompleteRelationship { type_name: String, reason: String },

    #[error("Compile context is sealed; no statements may be added")]
    Sealed,

    #[error("Compile context must be sealed before execution")]
    NotSealed,

    #[error("Executor returned no identity for provisional {kind} {identity}")]
    UnresolvedIdentity {
        kind: &'static str,
        identity: Identity,
    },
}

pub type Result<T> = std::result::Result<T, CompileError>;
